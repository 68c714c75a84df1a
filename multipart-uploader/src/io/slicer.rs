/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::cmp;

use bytes::{Bytes, BytesMut};

/// Reshapes a stream of arbitrarily sized buffers into fixed-size windows.
///
/// Every window handed out by [`feed`](ChunkSlicer::feed) is exactly `chunk_size` bytes long.
/// Bytes that do not yet fill a window are buffered until more input arrives or
/// [`flush`](ChunkSlicer::flush) is called at the end of the input, which hands out the
/// remaining short window (if any). Bytes are never reordered or dropped.
///
/// ```
/// use bytes::Bytes;
/// use multipart_uploader::io::ChunkSlicer;
///
/// let mut slicer = ChunkSlicer::new(4);
/// assert!(slicer.feed(Bytes::from_static(b"ab")).is_empty());
/// assert_eq!(
///     vec![Bytes::from_static(b"abcd"), Bytes::from_static(b"efgh")],
///     slicer.feed(Bytes::from_static(b"cdefghij"))
/// );
/// assert_eq!(Some(Bytes::from_static(b"ij")), slicer.flush());
/// assert_eq!(None, slicer.flush());
/// ```
#[derive(Debug)]
pub struct ChunkSlicer {
    chunk_size: usize,
    partial: BytesMut,
}

impl ChunkSlicer {
    /// Create a new slicer producing windows of `chunk_size` bytes. A size of zero is treated
    /// as one.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: cmp::max(chunk_size, 1),
            partial: BytesMut::new(),
        }
    }

    /// The size of every window except possibly the last
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of bytes buffered towards the next window
    pub fn buffered(&self) -> usize {
        self.partial.len()
    }

    /// Feed the next input buffer, returning every window it completes.
    pub fn feed(&mut self, buf: impl Into<Bytes>) -> Vec<Bytes> {
        let mut buf = buf.into();
        let mut windows = Vec::new();

        if !self.partial.is_empty() {
            let take = cmp::min(buf.len(), self.chunk_size - self.partial.len());
            self.partial.extend_from_slice(&buf.split_to(take));
            if self.partial.len() == self.chunk_size {
                windows.push(self.partial.split().freeze());
            }
        }

        // whole windows are sliced out of the input without copying
        while buf.len() >= self.chunk_size {
            windows.push(buf.split_to(self.chunk_size));
        }

        if !buf.is_empty() {
            if self.partial.capacity() < self.chunk_size {
                self.partial.reserve(self.chunk_size);
            }
            self.partial.extend_from_slice(&buf);
        }

        windows
    }

    /// Emit the buffered partial window, if there is one.
    pub fn flush(&mut self) -> Option<Bytes> {
        if self.partial.is_empty() {
            None
        } else {
            Some(self.partial.split().freeze())
        }
    }
}
