/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::VecDeque;
use std::mem;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;

use crate::error::Error;
use crate::io::compress::GzipStage;
use crate::io::slicer::ChunkSlicer;
use crate::io::stream::{BoxReader, RawInputStream};
use crate::io::InputStream;
use crate::metrics::unit::ByteUnit;

const DEFAULT_READ_BUFFER_SIZE: usize = 64 * ByteUnit::Kibibyte.as_bytes_u64() as usize;

/// Builder for creating a `ChunkReader`
#[derive(Debug)]
pub(crate) struct Builder {
    stream: InputStream,
    chunk_size: usize,
    compress: bool,
    read_buffer_size: usize,
}

impl Builder {
    pub(crate) fn new(stream: InputStream) -> Self {
        Self {
            stream,
            chunk_size: 5 * ByteUnit::Mebibyte.as_bytes_u64() as usize,
            compress: false,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    /// Set the size of every chunk except possibly the last one.
    pub(crate) fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Gzip the source before it is sliced.
    pub(crate) fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set how many bytes are pulled from the source per read.
    #[cfg(test)]
    pub(crate) fn read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size.max(1);
        self
    }

    pub(crate) fn build(self) -> ChunkReader {
        let source = match self.stream.inner {
            RawInputStream::Buf(buf) => Source::Buffered(buf),
            raw => Source::Pending(raw),
        };
        ChunkReader {
            source,
            gzip: self.compress.then(GzipStage::new),
            slicer: ChunkSlicer::new(self.chunk_size),
            ready: VecDeque::new(),
            read_buffer_size: self.read_buffer_size,
            bytes_read: 0,
            bytes_emitted: 0,
        }
    }
}

enum Source {
    /// Not opened yet
    Pending(RawInputStream),
    /// Fully in memory; handed to the slicer in one go
    Buffered(Bytes),
    Open(BoxReader),
    Exhausted,
}

/// Pulls the source forward and hands out the byte sequence to upload in fixed-size chunks.
///
/// The source is read lazily, one buffer at a time, so at most a chunk's worth of data (plus the
/// chunks already handed out and not yet acknowledged) is held in memory. When compression is
/// enabled the chunks are slices of the gzip stream rather than of the source.
pub(crate) struct ChunkReader {
    source: Source,
    gzip: Option<GzipStage>,
    slicer: ChunkSlicer,
    ready: VecDeque<Bytes>,
    read_buffer_size: usize,
    bytes_read: u64,
    bytes_emitted: u64,
}

impl ChunkReader {
    /// Produce the next chunk, or `None` once the source is exhausted and every chunk has been
    /// handed out.
    pub(crate) async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                self.bytes_emitted += chunk.len() as u64;
                return Ok(Some(chunk));
            }

            match mem::replace(&mut self.source, Source::Exhausted) {
                Source::Exhausted => return Ok(None),
                Source::Pending(raw) => {
                    self.source = Source::Open(open(raw).await?);
                }
                Source::Buffered(buf) => {
                    self.push(buf)?;
                    self.finish()?;
                }
                Source::Open(mut reader) => {
                    let mut buf = BytesMut::with_capacity(self.read_buffer_size);
                    let n = reader.read_buf(&mut buf).await?;
                    if n == 0 {
                        self.finish()?;
                    } else {
                        self.source = Source::Open(reader);
                        self.push(buf.freeze())?;
                    }
                }
            }
        }
    }

    fn push(&mut self, data: Bytes) -> Result<(), Error> {
        self.bytes_read += data.len() as u64;
        let data = match self.gzip.as_mut() {
            Some(gzip) => gzip.compress(&data)?,
            None => data,
        };
        self.ready.extend(self.slicer.feed(data));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        if let Some(mut gzip) = self.gzip.take() {
            let tail = gzip.finish()?;
            self.ready.extend(self.slicer.feed(tail));
        }
        self.ready.extend(self.slicer.flush());
        Ok(())
    }

    /// Number of bytes consumed from the source so far
    pub(crate) fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of bytes handed out as chunks so far
    pub(crate) fn bytes_emitted(&self) -> u64 {
        self.bytes_emitted
    }
}

impl std::fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkReader")
            .field("slicer", &self.slicer)
            .field("compress", &self.gzip.is_some())
            .field("ready", &self.ready.len())
            .field("bytes_read", &self.bytes_read)
            .field("bytes_emitted", &self.bytes_emitted)
            .finish()
    }
}

async fn open(raw: RawInputStream) -> Result<BoxReader, Error> {
    let reader: BoxReader = match raw {
        RawInputStream::Buf(buf) => Box::pin(std::io::Cursor::new(buf)),
        RawInputStream::Fs(path_body) => {
            let file = tokio::fs::File::open(&path_body.path).await?;
            Box::pin(file.take(path_body.length))
        }
        RawInputStream::Dyn(dyn_reader) => Box::pin(dyn_reader.reader.take(dyn_reader.length)),
    };
    Ok(reader)
}

#[cfg(test)]
mod test {
    use std::io::{Read, Write};

    use bytes::{Bytes, BytesMut};
    use flate2::read::GzDecoder;

    use super::{Builder, ChunkReader};
    use crate::io::InputStream;

    async fn collect(mut reader: ChunkReader) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        // exhausted readers stay exhausted
        assert!(reader.next_chunk().await.unwrap().is_none());
        chunks
    }

    fn concat(chunks: &[Bytes]) -> Vec<u8> {
        let mut out = BytesMut::new();
        chunks.iter().for_each(|c| out.extend_from_slice(c));
        out.to_vec()
    }

    #[tokio::test]
    async fn test_bytes_source() {
        let data = Bytes::from_static(b"a lep is a ball, a tay is a hammer");
        let reader = Builder::new(InputStream::from(data.clone()))
            .chunk_size(5)
            .build();
        let chunks = collect(reader).await;
        assert_eq!(7, chunks.len());
        assert_eq!(4, chunks[6].len());
        assert_eq!(data.to_vec(), concat(&chunks));
    }

    #[tokio::test]
    async fn test_file_source_with_small_reads() {
        let data = (0..10_000u32).map(|i| (i % 251) as u8).collect::<Vec<_>>();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&data).unwrap();

        let mut reader = Builder::new(InputStream::from_path(tmp.path()).unwrap())
            .chunk_size(4096)
            .read_buffer_size(1000)
            .build();
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(10_000, reader.bytes_read());
        assert_eq!(10_000, reader.bytes_emitted());
        assert_eq!(
            vec![4096, 4096, 1808],
            chunks.iter().map(|c| c.len()).collect::<Vec<_>>()
        );
        assert_eq!(data, concat(&chunks));
    }

    #[tokio::test]
    async fn test_reader_source_limited_to_content_length() {
        let stream = InputStream::from_reader(&b"0123456789extra"[..], 10);
        let reader = Builder::new(stream).chunk_size(4).build();
        assert_eq!(b"0123456789".to_vec(), concat(&collect(reader).await));
    }

    #[tokio::test]
    async fn test_empty_source_yields_nothing() {
        let reader = Builder::new(InputStream::default()).chunk_size(4).build();
        assert!(collect(reader).await.is_empty());
    }

    #[tokio::test]
    async fn test_compressed_chunks_form_gzip_stream() {
        let data = b"highly compressible ".repeat(50_000);
        let mut reader = Builder::new(InputStream::from(data.clone()))
            .chunk_size(1024)
            .compress(true)
            .build();
        let mut chunks = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(data.len() as u64, reader.bytes_read());
        assert!(reader.bytes_emitted() < reader.bytes_read());
        let (last, full) = chunks.split_last().unwrap();
        assert!(full.iter().all(|c| c.len() == 1024));
        assert!(last.len() <= 1024);

        let compressed = concat(&chunks);
        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(data, decoded);
    }
}
