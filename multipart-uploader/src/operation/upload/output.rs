/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::Duration;

use crate::metrics::Throughput;
use crate::types::{UploadSession, UploadedPart};

/// Common response fields for a completed upload
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct UploadOutput {
    pub(crate) session: UploadSession,
    pub(crate) parts: Vec<UploadedPart>,
    pub(crate) bytes_read: u64,
    pub(crate) bytes_uploaded: u64,
    pub(crate) elapsed: Duration,
}

impl UploadOutput {
    /// The committed session
    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    /// The provider's multipart upload identifier
    pub fn session_id(&self) -> &str {
        self.session.session_id()
    }

    /// The key the object was stored under
    pub fn storage_key(&self) -> &str {
        self.session.storage_key()
    }

    /// The parts the session was committed from, sorted by part number
    pub fn parts(&self) -> &[UploadedPart] {
        &self.parts
    }

    /// Bytes read from the source (the original size)
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes transferred as part payloads (post-compression when compression is enabled)
    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded
    }

    /// Wall-clock time from start to commit
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// `bytes_read / bytes_uploaded`. Above 1 when compression paid off.
    ///
    /// An upload of nothing has a ratio of 1.
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_uploaded == 0 {
            return 1.0;
        }
        self.bytes_read as f64 / self.bytes_uploaded as f64
    }

    /// Average throughput of the part payloads
    pub fn throughput(&self) -> Throughput {
        Throughput::new(self.bytes_uploaded, self.elapsed)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::UploadOutput;
    use crate::types::UploadSession;

    fn output(bytes_read: u64, bytes_uploaded: u64) -> UploadOutput {
        UploadOutput {
            session: UploadSession::new("id", "key", true),
            parts: Vec::new(),
            bytes_read,
            bytes_uploaded,
            elapsed: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(4.0, output(400, 100).compression_ratio());
        assert_eq!(1.0, output(0, 0).compression_ratio());
    }

    #[test]
    fn test_throughput() {
        assert_eq!("2.00 MiB/s", output(0, 4 * 1024 * 1024).throughput().to_string());
    }
}
