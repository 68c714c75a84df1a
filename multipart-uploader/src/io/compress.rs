/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::io::{self, Write};
use std::mem;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Streaming gzip stage sitting between the byte source and the slicer.
///
/// Input is pushed through incrementally; whatever compressed output is ready is drained after
/// each push so memory stays bounded by the encoder's window rather than the whole source.
pub(crate) struct GzipStage {
    encoder: Option<GzEncoder<Vec<u8>>>,
}

impl GzipStage {
    pub(crate) fn new() -> Self {
        Self {
            encoder: Some(GzEncoder::new(Vec::new(), Compression::default())),
        }
    }

    /// Compress `input`, returning the compressed bytes available so far (possibly empty).
    pub(crate) fn compress(&mut self, input: &[u8]) -> io::Result<Bytes> {
        let encoder = self.encoder.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "gzip stage already finished")
        })?;
        encoder.write_all(input)?;
        Ok(Bytes::from(mem::take(encoder.get_mut())))
    }

    /// Flush the encoder and write the gzip trailer. Subsequent calls return nothing.
    pub(crate) fn finish(&mut self) -> io::Result<Bytes> {
        match self.encoder.take() {
            Some(encoder) => Ok(Bytes::from(encoder.finish()?)),
            None => Ok(Bytes::new()),
        }
    }
}

impl std::fmt::Debug for GzipStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GzipStage")
            .field("finished", &self.encoder.is_none())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::io::Read;

    use bytes::BytesMut;
    use flate2::read::GzDecoder;

    use super::GzipStage;

    #[test]
    fn test_incremental_output_decodes() {
        let line = b"every adolescent dog goes bonkers early\n";
        let mut stage = GzipStage::new();
        let mut compressed = BytesMut::new();
        for _ in 0..10_000 {
            compressed.extend_from_slice(&stage.compress(line).unwrap());
        }
        compressed.extend_from_slice(&stage.finish().unwrap());
        assert!(stage.finish().unwrap().is_empty());

        let original_len = line.len() * 10_000;
        assert!(compressed.len() < original_len / 10);

        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(original_len, decoded.len());
        assert!(decoded.chunks(line.len()).all(|c| c == line));
    }

    #[test]
    fn test_compress_after_finish_errors() {
        let mut stage = GzipStage::new();
        stage.finish().unwrap();
        assert!(stage.compress(b"late").is_err());
    }
}
