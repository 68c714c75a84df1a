/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::default::Default;
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::error::{self, Error, ErrorKind};

/// Source of binary data to upload.
///
/// `InputStream` wraps the bytes of a local file (or any other readable source) together with
/// its length, which must be known up front so progress can be reported against it.
#[derive(Debug)]
pub struct InputStream {
    pub(super) inner: RawInputStream,
}

impl InputStream {
    /// Create a new `InputStream` from a static byte slice
    pub fn from_static(bytes: &'static [u8]) -> Self {
        let inner = RawInputStream::Buf(bytes.into());
        Self { inner }
    }

    /// Create a new `InputStream` that reads data from a given `path`.
    ///
    /// The length of the file is captured here. The contents of the file MUST not change while
    /// it is being uploaded.
    ///
    /// # Examples
    /// ```no_run
    /// use multipart_uploader::io::InputStream;
    ///
    /// fn make_stream() -> InputStream {
    ///     InputStream::from_path("docs/rows.csv").expect("file should be readable")
    /// }
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<InputStream, Error> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(error::from_kind(ErrorKind::IOError))?;
        if !metadata.is_file() {
            return Err(error::invalid_input(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        let inner = RawInputStream::Fs(PathBody {
            path: path.to_path_buf(),
            length: metadata.len(),
        });
        Ok(Self { inner })
    }

    /// Create a new `InputStream` from an arbitrary reader producing exactly `content_length`
    /// bytes.
    pub fn from_reader<R>(reader: R, content_length: u64) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        let inner = RawInputStream::Dyn(DynReader {
            reader: Box::pin(reader),
            length: content_length,
        });
        Self { inner }
    }

    /// Total number of bytes this stream will produce
    pub fn content_length(&self) -> u64 {
        match &self.inner {
            RawInputStream::Buf(bytes) => bytes.len() as u64,
            RawInputStream::Fs(path_body) => path_body.length,
            RawInputStream::Dyn(reader) => reader.length,
        }
    }
}

pub(crate) type BoxReader = Pin<Box<dyn AsyncRead + Send + 'static>>;

#[derive(Debug)]
pub(super) enum RawInputStream {
    /// In-memory buffer to read from
    Buf(Bytes),
    /// File based input
    Fs(PathBody),
    /// User provided reader
    Dyn(DynReader),
}

#[derive(Debug)]
pub(super) struct PathBody {
    pub(super) path: PathBuf,
    pub(super) length: u64,
}

pub(super) struct DynReader {
    pub(super) reader: BoxReader,
    pub(super) length: u64,
}

impl fmt::Debug for DynReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynReader(dyn AsyncRead)")
            .field("length", &self.length)
            .finish()
    }
}

impl Default for InputStream {
    fn default() -> Self {
        Self {
            inner: RawInputStream::Buf(Bytes::default()),
        }
    }
}

impl From<Bytes> for InputStream {
    fn from(value: Bytes) -> Self {
        Self {
            inner: RawInputStream::Buf(value),
        }
    }
}

impl From<Vec<u8>> for InputStream {
    fn from(value: Vec<u8>) -> Self {
        Self::from(Bytes::from(value))
    }
}

impl From<&'static [u8]> for InputStream {
    fn from(slice: &'static [u8]) -> InputStream {
        Self::from(Bytes::from_static(slice))
    }
}

impl From<&'static str> for InputStream {
    fn from(slice: &'static str) -> InputStream {
        Self::from(Bytes::from_static(slice.as_bytes()))
    }
}

#[cfg(test)]
mod test {
    use std::error::Error as _;
    use std::io::Write;

    use super::InputStream;
    use crate::error::ErrorKind;

    #[test]
    fn test_from_path_captures_length() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello multipart").unwrap();
        let stream = InputStream::from_path(tmp.path()).unwrap();
        assert_eq!(15, stream.content_length());
    }

    #[test]
    fn test_from_path_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = InputStream::from_path(dir.path()).unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = InputStream::from_path(dir.path().join("nope")).unwrap_err();
        assert_eq!(&ErrorKind::IOError, err.kind());
        let source = err.source().unwrap().downcast_ref::<std::io::Error>();
        assert_eq!(
            Some(std::io::ErrorKind::NotFound),
            source.map(|e| e.kind())
        );
    }

    #[test]
    fn test_reader_length() {
        let stream = InputStream::from_reader(&b"abc"[..], 3);
        assert_eq!(3, stream.content_length());
        assert_eq!(0, InputStream::default().content_length());
    }
}
