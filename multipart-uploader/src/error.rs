/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::time::Duration;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by this library
///
/// NOTE: Use [`DisplayErrorContext`] or similar to display the entire error cause/source chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: BoxError,
}

/// General categories of upload errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Operation input validation issues
    InputInvalid,

    /// I/O errors
    IOError,

    /// Some kind of internal runtime issue (e.g. task failure)
    RuntimeError,

    /// Starting the session or provisioning part URLs failed. Never retried.
    SessionFailed,

    /// A single part could not be transferred within its retry budget
    PartFailed(PartFailed),

    /// Committing the session failed after every part was uploaded.
    ///
    /// The parts exist in storage but the session was never committed.
    FinalizeFailed,

    /// The upload was cancelled because the user explicitly called `.abort` on the handle.
    OperationCancelled,
}

/// Stores information about a part that exhausted its retries
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PartFailed {
    part_number: u64,
    attempts: u32,
}

impl PartFailed {
    /// The 1-based number of the part that failed
    pub fn part_number(&self) -> u64 {
        self.part_number
    }

    /// How many transfer attempts were made before giving up
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Failure of a single attempt to transfer one part.
///
/// Every variant is retryable at the part level; the scheduler decides when to give up.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransferFailure {
    /// Connectivity was known to be down, either at dispatch or while the transfer was running.
    #[error("system is offline")]
    Offline,

    /// The request did not finish within the configured part timeout.
    #[error("part transfer timed out after {0:?}")]
    Timeout(Duration),

    /// The storage provider answered with something other than `200 OK`.
    #[error("failed chunk upload: unexpected status {0}")]
    Status(u16),

    /// The storage provider accepted the part but did not return an `ETag` header.
    #[error("failed chunk upload: response is missing the ETag header")]
    MissingETag,

    /// The request could not be sent or the response could not be read.
    #[error("network error: {0}")]
    Network(#[source] BoxError),
}

impl From<reqwest::Error> for TransferFailure {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            // reqwest does not expose the configured duration
            TransferFailure::Timeout(Duration::ZERO)
        } else {
            TransferFailure::Network(value.into())
        }
    }
}

impl Error {
    /// Creates a new upload [`Error`] from a known kind of error as well as an arbitrary error
    /// source.
    pub fn new<E>(kind: ErrorKind, err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            kind,
            source: err.into(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::InputInvalid => write!(f, "invalid input"),
            ErrorKind::IOError => write!(f, "I/O error"),
            ErrorKind::RuntimeError => write!(f, "runtime error"),
            ErrorKind::SessionFailed => write!(f, "upload session failed"),
            ErrorKind::PartFailed(part_failed) => write!(
                f,
                "failed to upload part {} after {} attempts",
                part_failed.part_number, part_failed.attempts
            ),
            ErrorKind::FinalizeFailed => write!(f, "failed to finalize upload session"),
            ErrorKind::OperationCancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::new(ErrorKind::IOError, value)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(ErrorKind::RuntimeError, value)
    }
}

/// Displays an error along with its entire chain of sources, separated by `: `.
#[derive(Debug)]
pub struct DisplayErrorContext<E>(pub E);

impl<E> fmt::Display for DisplayErrorContext<E>
where
    E: std::error::Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut next = self.0.source();
        while let Some(err) = next {
            write!(f, ": {}", err)?;
            next = err.source();
        }
        Ok(())
    }
}

pub(crate) fn invalid_input<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::InputInvalid, err)
}

pub(crate) fn session_failed<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::SessionFailed, err)
}

pub(crate) fn part_failed(part_number: u64, attempts: u32, err: TransferFailure) -> Error {
    Error::new(
        ErrorKind::PartFailed(PartFailed {
            part_number,
            attempts,
        }),
        err,
    )
}

pub(crate) fn finalize_failed<E>(session_id: &str, err: E) -> Error
where
    E: Into<BoxError>,
{
    let err = err.into();
    Error::new(
        ErrorKind::FinalizeFailed,
        format!("session `{session_id}` has uploaded parts but was not committed: {err}"),
    )
}

pub(crate) fn from_kind<E>(kind: ErrorKind) -> impl FnOnce(E) -> Error
where
    E: Into<BoxError>,
{
    |err| Error::new(kind, err)
}

static CANCELLATION_ERROR: &str =
    "the upload has been aborted, cancelling all ongoing part transfers";

pub(crate) fn operation_cancelled() -> Error {
    Error::new(ErrorKind::OperationCancelled, CANCELLATION_ERROR)
}

#[cfg(test)]
mod test {
    use super::{part_failed, DisplayErrorContext, ErrorKind, TransferFailure};

    #[test]
    fn test_part_failed_display_carries_cause() {
        let err = part_failed(3, 7, TransferFailure::Status(403));
        match err.kind() {
            ErrorKind::PartFailed(failed) => {
                assert_eq!(3, failed.part_number());
                assert_eq!(7, failed.attempts());
            }
            kind => panic!("unexpected kind {kind:?}"),
        }
        assert_eq!(
            "failed to upload part 3 after 7 attempts: failed chunk upload: unexpected status 403",
            DisplayErrorContext(&err).to_string()
        );
    }

    #[test]
    fn test_finalize_failed_names_session() {
        let err = super::finalize_failed("abc-123", "boom");
        assert_eq!(&ErrorKind::FinalizeFailed, err.kind());
        assert!(DisplayErrorContext(&err).to_string().contains("abc-123"));
    }
}
