/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A multipart upload session started by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub(crate) session_id: String,
    pub(crate) storage_key: String,
    pub(crate) compression_enabled: bool,
}

impl UploadSession {
    /// Create a new session descriptor
    pub fn new(
        session_id: impl Into<String>,
        storage_key: impl Into<String>,
        compression_enabled: bool,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            storage_key: storage_key.into(),
            compression_enabled,
        }
    }

    /// The provider's opaque multipart upload identifier
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The key the object will be stored under once committed
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Whether the part payloads are gzip compressed
    pub fn compression_enabled(&self) -> bool {
        self.compression_enabled
    }
}

/// A provisioned part: a 1-based part number and the signed URL authorizing its transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "PartNumber")]
    pub(crate) part_number: u64,
    #[serde(rename = "signedUrl")]
    pub(crate) signed_url: String,
}

impl Part {
    /// Create a new part
    pub fn new(part_number: u64, signed_url: impl Into<String>) -> Self {
        Self {
            part_number,
            signed_url: signed_url.into(),
        }
    }

    /// The 1-based part number
    pub fn part_number(&self) -> u64 {
        self.part_number
    }

    /// The pre-signed URL the part's bytes are `PUT` to
    pub fn signed_url(&self) -> &str {
        &self.signed_url
    }
}

/// A successfully transferred part, as referenced when finalizing the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedPart {
    #[serde(rename = "PartNumber")]
    pub(crate) part_number: u64,
    #[serde(rename = "ETag")]
    pub(crate) e_tag: String,
}

impl UploadedPart {
    /// Create a new uploaded part. Quote characters are stripped from `e_tag`.
    pub fn new(part_number: u64, e_tag: impl AsRef<str>) -> Self {
        Self {
            part_number,
            e_tag: e_tag.as_ref().replace('"', ""),
        }
    }

    /// The 1-based part number
    pub fn part_number(&self) -> u64 {
        self.part_number
    }

    /// The normalized (unquoted) entity tag returned by the storage provider
    pub fn e_tag(&self) -> &str {
        &self.e_tag
    }
}

/// Snapshot of upload progress handed to the progress listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub(crate) sent: u64,
    pub(crate) total: u64,
    pub(crate) percentage: u8,
}

impl UploadProgress {
    /// Bytes sent so far: completed parts plus bytes reported by in-flight transfers.
    ///
    /// With compression enabled these are post-compression bytes.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Size of the source in bytes (before compression)
    pub fn total(&self) -> u64 {
        self.total
    }

    /// `round(sent / total * 100)`, capped at 99 until the session has been committed.
    ///
    /// Only the settled notifications sent after a successful commit report 100.
    ///
    /// NOTE: This value is not monotonic. A retried part restarts its in-flight byte count from
    /// zero, which can move the percentage backwards.
    pub fn percentage(&self) -> u8 {
        self.percentage
    }
}

/// States an upload moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    /// Not started yet
    #[default]
    Idle,
    /// Starting the session
    Initiating,
    /// Requesting the signed part URLs
    Provisioning,
    /// Pulling chunks and transferring parts
    Dispatching,
    /// The source is exhausted, waiting for in-flight transfers
    Draining,
    /// Committing the session
    Finalizing,
    /// The session was committed
    Completed,
    /// A fatal error ended the upload
    Failed,
    /// The upload was aborted by the caller
    Aborted,
}

impl UploadState {
    /// Whether no further work can happen in this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Completed | UploadState::Failed | UploadState::Aborted
        )
    }
}

/// Describes the result of aborting an in-progress upload.
#[derive(Debug, Default)]
pub struct AbortedUpload {
    pub(crate) session_id: Option<String>,
    pub(crate) parts_cancelled: usize,
}

impl AbortedUpload {
    /// The session that was abandoned, if one had been started
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Number of part transfers that were in flight when the upload was aborted
    pub fn parts_cancelled(&self) -> usize {
        self.parts_cancelled
    }
}

/// Shared progress listener
#[derive(Clone)]
pub(crate) struct ProgressListener(Arc<dyn Fn(&UploadProgress) + Send + Sync>);

impl ProgressListener {
    pub(crate) fn new(f: impl Fn(&UploadProgress) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn notify(&self, progress: &UploadProgress) {
        (self.0)(progress)
    }
}

impl fmt::Debug for ProgressListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressListener")
    }
}

/// Listener for the single terminal outcome of an upload
pub(crate) struct TerminalListener<T: ?Sized>(Box<dyn FnOnce(&T) + Send>);

impl<T: ?Sized> TerminalListener<T> {
    pub(crate) fn new(f: impl FnOnce(&T) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn notify(self, value: &T) {
        (self.0)(value)
    }
}

impl<T: ?Sized> fmt::Debug for TerminalListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TerminalListener")
    }
}
