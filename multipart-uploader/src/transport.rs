/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_LENGTH;
use reqwest::StatusCode;
use tokio::sync::mpsc;

use crate::error::TransferFailure;
use crate::http::{self, ProgressStream};
use crate::types::Part;

/// Transfers the bytes of a single part to its signed URL.
#[async_trait]
pub trait PartTransport: Send + Sync + fmt::Debug {
    /// Upload `body` as `part`, returning the raw `ETag` the storage provider assigned to it.
    ///
    /// Implementations should call [`ProgressReporter::report`] as bytes go out. The future may
    /// be dropped at any point when the transfer is cancelled.
    async fn put_part(
        &self,
        part: &Part,
        body: Bytes,
        progress: ProgressReporter,
    ) -> Result<String, TransferFailure>;
}

/// Shared [`PartTransport`] implementation
pub type SharedPartTransport = Arc<dyn PartTransport>;

/// Progress sink handed to a single transfer attempt.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    part_number: u64,
    dispatch_id: u64,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

/// Bytes sent so far by one transfer attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProgressEvent {
    pub(crate) part_number: u64,
    pub(crate) dispatch_id: u64,
    pub(crate) bytes_sent: u64,
}

impl ProgressReporter {
    pub(crate) fn new(
        part_number: u64,
        dispatch_id: u64,
        tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Self {
        Self {
            part_number,
            dispatch_id,
            tx,
        }
    }

    /// The part this reporter belongs to
    pub fn part_number(&self) -> u64 {
        self.part_number
    }

    /// Report the cumulative number of bytes sent by this attempt.
    pub fn report(&self, bytes_sent: u64) {
        // the upload may already be over, nobody is listening then
        let _ = self.tx.send(ProgressEvent {
            part_number: self.part_number,
            dispatch_id: self.dispatch_id,
            bytes_sent,
        });
    }
}

/// [`PartTransport`] issuing a `PUT` of the raw part bytes to the signed URL.
#[derive(Debug, Clone)]
pub struct HttpPartTransport {
    client: reqwest::Client,
}

impl HttpPartTransport {
    /// Create a new transport using `client`
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PartTransport for HttpPartTransport {
    async fn put_part(
        &self,
        part: &Part,
        body: Bytes,
        progress: ProgressReporter,
    ) -> Result<String, TransferFailure> {
        let content_length = body.len();
        let body = ProgressStream::new(http::body_slices(body), progress);
        let resp = self
            .client
            .put(part.signed_url())
            .header(CONTENT_LENGTH, content_length)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::debug!(part_number = part.part_number(), %status, "part rejected");
            return Err(TransferFailure::Status(status.as_u16()));
        }
        http::header::e_tag(resp.headers()).ok_or(TransferFailure::MissingETag)
    }
}
