/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{self, Error};
use crate::operation::upload::scheduler::Outcome;
use crate::operation::upload::UploadOutput;
use crate::types::{AbortedUpload, UploadState};

/// Response type for a single upload request.
///
/// # Cancellation
///
/// Calling [`Self::abort`] cancels every in-flight part transfer and suppresses pending
/// retries; the error listener is notified with an
/// [`OperationCancelled`](crate::error::ErrorKind::OperationCancelled) error.
///
/// Dropping the handle does NOT cancel the upload; it keeps running in the background and only
/// the listeners observe its outcome.
#[derive(Debug)]
#[non_exhaustive]
pub struct UploadHandle {
    task: JoinHandle<Outcome>,
    cancel_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<UploadState>,
}

impl UploadHandle {
    pub(super) fn new(
        task: JoinHandle<Outcome>,
        cancel_tx: watch::Sender<bool>,
        state_rx: watch::Receiver<UploadState>,
    ) -> Self {
        Self {
            task,
            cancel_tx,
            state_rx,
        }
    }

    /// The state the upload is currently in
    pub fn state(&self) -> UploadState {
        *self.state_rx.borrow()
    }

    /// Consume the handle and wait for upload to complete
    #[tracing::instrument(skip_all, level = "debug", name = "join-upload")]
    pub async fn join(self) -> Result<UploadOutput, Error> {
        match self.task.await? {
            Outcome::Completed(output) => Ok(output),
            Outcome::Failed(err) => Err(err),
            Outcome::Aborted(_) => Err(error::operation_cancelled()),
        }
    }

    /// Abort the upload and cancel any in-progress part uploads.
    ///
    /// If the upload already committed the session, nothing is cancelled and the returned
    /// [`AbortedUpload`] reports zero cancelled parts. If it already failed, that failure is
    /// returned.
    #[tracing::instrument(skip_all, level = "debug", name = "abort-upload")]
    pub async fn abort(self) -> Result<AbortedUpload, Error> {
        self.cancel_tx.send_replace(true);
        match self.task.await? {
            Outcome::Aborted(aborted) => Ok(aborted),
            Outcome::Completed(output) => {
                tracing::debug!("abort requested after the upload completed");
                Ok(AbortedUpload {
                    session_id: Some(output.session.session_id),
                    parts_cancelled: 0,
                })
            }
            Outcome::Failed(err) => Err(err),
        }
    }
}
