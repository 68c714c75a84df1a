/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tower::ServiceExt;
use tracing::Instrument;

use crate::error::{self, DisplayErrorContext, Error, TransferFailure};
use crate::io::chunk_reader::ChunkReader;
use crate::operation::upload::progress::ProgressTracker;
use crate::operation::upload::service::{
    upload_part_service, UploadPartRequest, UploadPartService,
};
use crate::operation::upload::{Listeners, UploadContext, UploadOutput};
use crate::session::validate_parts;
use crate::transport::{ProgressEvent, ProgressReporter};
use crate::types::{AbortedUpload, Part, UploadSession, UploadState, UploadedPart};

/// A part waiting to be (re)dispatched along with its payload
#[derive(Debug)]
struct PendingPart {
    part: Part,
    body: Bytes,
    /// failed attempts so far
    failures: u32,
}

/// Result of a single transfer attempt, carrying everything needed to retry it
#[derive(Debug)]
struct TransferOutcome {
    part: Part,
    body: Bytes,
    failures: u32,
    dispatch_id: u64,
    result: Result<String, TransferFailure>,
}

/// How the upload ended
#[derive(Debug)]
pub(super) enum Outcome {
    Completed(UploadOutput),
    Failed(Error),
    Aborted(AbortedUpload),
}

/// Why the control loop stopped early
#[derive(Debug)]
enum Stop {
    Failed(Error),
    Aborted { parts_cancelled: usize },
}

impl From<Error> for Stop {
    fn from(value: Error) -> Self {
        Stop::Failed(value)
    }
}

impl From<JoinError> for Stop {
    fn from(value: JoinError) -> Self {
        Stop::Failed(value.into())
    }
}

/// Drives one upload from session start to commit.
///
/// All mutable upload state (unused part URLs, the retry queue, in-flight transfers, progress and
/// the uploaded parts) is owned here and only touched from [`run`](Scheduler::run). Transfers run
/// as separate tasks and report back through their join handles and the progress channel.
pub(super) struct Scheduler {
    ctx: UploadContext,
    svc: UploadPartService,
    reader: ChunkReader,
    listeners: Listeners,
    state_tx: watch::Sender<UploadState>,
    cancel_rx: watch::Receiver<bool>,
    progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    progress_rx: mpsc::UnboundedReceiver<ProgressEvent>,
    tracker: ProgressTracker,
    /// source size before compression
    total: u64,

    session: Option<UploadSession>,
    /// provisioned part URLs not yet paired with a chunk, ascending
    unused_parts: VecDeque<Part>,
    /// parts whose backoff elapsed, dispatched before any new chunk
    retry_queue: VecDeque<PendingPart>,
    in_flight: JoinSet<TransferOutcome>,
    backoff_timers: JoinSet<PendingPart>,
    uploaded: BTreeMap<u64, UploadedPart>,
    source_exhausted: bool,
    parts_dispatched: u64,
    next_dispatch_id: u64,
}

impl Scheduler {
    pub(super) fn new(
        ctx: UploadContext,
        reader: ChunkReader,
        total: u64,
        listeners: Listeners,
        state_tx: watch::Sender<UploadState>,
        cancel_rx: watch::Receiver<bool>,
    ) -> Self {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        Self {
            svc: upload_part_service(&ctx),
            ctx,
            reader,
            listeners,
            state_tx,
            cancel_rx,
            progress_tx,
            progress_rx,
            tracker: ProgressTracker::new(total),
            total,
            session: None,
            unused_parts: VecDeque::new(),
            retry_queue: VecDeque::new(),
            in_flight: JoinSet::new(),
            backoff_timers: JoinSet::new(),
            uploaded: BTreeMap::new(),
            source_exhausted: false,
            parts_dispatched: 0,
            next_dispatch_id: 0,
        }
    }

    /// Run the upload to a terminal state and notify the listeners of the outcome.
    pub(super) async fn run(mut self) -> Outcome {
        let started = Instant::now();
        let result = self.drive().await;

        // nothing may be dispatched, retried or finalized past this point
        self.in_flight.abort_all();
        self.backoff_timers.abort_all();
        self.retry_queue.clear();

        match result {
            Ok(session) => {
                let output = UploadOutput {
                    session,
                    parts: self.uploaded.into_values().collect(),
                    bytes_read: self.reader.bytes_read(),
                    bytes_uploaded: self.reader.bytes_emitted(),
                    elapsed: started.elapsed(),
                };
                set_state(&self.state_tx, UploadState::Completed);
                tracing::debug!(
                    "upload completed with {} parts in {:?}",
                    output.parts.len(),
                    output.elapsed
                );

                // the settled notification is delivered twice
                let settled = self.tracker.settled();
                if let Some(listener) = &self.listeners.progress {
                    listener.notify(&settled);
                    listener.notify(&settled);
                }
                if let Some(listener) = self.listeners.complete.take() {
                    listener.notify(&output);
                }
                Outcome::Completed(output)
            }
            Err(Stop::Failed(err)) => {
                set_state(&self.state_tx, UploadState::Failed);
                tracing::error!("upload failed: {}", DisplayErrorContext(&err));
                if let Some(listener) = self.listeners.error.take() {
                    listener.notify(&err);
                }
                Outcome::Failed(err)
            }
            Err(Stop::Aborted { parts_cancelled }) => {
                set_state(&self.state_tx, UploadState::Aborted);
                tracing::debug!("upload aborted, {parts_cancelled} part transfers cancelled");
                if let Some(listener) = self.listeners.error.take() {
                    listener.notify(&error::operation_cancelled());
                }
                Outcome::Aborted(AbortedUpload {
                    session_id: self.session.map(|s| s.session_id),
                    parts_cancelled,
                })
            }
        }
    }

    async fn drive(&mut self) -> Result<UploadSession, Stop> {
        let config = self.ctx.config().clone();
        let client = self.ctx.session_client().clone();

        set_state(&self.state_tx, UploadState::Initiating);
        let session = until_cancelled(
            &mut self.cancel_rx,
            client.initiate(&self.ctx.name, config.compression_enabled()),
        )
        .await?
        .map_err(error::session_failed)?;
        tracing::debug!("upload session started with id: {}", session.session_id());
        self.session = Some(session.clone());

        set_state(&self.state_tx, UploadState::Provisioning);
        let part_count = self.total.div_ceil(config.chunk_size()).max(1) + config.part_margin();
        let parts = until_cancelled(
            &mut self.cancel_rx,
            client.provision_urls(&session, part_count),
        )
        .await?
        .map_err(error::session_failed)?;
        validate_parts(&parts, part_count).map_err(error::session_failed)?;
        tracing::trace!("provisioned {part_count} part URLs");
        self.unused_parts = parts.into();

        set_state(&self.state_tx, UploadState::Dispatching);
        self.publish_progress();
        loop {
            self.fill().await?;

            if self.source_exhausted
                && self.retry_queue.is_empty()
                && self.in_flight.is_empty()
                && self.backoff_timers.is_empty()
            {
                break;
            }

            tokio::select! {
                biased;
                _ = wait_cancelled(&mut self.cancel_rx) => {
                    return Err(Stop::Aborted { parts_cancelled: self.in_flight.len() });
                }
                Some(event) = self.progress_rx.recv() => {
                    self.tracker.update(event);
                    self.publish_progress();
                }
                Some(joined) = self.in_flight.join_next() => {
                    self.on_transfer_done(joined?)?;
                }
                Some(timer) = self.backoff_timers.join_next() => {
                    self.retry_queue.push_front(timer?);
                }
            }
        }

        if *self.state_tx.borrow() == UploadState::Dispatching {
            set_state(&self.state_tx, UploadState::Draining);
        }
        set_state(&self.state_tx, UploadState::Finalizing);
        let parts = self.uploaded.values().cloned().collect::<Vec<_>>();
        tracing::trace!("finalizing upload session with {} parts", parts.len());
        until_cancelled(&mut self.cancel_rx, client.finalize(&session, &parts))
            .await?
            .map_err(|err| {
                tracing::error!(
                    "all parts of session {} were uploaded but it could not be committed",
                    session.session_id()
                );
                error::finalize_failed(session.session_id(), err)
            })?;

        Ok(session)
    }

    /// Dispatch work until every slot is taken or there is nothing left to dispatch.
    async fn fill(&mut self) -> Result<(), Stop> {
        let max_threads = self.ctx.config().max_threads();
        while self.in_flight.len() < max_threads {
            if let Some(pending) = self.retry_queue.pop_front() {
                self.dispatch(pending);
                continue;
            }
            if self.source_exhausted {
                break;
            }

            let chunk = until_cancelled(&mut self.cancel_rx, self.reader.next_chunk()).await;
            let chunk = match chunk {
                Err(stop) => {
                    return Err(match stop {
                        Stop::Aborted { .. } => Stop::Aborted {
                            parts_cancelled: self.in_flight.len(),
                        },
                        failed => failed,
                    })
                }
                Ok(chunk) => chunk?,
            };

            match chunk {
                Some(body) => self.pair_and_dispatch(body)?,
                // a session needs at least one part, an empty source uploads an empty part 1
                None if self.parts_dispatched == 0 => {
                    self.source_exhausted = true;
                    self.pair_and_dispatch(Bytes::new())?;
                    self.discard_unused_parts();
                }
                None => {
                    self.source_exhausted = true;
                    self.discard_unused_parts();
                    set_state(&self.state_tx, UploadState::Draining);
                }
            }
        }
        Ok(())
    }

    fn pair_and_dispatch(&mut self, body: Bytes) -> Result<(), Stop> {
        let part = self.unused_parts.pop_front().ok_or_else(|| {
            error::session_failed(format!(
                "ran out of provisioned part URLs after {} parts; increase the part margin",
                self.parts_dispatched
            ))
        })?;
        self.parts_dispatched = part.part_number();
        self.dispatch(PendingPart {
            part,
            body,
            failures: 0,
        });
        Ok(())
    }

    fn discard_unused_parts(&mut self) {
        tracing::trace!(
            "source exhausted after {} parts, discarding {} unused part URLs",
            self.parts_dispatched,
            self.unused_parts.len()
        );
        self.unused_parts.clear();
    }

    fn dispatch(&mut self, pending: PendingPart) {
        self.next_dispatch_id += 1;
        let dispatch_id = self.next_dispatch_id;
        let part_number = pending.part.part_number();
        self.tracker.start(part_number, dispatch_id);

        let req = UploadPartRequest {
            ctx: self.ctx.clone(),
            part: pending.part.clone(),
            body: pending.body.clone(),
            progress: ProgressReporter::new(part_number, dispatch_id, self.progress_tx.clone()),
        };
        let svc = self.svc.clone();
        let PendingPart {
            part,
            body,
            failures,
        } = pending;
        let task = async move {
            let result = svc.oneshot(req).await;
            TransferOutcome {
                part,
                body,
                failures,
                dispatch_id,
                result,
            }
        };
        self.in_flight.spawn(task.instrument(tracing::debug_span!(
            "upload-part",
            part_number,
            attempt = failures + 1
        )));
    }

    fn on_transfer_done(&mut self, outcome: TransferOutcome) -> Result<(), Stop> {
        let part_number = outcome.part.part_number();
        match outcome.result {
            Ok(e_tag) => {
                self.tracker
                    .complete(part_number, outcome.dispatch_id, outcome.body.len() as u64);
                self.uploaded
                    .insert(part_number, UploadedPart::new(part_number, e_tag));
                self.publish_progress();
                Ok(())
            }
            Err(failure) => {
                self.tracker.discard(part_number, outcome.dispatch_id);
                self.publish_progress();

                let failures = outcome.failures + 1;
                let Some(delay) = self.ctx.config().retry_policy().backoff(failures) else {
                    tracing::warn!(
                        "part {part_number} failed {failures} times, giving up: {failure}"
                    );
                    return Err(error::part_failed(part_number, failures, failure).into());
                };

                tracing::debug!(
                    "part {part_number} failed (attempt {failures}), retrying in {delay:?}: {failure}"
                );
                let pending = PendingPart {
                    part: outcome.part,
                    body: outcome.body,
                    failures,
                };
                self.backoff_timers.spawn(async move {
                    tokio::time::sleep(delay).await;
                    pending
                });
                Ok(())
            }
        }
    }

    fn publish_progress(&mut self) {
        if let Some(progress) = self.tracker.changed() {
            if let Some(listener) = &self.listeners.progress {
                listener.notify(&progress);
            }
        }
    }
}

fn set_state(tx: &watch::Sender<UploadState>, state: UploadState) {
    let previous = tx.send_replace(state);
    if previous != state {
        tracing::debug!("upload state {previous:?} -> {state:?}");
    }
}

/// Resolves once the upload has been aborted. Never resolves if the handle went away without
/// aborting.
async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    let observed = rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
    if observed.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn until_cancelled<F>(
    cancel_rx: &mut watch::Receiver<bool>,
    fut: F,
) -> Result<F::Output, Stop>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = wait_cancelled(cancel_rx) => Err(Stop::Aborted { parts_cancelled: 0 }),
        output = fut => Ok(output),
    }
}
