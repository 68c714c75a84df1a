/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Operation builders
pub mod builders;
mod input;
mod output;

mod context;
mod handle;
mod progress;
mod scheduler;
mod service;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::Instrument;

use crate::error::{self, Error};
use crate::io::chunk_reader::Builder as ChunkReaderBuilder;
use crate::types::{ProgressListener, TerminalListener, UploadState};
use context::UploadContext;
pub use handle::UploadHandle;
/// Request type for uploads
pub use input::{UploadInput, UploadInputBuilder};
/// Response type for uploads
pub use output::UploadOutput;
use scheduler::Scheduler;

/// Callbacks registered for a single upload
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    pub(crate) progress: Option<ProgressListener>,
    pub(crate) complete: Option<TerminalListener<UploadOutput>>,
    pub(crate) error: Option<TerminalListener<Error>>,
}

/// Operation struct for single file upload
#[derive(Clone, Default, Debug)]
pub(crate) struct Upload;

impl Upload {
    /// Start a single `Upload` operation in the background
    pub(crate) fn orchestrate(
        handle: Arc<crate::client::Handle>,
        input: UploadInput,
        listeners: Listeners,
    ) -> Result<UploadHandle, Error> {
        let session_client = handle.session_client.clone().ok_or_else(|| {
            error::invalid_input(
                "no upload backend configured; set a base URL or a custom session client",
            )
        })?;

        let config = &handle.config;
        let total = input.body.content_length();
        let reader = ChunkReaderBuilder::new(input.body)
            .chunk_size(usize::try_from(config.chunk_size()).map_err(error::invalid_input)?)
            .compress(config.compression_enabled())
            .build();
        tracing::trace!(
            "uploading {total} bytes as {} using parts of {} bytes",
            input.name,
            config.chunk_size()
        );

        let ctx = UploadContext {
            session_client,
            name: Arc::from(input.name),
            handle,
        };

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(UploadState::Idle);
        let scheduler = Scheduler::new(ctx, reader, total, listeners, state_tx, cancel_rx);
        let task = tokio::spawn(
            scheduler
                .run()
                .instrument(tracing::debug_span!("upload", total)),
        );
        Ok(UploadHandle::new(task, cancel_tx, state_rx))
    }
}
