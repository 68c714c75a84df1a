/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::error::Error;
use crate::io::InputStream;
use crate::types::{ProgressListener, TerminalListener, UploadProgress};

use super::{Listeners, UploadHandle, UploadInputBuilder, UploadOutput};

/// Fluent builder for constructing a single file upload
#[derive(Debug)]
pub struct UploadFluentBuilder {
    handle: Arc<crate::client::Handle>,
    inner: UploadInputBuilder,
    listeners: Listeners,
}

impl UploadFluentBuilder {
    pub(crate) fn new(handle: Arc<crate::client::Handle>) -> Self {
        Self {
            handle,
            inner: ::std::default::Default::default(),
            listeners: Listeners::default(),
        }
    }

    /// Initiate the upload.
    ///
    /// The upload runs in the background; use the returned handle to wait for it, observe its
    /// state, or abort it. Must be called from within a tokio runtime.
    pub fn initiate(self) -> Result<UploadHandle, Error> {
        let input = self.inner.build()?;
        crate::operation::upload::Upload::orchestrate(self.handle, input, self.listeners)
    }

    /// Name the object is registered under with the backend, typically the local file name.
    ///
    /// This field is required.
    pub fn name(mut self, input: impl Into<String>) -> Self {
        self.inner = self.inner.name(input);
        self
    }

    /// Name the object is registered under with the backend
    pub fn set_name(mut self, input: Option<String>) -> Self {
        self.inner = self.inner.set_name(input);
        self
    }

    /// Name the object is registered under with the backend
    pub fn get_name(&self) -> &Option<String> {
        self.inner.get_name()
    }

    /// Object data.
    ///
    /// This field is required.
    pub fn body(mut self, body: InputStream) -> Self {
        self.inner = self.inner.body(body);
        self
    }

    /// Object data
    pub fn set_body(mut self, body: Option<InputStream>) -> Self {
        self.inner = self.inner.set_body(body);
        self
    }

    /// Object data
    pub fn get_body(&self) -> &Option<InputStream> {
        self.inner.get_body()
    }

    /// Called on every change in progress, and twice with 100% once the session is committed.
    pub fn on_progress(mut self, f: impl Fn(&UploadProgress) + Send + Sync + 'static) -> Self {
        self.listeners.progress = Some(ProgressListener::new(f));
        self
    }

    /// Called once when the upload completes.
    pub fn on_complete(mut self, f: impl FnOnce(&UploadOutput) + Send + 'static) -> Self {
        self.listeners.complete = Some(TerminalListener::new(f));
        self
    }

    /// Called once when the upload fails or is aborted.
    ///
    /// Exactly one of the completion and error listeners is called for any upload.
    pub fn on_error(mut self, f: impl FnOnce(&Error) + Send + 'static) -> Self {
        self.listeners.error = Some(TerminalListener::new(f));
        self
    }
}

impl crate::operation::upload::input::UploadInputBuilder {
    /// Initiate an upload with this input using the given client.
    pub fn initiate_with(self, client: &crate::Client) -> Result<UploadHandle, Error> {
        let mut fluent_builder = client.upload();
        fluent_builder.inner = self;
        fluent_builder.initiate()
    }
}
