/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::client::Handle;
use crate::config::Config;
use crate::runtime::connectivity::SharedConnectivity;
use crate::session::SharedSessionClient;
use crate::transport::SharedPartTransport;

/// Internal context used to drive a single Upload operation
#[derive(Debug, Clone)]
pub(crate) struct UploadContext {
    /// reference to client handle used to do actual work
    pub(crate) handle: Arc<Handle>,
    /// backend resolved for this upload
    pub(crate) session_client: SharedSessionClient,
    /// name the object is registered under
    pub(crate) name: Arc<str>,
}

impl UploadContext {
    pub(crate) fn config(&self) -> &Config {
        &self.handle.config
    }

    pub(crate) fn session_client(&self) -> &SharedSessionClient {
        &self.session_client
    }

    pub(crate) fn part_transport(&self) -> &SharedPartTransport {
        &self.handle.part_transport
    }

    pub(crate) fn connectivity(&self) -> &SharedConnectivity {
        self.handle.config.connectivity()
    }
}
