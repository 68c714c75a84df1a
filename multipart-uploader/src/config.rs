/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::cmp;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::unit::ByteUnit;
use crate::runtime::connectivity::{ConnectivityMonitor, SharedConnectivity};
use crate::runtime::retry::RetryPolicy;
use crate::session::SharedSessionClient;
use crate::transport::SharedPartTransport;
use crate::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY};

/// Config loader
pub mod loader;

/// Minimum (and default) part size in bytes
pub(crate) const MIN_CHUNK_SIZE_BYTES: u64 = 5 * ByteUnit::Mebibyte.as_bytes_u64();

/// Number of extra part URLs provisioned on top of the estimate
const DEFAULT_PART_MARGIN: u64 = 1;

/// Configuration for a [`Client`](crate::client::Client)
#[derive(Debug, Clone)]
pub struct Config {
    chunk_size: u64,
    max_threads: usize,
    compression_enabled: bool,
    base_url: Option<String>,
    part_margin: u64,
    retry_policy: RetryPolicy,
    part_timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
    session_client: Option<SharedSessionClient>,
    part_transport: Option<SharedPartTransport>,
    connectivity: SharedConnectivity,
}

impl Config {
    /// Create a new `Config` builder
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Size of every part except possibly the last one, in bytes
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Maximum number of part transfers in flight at once
    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Whether the source is gzip compressed before it is split into parts
    pub fn compression_enabled(&self) -> bool {
        self.compression_enabled
    }

    /// The endpoint prefix of the upload backend
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Number of part URLs provisioned beyond the estimated part count
    pub fn part_margin(&self) -> u64 {
        self.part_margin
    }

    /// Retry policy applied to individual part transfers
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Time limit for a single part transfer attempt, if any
    pub fn part_timeout(&self) -> Option<Duration> {
        self.part_timeout
    }

    /// Connectivity signal consulted before and during part transfers
    pub fn connectivity(&self) -> &SharedConnectivity {
        &self.connectivity
    }

    pub(crate) fn http_client(&self) -> Option<&reqwest::Client> {
        self.http_client.as_ref()
    }

    pub(crate) fn session_client(&self) -> Option<&SharedSessionClient> {
        self.session_client.as_ref()
    }

    pub(crate) fn part_transport(&self) -> Option<&SharedPartTransport> {
        self.part_transport.as_ref()
    }
}

/// Fluent style builder for [Config]
#[derive(Debug, Clone)]
pub struct Builder {
    chunk_size: u64,
    max_threads: usize,
    compression_enabled: bool,
    base_url: Option<String>,
    part_margin: u64,
    retry_policy: RetryPolicy,
    part_timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
    session_client: Option<SharedSessionClient>,
    part_transport: Option<SharedPartTransport>,
    connectivity: Option<SharedConnectivity>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            chunk_size: MIN_CHUNK_SIZE_BYTES,
            max_threads: DEFAULT_CONCURRENCY,
            compression_enabled: false,
            base_url: None,
            part_margin: DEFAULT_PART_MARGIN,
            retry_policy: RetryPolicy::default(),
            part_timeout: None,
            http_client: None,
            session_client: None,
            part_transport: None,
            connectivity: None,
        }
    }
}

impl Builder {
    /// The size of each part in bytes.
    ///
    /// The minimum part size is 5 MiB, any part size less than that will be rounded up.
    /// Default is 5 MiB.
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = cmp::max(chunk_size, MIN_CHUNK_SIZE_BYTES);
        self
    }

    /// The maximum number of part transfers in flight at once.
    ///
    /// Values are clamped to `1..=15`. Default is 5.
    pub fn max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Gzip the source before splitting it into parts. Default is `false`.
    pub fn compression_enabled(mut self, compression_enabled: bool) -> Self {
        self.compression_enabled = compression_enabled;
        self
    }

    /// The endpoint prefix the `initialize`, `getPreSignedUrls` and `finalize` calls are made
    /// relative to.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Extra part URLs to provision on top of the estimated part count.
    ///
    /// With compression enabled the compressed size is not known up front; the margin absorbs
    /// an estimate that turns out too low. Default is 1.
    pub fn part_margin(mut self, part_margin: u64) -> Self {
        self.part_margin = part_margin;
        self
    }

    /// Set the retry policy for part transfers
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Fail (and retry) a part transfer attempt that takes longer than `timeout`.
    /// Default is no timeout.
    pub fn part_timeout(mut self, timeout: Duration) -> Self {
        self.part_timeout = Some(timeout);
        self
    }

    /// Set an explicit HTTP client used for the backend calls and part transfers.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Use a custom backend client instead of the default HTTP one.
    pub fn session_client(mut self, session_client: SharedSessionClient) -> Self {
        self.session_client = Some(session_client);
        self
    }

    /// Use a custom part transport instead of the default HTTP `PUT`.
    pub fn part_transport(mut self, part_transport: SharedPartTransport) -> Self {
        self.part_transport = Some(part_transport);
        self
    }

    /// Set the connectivity signal. Default is a monitor that is always online.
    pub fn connectivity(mut self, connectivity: SharedConnectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Consumes the builder and constructs a [`Config`](crate::config::Config)
    pub fn build(self) -> Config {
        Config {
            chunk_size: self.chunk_size,
            max_threads: self.max_threads,
            compression_enabled: self.compression_enabled,
            base_url: self.base_url,
            part_margin: self.part_margin,
            retry_policy: self.retry_policy,
            part_timeout: self.part_timeout,
            http_client: self.http_client,
            session_client: self.session_client,
            part_transport: self.part_transport,
            connectivity: self
                .connectivity
                .unwrap_or_else(|| Arc::new(ConnectivityMonitor::online())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Config, MIN_CHUNK_SIZE_BYTES};

    #[test]
    fn test_defaults() {
        let config = Config::builder().build();
        assert_eq!(MIN_CHUNK_SIZE_BYTES, config.chunk_size());
        assert_eq!(5, config.max_threads());
        assert!(!config.compression_enabled());
        assert_eq!(1, config.part_margin());
        assert_eq!(None, config.part_timeout());
        assert_eq!(7, config.retry_policy().max_attempts());
        assert!(config.connectivity().is_online());
    }

    #[test]
    fn test_chunk_size_floor() {
        let config = Config::builder().chunk_size(1024).build();
        assert_eq!(MIN_CHUNK_SIZE_BYTES, config.chunk_size());
        let config = Config::builder().chunk_size(MIN_CHUNK_SIZE_BYTES * 2).build();
        assert_eq!(MIN_CHUNK_SIZE_BYTES * 2, config.chunk_size());
    }

    #[test]
    fn test_max_threads_clamped() {
        assert_eq!(1, Config::builder().max_threads(0).build().max_threads());
        assert_eq!(15, Config::builder().max_threads(64).build().max_threads());
        assert_eq!(9, Config::builder().max_threads(9).build().max_threads());
    }
}
