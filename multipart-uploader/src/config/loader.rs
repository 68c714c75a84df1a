/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::config::Builder;
use crate::metrics::unit::ByteUnit;
use crate::runtime::connectivity::SharedConnectivity;
use crate::runtime::retry::RetryPolicy;
use crate::session::SharedSessionClient;
use crate::transport::SharedPartTransport;
use crate::Config;

const ENV_BASE_URL: &str = "UPLOADER_BASE_URL";
const ENV_CHUNK_SIZE_MB: &str = "UPLOADER_CHUNK_SIZE_MB";
const ENV_MAX_THREADS: &str = "UPLOADER_MAX_THREADS";
const ENV_COMPRESS: &str = "UPLOADER_COMPRESS";
const ENV_PART_MARGIN: &str = "UPLOADER_PART_MARGIN";

/// Load upload client [`Config`] from the environment.
///
/// The following variables are read when the corresponding setting has not been overridden on
/// the loader:
///
/// | Variable | Setting |
/// |---|---|
/// | `UPLOADER_BASE_URL` | [`base_url`](Self::base_url) |
/// | `UPLOADER_CHUNK_SIZE_MB` | [`chunk_size`](Self::chunk_size), in MiB |
/// | `UPLOADER_MAX_THREADS` | [`max_threads`](Self::max_threads) |
/// | `UPLOADER_COMPRESS` | [`compression_enabled`](Self::compression_enabled) |
/// | `UPLOADER_PART_MARGIN` | [`part_margin`](Self::part_margin) |
///
/// Values that cannot be parsed are logged and ignored.
#[derive(Default, Debug)]
pub struct ConfigLoader {
    builder: Builder,
    base_url: Option<String>,
    chunk_size: Option<u64>,
    max_threads: Option<usize>,
    compression_enabled: Option<bool>,
    part_margin: Option<u64>,
}

impl ConfigLoader {
    /// The endpoint prefix of the upload backend.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The size of each part in bytes.
    ///
    /// The minimum part size is 5 MiB, any part size less than that will be rounded up.
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// The maximum number of part transfers in flight at once, clamped to `1..=15`.
    pub fn max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = Some(max_threads);
        self
    }

    /// Gzip the source before splitting it into parts.
    pub fn compression_enabled(mut self, compression_enabled: bool) -> Self {
        self.compression_enabled = Some(compression_enabled);
        self
    }

    /// Extra part URLs to provision on top of the estimated part count.
    pub fn part_margin(mut self, part_margin: u64) -> Self {
        self.part_margin = Some(part_margin);
        self
    }

    /// Set the retry policy for part transfers
    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.builder = self.builder.retry_policy(retry_policy);
        self
    }

    /// Fail (and retry) a part transfer attempt that takes longer than `timeout`.
    pub fn part_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.part_timeout(timeout);
        self
    }

    /// Set an explicit HTTP client
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.builder = self.builder.http_client(client);
        self
    }

    /// Use a custom backend client
    pub fn session_client(mut self, session_client: SharedSessionClient) -> Self {
        self.builder = self.builder.session_client(session_client);
        self
    }

    /// Use a custom part transport
    pub fn part_transport(mut self, part_transport: SharedPartTransport) -> Self {
        self.builder = self.builder.part_transport(part_transport);
        self
    }

    /// Set the connectivity signal
    pub fn connectivity(mut self, connectivity: SharedConnectivity) -> Self {
        self.builder = self.builder.connectivity(connectivity);
        self
    }

    /// Load the configuration.
    ///
    /// If fields have been overridden during builder construction, the override values will be
    /// used. Otherwise, values from the environment are used when present and the defaults
    /// otherwise.
    pub fn load(self) -> Config {
        self.load_with(|name| std::env::var(name).ok())
    }

    fn load_with(self, env: impl Fn(&str) -> Option<String>) -> Config {
        let mut builder = self.builder;

        if let Some(base_url) = self.base_url.or_else(|| env(ENV_BASE_URL)) {
            builder = builder.base_url(base_url);
        }

        let chunk_size = self.chunk_size.or_else(|| {
            parse_env::<u64>(&env, ENV_CHUNK_SIZE_MB)
                .map(|mb| mb.saturating_mul(ByteUnit::Mebibyte.as_bytes_u64()))
        });
        if let Some(chunk_size) = chunk_size {
            builder = builder.chunk_size(chunk_size);
        }

        if let Some(max_threads) = self
            .max_threads
            .or_else(|| parse_env(&env, ENV_MAX_THREADS))
        {
            builder = builder.max_threads(max_threads);
        }

        if let Some(compress) = self
            .compression_enabled
            .or_else(|| parse_env(&env, ENV_COMPRESS))
        {
            builder = builder.compression_enabled(compress);
        }

        if let Some(margin) = self
            .part_margin
            .or_else(|| parse_env(&env, ENV_PART_MARGIN))
        {
            builder = builder.part_margin(margin);
        }

        builder.build()
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!("ignoring {name}={raw:?}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::ConfigLoader;
    use crate::metrics::unit::ByteUnit;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_env_values_applied() {
        let config = ConfigLoader::default().load_with(env(&[
            ("UPLOADER_BASE_URL", "http://localhost:3000/api"),
            ("UPLOADER_CHUNK_SIZE_MB", "8"),
            ("UPLOADER_MAX_THREADS", "20"),
            ("UPLOADER_COMPRESS", "true"),
            ("UPLOADER_PART_MARGIN", "3"),
        ]));
        assert_eq!(Some("http://localhost:3000/api"), config.base_url());
        assert_eq!(8 * ByteUnit::Mebibyte.as_bytes_u64(), config.chunk_size());
        assert_eq!(15, config.max_threads());
        assert!(config.compression_enabled());
        assert_eq!(3, config.part_margin());
    }

    #[test]
    fn test_overrides_win() {
        let config = ConfigLoader::default()
            .max_threads(2)
            .compression_enabled(false)
            .base_url("http://override")
            .load_with(env(&[
                ("UPLOADER_BASE_URL", "http://env"),
                ("UPLOADER_MAX_THREADS", "9"),
                ("UPLOADER_COMPRESS", "true"),
            ]));
        assert_eq!(Some("http://override"), config.base_url());
        assert_eq!(2, config.max_threads());
        assert!(!config.compression_enabled());
    }

    #[test]
    fn test_invalid_values_ignored() {
        let config = ConfigLoader::default().load_with(env(&[
            ("UPLOADER_CHUNK_SIZE_MB", "lots"),
            ("UPLOADER_COMPRESS", "maybe"),
        ]));
        assert_eq!(5 * ByteUnit::Mebibyte.as_bytes_u64(), config.chunk_size());
        assert!(!config.compression_enabled());
        assert_eq!(None, config.base_url());
    }
}
