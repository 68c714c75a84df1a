/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */
#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

//! Chunked, parallel multipart uploads through pre-signed part URLs.
//!
//! A large local file is split into fixed-size parts that are uploaded concurrently with
//! direct `PUT` requests to short-lived signed URLs. A small backend fronts the storage
//! provider's session API: it starts a multipart session, hands out one signed URL per part,
//! and commits the session once every part's ETag is known.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> Result<(), multipart_uploader::error::Error> {
//! use multipart_uploader::io::InputStream;
//!
//! let config = multipart_uploader::from_env()
//!     .base_url("https://example.execute-api.us-east-1.amazonaws.com/prod/")
//!     .load();
//! let client = multipart_uploader::Client::new(config);
//!
//! let handle = client
//!     .upload()
//!     .name("video.mp4")
//!     .body(InputStream::from_path("video.mp4")?)
//!     .on_progress(|progress| println!("{}%", progress.percentage()))
//!     .initiate()?;
//!
//! let output = handle.join().await?;
//! println!("uploaded {} parts", output.parts().len());
//! # Ok(())
//! # }
//! ```

/// Default number of parallel part uploads
pub(crate) const DEFAULT_CONCURRENCY: usize = 5;

/// Upper bound on parallel part uploads
pub(crate) const MAX_CONCURRENCY: usize = 15;

/// Error types emitted by `multipart-uploader`
pub mod error;

/// Common types used by `multipart-uploader`
pub mod types;

/// Types and helpers for I/O
pub mod io;

/// Upload client
pub mod client;

/// Upload operations
pub mod operation;

/// Upload client configuration
pub mod config;

/// Session protocol spoken with the upload backend
pub mod session;

/// Transfer of individual parts to their signed URLs
pub mod transport;

/// Connectivity and retry primitives used while scheduling part transfers
pub mod runtime;

/// Units and throughput helpers
pub mod metrics;

/// HTTP related components and utils
pub(crate) mod http;

pub use self::client::Client;
use self::config::loader::ConfigLoader;
pub use self::config::Config;

/// Create a config loader
pub fn from_env() -> ConfigLoader {
    ConfigLoader::default()
}
