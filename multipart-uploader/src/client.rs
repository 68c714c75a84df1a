/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::config::Config;
use crate::session::{HttpSessionClient, SharedSessionClient};
use crate::transport::{HttpPartTransport, SharedPartTransport};

/// Upload client
///
/// Client for uploading large files through a multipart session backend.
///
/// ## Examples
/// Load a client from the environment:
/// ```no_run
/// use multipart_uploader::Client;
///
/// fn make_client() -> Client {
///     let config = multipart_uploader::from_env().load();
///     Client::new(config)
/// }
/// ```
///
/// Cloning a client is cheap: clones share the same configuration and connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) handle: Arc<Handle>,
}

/// Whatever is needed to carry out operations, e.g. scheduling, configuration, etc
#[derive(Debug)]
pub(crate) struct Handle {
    pub(crate) config: Config,
    pub(crate) session_client: Option<SharedSessionClient>,
    pub(crate) part_transport: SharedPartTransport,
}

impl Client {
    /// Creates a new client with a given config.
    ///
    /// Backend calls go to [`Config::base_url`] unless a custom session client was configured.
    pub fn new(config: Config) -> Client {
        let http_client = config
            .http_client()
            .cloned()
            .unwrap_or_else(crate::http::default_client);

        let session_client = config.session_client().cloned().or_else(|| {
            config.base_url().map(|base_url| {
                let client = HttpSessionClient::new(http_client.clone(), base_url);
                Arc::new(client) as SharedSessionClient
            })
        });
        let part_transport = config
            .part_transport()
            .cloned()
            .unwrap_or_else(|| {
                let transport = HttpPartTransport::new(http_client);
                Arc::new(transport) as SharedPartTransport
            });

        let handle = Arc::new(Handle {
            config,
            session_client,
            part_transport,
        });
        Client { handle }
    }

    /// Returns the client's configuration
    pub fn config(&self) -> &Config {
        &self.handle.config
    }

    /// Upload a single file.
    ///
    /// Constructs a fluent builder for the
    /// [`Upload`](crate::operation::upload::builders::UploadFluentBuilder) operation.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use multipart_uploader::io::InputStream;
    ///
    /// async fn upload_compressed(
    ///     client: &multipart_uploader::Client,
    ///     path: &Path,
    /// ) -> Result<String, multipart_uploader::error::Error> {
    ///     let name = path.file_name().unwrap().to_string_lossy().into_owned();
    ///     let handle = client
    ///         .upload()
    ///         .name(name)
    ///         .body(InputStream::from_path(path)?)
    ///         .on_error(|err| eprintln!("upload failed: {err}"))
    ///         .initiate()?;
    ///
    ///     // the parts are transferred in the background until joined or aborted
    ///     let output = handle.join().await?;
    ///     Ok(output.storage_key().to_owned())
    /// }
    /// ```
    pub fn upload(&self) -> crate::operation::upload::builders::UploadFluentBuilder {
        crate::operation::upload::builders::UploadFluentBuilder::new(self.handle.clone())
    }
}
