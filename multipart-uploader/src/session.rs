/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::error::BoxError;
use crate::types::{Part, UploadSession, UploadedPart};

const INITIALIZE_PATH: &str = "initialize";
const PROVISION_PATH: &str = "getPreSignedUrls";
const FINALIZE_PATH: &str = "finalize";

/// Client for the backend that fronts the storage provider's multipart session API.
///
/// None of these calls are idempotent. The upload scheduler calls each of them at most once per
/// upload and never retries them.
#[async_trait]
pub trait SessionClient: Send + Sync + fmt::Debug {
    /// Start a new multipart session for an object called `name`.
    async fn initiate(&self, name: &str, compression_enabled: bool)
        -> Result<UploadSession, BoxError>;

    /// Request `part_count` signed part URLs, numbered `1..=part_count`.
    async fn provision_urls(
        &self,
        session: &UploadSession,
        part_count: u64,
    ) -> Result<Vec<Part>, BoxError>;

    /// Commit the session from the given uploaded parts (sorted by part number).
    async fn finalize(
        &self,
        session: &UploadSession,
        parts: &[UploadedPart],
    ) -> Result<(), BoxError>;
}

/// Shared [`SessionClient`] implementation
pub type SharedSessionClient = Arc<dyn SessionClient>;

/// Check that provisioned parts are numbered contiguously from 1 and that there are exactly
/// `expected` of them.
pub(crate) fn validate_parts(parts: &[Part], expected: u64) -> Result<(), BoxError> {
    if parts.len() as u64 != expected {
        return Err(format!(
            "requested {expected} part URLs but the backend returned {}",
            parts.len()
        )
        .into());
    }
    for (idx, part) in parts.iter().enumerate() {
        let want = idx as u64 + 1;
        if part.part_number != want {
            return Err(format!(
                "provisioned parts are not numbered contiguously: expected part {want}, found {}",
                part.part_number
            )
            .into());
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    name: &'a str,
    #[serde(rename = "compressData")]
    compress_data: bool,
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    #[serde(rename = "fileId")]
    file_id: String,
    #[serde(rename = "fileKey")]
    file_key: String,
}

#[derive(Debug, Serialize)]
struct ProvisionRequest<'a> {
    #[serde(rename = "fileId")]
    file_id: &'a str,
    #[serde(rename = "fileKey")]
    file_key: &'a str,
    parts: u64,
}

#[derive(Debug, Deserialize)]
struct ProvisionResponse {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct FinalizeRequest<'a> {
    #[serde(rename = "fileId")]
    file_id: &'a str,
    #[serde(rename = "fileKey")]
    file_key: &'a str,
    parts: &'a [UploadedPart],
}

/// [`SessionClient`] talking JSON over HTTP to a backend rooted at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpSessionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionClient {
    /// Create a new client for the backend at `base_url`
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, BoxError>
    where
        Req: Serialize + ?Sized,
        Resp: serde::de::DeserializeOwned,
    {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<Resp>().await?)
    }
}

#[async_trait]
impl SessionClient for HttpSessionClient {
    async fn initiate(
        &self,
        name: &str,
        compression_enabled: bool,
    ) -> Result<UploadSession, BoxError> {
        let req = InitializeRequest {
            name,
            compress_data: compression_enabled,
        };
        let resp: InitializeResponse = self
            .post(INITIALIZE_PATH, &req)
            .instrument(tracing::debug_span!("send-initialize"))
            .await?;
        Ok(UploadSession::new(
            resp.file_id,
            resp.file_key,
            compression_enabled,
        ))
    }

    async fn provision_urls(
        &self,
        session: &UploadSession,
        part_count: u64,
    ) -> Result<Vec<Part>, BoxError> {
        let req = ProvisionRequest {
            file_id: session.session_id(),
            file_key: session.storage_key(),
            parts: part_count,
        };
        let resp: ProvisionResponse = self
            .post(PROVISION_PATH, &req)
            .instrument(tracing::debug_span!("send-get-pre-signed-urls", part_count))
            .await?;
        Ok(resp.parts)
    }

    async fn finalize(
        &self,
        session: &UploadSession,
        parts: &[UploadedPart],
    ) -> Result<(), BoxError> {
        let req = FinalizeRequest {
            file_id: session.session_id(),
            file_key: session.storage_key(),
            parts,
        };
        // the acknowledgement body is not interpreted
        self.client
            .post(self.url(FINALIZE_PATH))
            .json(&req)
            .send()
            .instrument(tracing::debug_span!("send-finalize", parts = parts.len()))
            .await?
            .error_for_status()?;
        Ok(())
    }
}
