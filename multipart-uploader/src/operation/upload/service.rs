/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use bytes::Bytes;
use tower::util::BoxCloneService;
use tower::{service_fn, ServiceBuilder};

use crate::error::TransferFailure;
use crate::operation::upload::UploadContext;
use crate::runtime::connectivity::wait_offline;
use crate::transport::ProgressReporter;
use crate::types::Part;

/// Request/input type for our "upload_part" service.
#[derive(Debug, Clone)]
pub(super) struct UploadPartRequest {
    pub(super) ctx: UploadContext,
    pub(super) part: Part,
    pub(super) body: Bytes,
    pub(super) progress: ProgressReporter,
}

pub(super) type UploadPartService = BoxCloneService<UploadPartRequest, String, TransferFailure>;

/// handler (service fn) for a single part attempt
async fn upload_part_handler(request: UploadPartRequest) -> Result<String, TransferFailure> {
    let UploadPartRequest {
        ctx,
        part,
        body,
        progress,
    } = request;

    let connectivity = ctx.connectivity();
    if !connectivity.is_online() {
        return Err(TransferFailure::Offline);
    }
    let offline = wait_offline(connectivity.subscribe());

    let transfer = ctx.part_transport().put_part(&part, body, progress);
    let transfer = async {
        match ctx.config().part_timeout() {
            Some(limit) => match tokio::time::timeout(limit, transfer).await {
                Ok(result) => result,
                Err(_) => Err(TransferFailure::Timeout(limit)),
            },
            None => transfer.await,
        }
    };

    let result = tokio::select! {
        biased;
        _ = offline => Err(TransferFailure::Offline),
        result = transfer => result,
    };
    if result.is_ok() {
        tracing::trace!("completed upload of part number {}", part.part_number());
    }
    result
}

/// Create a new tower::Service for uploading individual parts
pub(super) fn upload_part_service(ctx: &UploadContext) -> UploadPartService {
    let svc = ServiceBuilder::new()
        .concurrency_limit(ctx.config().max_threads())
        .service(service_fn(upload_part_handler));
    BoxCloneService::new(svc)
}
