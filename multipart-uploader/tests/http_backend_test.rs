/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Runs uploads end to end against a local HTTP server speaking the upload backend protocol.

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::error::Error as _;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use multipart_uploader::error::{ErrorKind, TransferFailure};
use multipart_uploader::io::InputStream;
use multipart_uploader::runtime::retry::RetryPolicy;
use multipart_uploader::{Client, Config};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const MIB: usize = 1024 * 1024;

/// What the mock backend received and how it should misbehave
#[derive(Debug, Default)]
struct BackendState {
    initialize_requests: Vec<Value>,
    provision_requests: Vec<Value>,
    finalize_requests: Vec<Value>,
    /// stored part bodies by part number
    parts: BTreeMap<u64, Bytes>,
    /// part number -> number of PUTs that should still be rejected
    reject_parts: HashMap<u64, u32>,
    fail_initialize: bool,
    omit_e_tag: bool,
}

type SharedState = Arc<Mutex<BackendState>>;

fn json_response(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn handle(
    req: Request<Incoming>,
    addr: SocketAddr,
    state: SharedState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let body = req.into_body().collect().await.unwrap().to_bytes();

    let mut state = state.lock().unwrap();
    let resp = match (method, path.as_str()) {
        (Method::POST, "/api/initialize") => {
            let req: Value = serde_json::from_slice(&body).unwrap();
            let name = req["name"].as_str().unwrap_or_default().to_owned();
            state.initialize_requests.push(req);
            if state.fail_initialize {
                json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({}))
            } else {
                json_response(
                    StatusCode::OK,
                    json!({ "fileId": "file-1", "fileKey": format!("uploads/{name}") }),
                )
            }
        }
        (Method::POST, "/api/getPreSignedUrls") => {
            let req: Value = serde_json::from_slice(&body).unwrap();
            let count = req["parts"].as_u64().unwrap();
            state.provision_requests.push(req);
            let parts = (1..=count)
                .map(|n| json!({ "PartNumber": n, "signedUrl": format!("http://{addr}/parts/{n}?sig=abc") }))
                .collect::<Vec<_>>();
            json_response(StatusCode::OK, json!({ "parts": parts }))
        }
        (Method::POST, "/api/finalize") => {
            state
                .finalize_requests
                .push(serde_json::from_slice(&body).unwrap());
            json_response(StatusCode::OK, json!({ "status": "ok" }))
        }
        (Method::PUT, path) if path.starts_with("/parts/") => {
            let part_number: u64 = path["/parts/".len()..].parse().unwrap();
            let rejected = match state.reject_parts.get_mut(&part_number) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            };
            if rejected {
                json_response(StatusCode::SERVICE_UNAVAILABLE, json!({}))
            } else {
                let len = body.len();
                state.parts.insert(part_number, body);
                let mut resp = Response::builder().status(StatusCode::OK);
                if !state.omit_e_tag {
                    resp = resp.header("ETag", format!("\"etag-{part_number}-{len}\""));
                }
                resp.body(Full::new(Bytes::new())).unwrap()
            }
        }
        _ => json_response(StatusCode::NOT_FOUND, json!({})),
    };
    Ok(resp)
}

/// Start the mock backend on an ephemeral port, returning its address
async fn start_backend(state: SharedState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    tracing::error!("error accepting connection: {err}");
                    continue;
                }
            };
            let state = state.clone();
            tokio::spawn(async move {
                let svc = service_fn(move |req| handle(req, addr, state.clone()));
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(socket), svc)
                    .await;
            });
        }
    });
    addr
}

fn http_client(addr: SocketAddr, compress: bool) -> Client {
    let config = Config::builder()
        .base_url(format!("http://{addr}/api/"))
        .compression_enabled(compress)
        .retry_policy(RetryPolicy::new(Duration::from_millis(10), 3))
        .build();
    Client::new(config)
}

#[tokio::test]
async fn test_upload_over_http() {
    let state = SharedState::default();
    state.lock().unwrap().reject_parts.insert(2, 1);
    let addr = start_backend(state.clone()).await;
    let file = test_common::create_patterned_file(12 * MIB);

    let output = http_client(addr, false)
        .upload()
        .name("report.csv")
        .body(InputStream::from_path(file.path()).unwrap())
        .initiate()
        .unwrap()
        .join()
        .await
        .unwrap();

    assert_eq!("file-1", output.session_id());
    assert_eq!("uploads/report.csv", output.storage_key());

    let state = state.lock().unwrap();
    assert_eq!(
        vec![json!({ "name": "report.csv", "compressData": false })],
        state.initialize_requests
    );
    assert_eq!(
        vec![json!({ "fileId": "file-1", "fileKey": "uploads/report.csv", "parts": 4 })],
        state.provision_requests
    );
    assert_eq!(
        vec![json!({
            "fileId": "file-1",
            "fileKey": "uploads/report.csv",
            "parts": [
                { "PartNumber": 1, "ETag": format!("etag-1-{}", 5 * MIB) },
                { "PartNumber": 2, "ETag": format!("etag-2-{}", 5 * MIB) },
                { "PartNumber": 3, "ETag": format!("etag-3-{}", 2 * MIB) },
            ]
        })],
        state.finalize_requests
    );

    let uploaded = state
        .parts
        .values()
        .flat_map(|b| b.iter().copied())
        .collect::<Vec<_>>();
    assert_eq!(std::fs::read(file.path()).unwrap(), uploaded);
}

#[tokio::test]
async fn test_compressed_upload_over_http() {
    let state = SharedState::default();
    let addr = start_backend(state.clone()).await;
    let file = test_common::create_compressible_file(6 * MIB);

    let output = http_client(addr, true)
        .upload()
        .name("app.log")
        .body(InputStream::from_path(file.path()).unwrap())
        .initiate()
        .unwrap()
        .join()
        .await
        .unwrap();

    assert!(output.compression_ratio() > 1.0);
    let state = state.lock().unwrap();
    assert_eq!(
        Some(true),
        state.initialize_requests[0]["compressData"].as_bool()
    );
    let stored: usize = state.parts.values().map(Bytes::len).sum();
    assert_eq!(output.bytes_uploaded(), stored as u64);
}

#[tokio::test]
async fn test_initialize_error_status_fails_session() {
    let state = SharedState::default();
    state.lock().unwrap().fail_initialize = true;
    let addr = start_backend(state.clone()).await;

    let err = http_client(addr, false)
        .upload()
        .name("report.csv")
        .body(InputStream::from_static(b"hello world"))
        .initiate()
        .unwrap()
        .join()
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::SessionFailed, err.kind());
    let state = state.lock().unwrap();
    assert!(state.provision_requests.is_empty());
    assert!(state.parts.is_empty());
}

#[tokio::test]
async fn test_missing_e_tag_fails_part() {
    let state = SharedState::default();
    state.lock().unwrap().omit_e_tag = true;
    let addr = start_backend(state.clone()).await;

    let err = http_client(addr, false)
        .upload()
        .name("report.csv")
        .body(InputStream::from_static(b"hello world"))
        .initiate()
        .unwrap()
        .join()
        .await
        .unwrap_err();

    match err.kind() {
        ErrorKind::PartFailed(failed) => assert_eq!(3, failed.attempts()),
        kind => panic!("unexpected error kind {kind:?}"),
    }
    let cause = err.source().unwrap().downcast_ref::<TransferFailure>();
    assert!(matches!(cause, Some(TransferFailure::MissingETag)));
    assert!(state.lock().unwrap().finalize_requests.is_empty());
}

#[tokio::test]
async fn test_rejected_part_exhausts_retries() {
    let state = SharedState::default();
    state.lock().unwrap().reject_parts.insert(1, u32::MAX);
    let addr = start_backend(state.clone()).await;

    let err = http_client(addr, false)
        .upload()
        .name("report.csv")
        .body(InputStream::from_static(b"hello world"))
        .initiate()
        .unwrap()
        .join()
        .await
        .unwrap_err();

    let cause = err.source().unwrap().downcast_ref::<TransferFailure>();
    assert!(matches!(cause, Some(TransferFailure::Status(503))));
    assert!(state.lock().unwrap().finalize_requests.is_empty());
}
