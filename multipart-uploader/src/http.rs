/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use pin_project_lite::pin_project;

use crate::metrics::unit::ByteUnit;
use crate::transport::ProgressReporter;

/// Size of the slices a part body is streamed in. Progress is reported once per slice.
const BODY_SLICE_SIZE: usize = 64 * ByteUnit::Kibibyte.as_bytes_u64() as usize;

/// The default HTTP client used when one is not explicitly configured.
pub(crate) fn default_client() -> reqwest::Client {
    reqwest::Client::new()
}

pub(crate) mod header {
    use reqwest::header::{HeaderMap, ETAG};

    /// The `ETag` response header, if present and valid UTF-8
    pub(crate) fn e_tag(headers: &HeaderMap) -> Option<String> {
        headers
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }
}

pin_project! {
    /// Body stream that reports the cumulative number of bytes handed to the HTTP client.
    pub(crate) struct ProgressStream<S> {
        #[pin]
        inner: S,
        sent: u64,
        reporter: ProgressReporter,
    }
}

impl<S> ProgressStream<S> {
    pub(crate) fn new(inner: S, reporter: ProgressReporter) -> Self {
        Self {
            inner,
            sent: 0,
            reporter,
        }
    }
}

impl<S, E> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let item = ready!(this.inner.poll_next(cx));
        if let Some(Ok(buf)) = &item {
            *this.sent += buf.len() as u64;
            this.reporter.report(*this.sent);
        }
        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Split a part body into slices for streaming, without copying.
pub(crate) fn body_slices(
    mut body: Bytes,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + Sync + 'static {
    let mut slices = Vec::with_capacity(body.len() / BODY_SLICE_SIZE + 1);
    while body.len() > BODY_SLICE_SIZE {
        slices.push(Ok(body.split_to(BODY_SLICE_SIZE)));
    }
    if !body.is_empty() {
        slices.push(Ok(body));
    }
    futures_util::stream::iter(slices)
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use futures_util::StreamExt;
    use reqwest::header::{HeaderMap, HeaderValue, ETAG};
    use tokio::sync::mpsc;

    use super::{body_slices, header, ProgressStream, BODY_SLICE_SIZE};
    use crate::transport::ProgressReporter;

    #[tokio::test]
    async fn test_progress_reported_per_slice() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(7, 1, tx);
        let body = Bytes::from(vec![0u8; BODY_SLICE_SIZE * 2 + 10]);
        let stream = ProgressStream::new(body_slices(body), reporter);
        let total: usize = stream.map(|b| b.unwrap().len()).collect::<Vec<_>>().await.iter().sum();
        assert_eq!(BODY_SLICE_SIZE * 2 + 10, total);

        let mut reported = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(7, event.part_number);
            reported.push(event.bytes_sent);
        }
        let slice = BODY_SLICE_SIZE as u64;
        assert_eq!(vec![slice, slice * 2, slice * 2 + 10], reported);
    }

    #[tokio::test]
    async fn test_empty_body_has_no_slices() {
        assert_eq!(0, body_slices(Bytes::new()).count().await);
    }

    #[test]
    fn test_e_tag_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(None, header::e_tag(&headers));
        headers.insert(ETAG, HeaderValue::from_static("\"abc\""));
        assert_eq!(Some("\"abc\"".to_owned()), header::e_tag(&headers));
    }
}
