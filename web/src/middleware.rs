//! Request tracking.
//!
//! Each request carries a correlation id: the client's `X-Correlation-ID`
//! when it is a valid UUID, a fresh v4 otherwise. The id lands in the request
//! extensions and the `http_request` span, and is echoed on the response so a
//! visitor whose download failed can quote it. The layer also logs each
//! response and feeds the HTTP request metrics.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, request::Parts},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation id both ways.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Tracking layer for the whole router.
#[must_use]
pub const fn correlation_id_layer() -> RequestTrackingLayer {
    RequestTrackingLayer
}

/// See the module docs.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestTrackingLayer;

impl<S> Layer<S> for RequestTrackingLayer {
    type Service = RequestTracking<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTracking { inner }
    }
}

/// Service produced by [`RequestTrackingLayer`].
#[derive(Clone, Debug)]
pub struct RequestTracking<S> {
    inner: S,
}

/// The id a client supplied, or a new one.
#[must_use]
pub fn correlation_id_from(headers: &HeaderMap) -> Uuid {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}

type BoxedResponse<E> = Pin<Box<dyn Future<Output = Result<Response, E>> + Send>>;

impl<S> Service<Request> for RequestTracking<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxedResponse<S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let id = correlation_id_from(request.headers());
        request.extensions_mut().insert(id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %id,
            method = %request.method(),
            path = %request.uri().path(),
        );
        let started = Instant::now();
        let pending = self.inner.call(request);

        Box::pin(
            async move {
                let mut response = pending.await?;
                let status = response.status();
                let elapsed = started.elapsed();

                metrics::counter!("pixwap_http_requests_total", "status" => status.as_u16().to_string())
                    .increment(1);
                metrics::histogram!("pixwap_http_request_duration_seconds").record(elapsed.as_secs_f64());
                if status.is_server_error() {
                    tracing::warn!(status = status.as_u16(), ?elapsed, "Request failed");
                } else {
                    tracing::debug!(status = status.as_u16(), ?elapsed, "Request served");
                }

                if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                    response.headers_mut().insert(CORRELATION_ID_HEADER, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Correlation id stored by [`RequestTracking`].
pub trait CorrelationIdExt {
    /// `None` when the layer is not installed.
    fn correlation_id(&self) -> Option<Uuid>;
}

impl CorrelationIdExt for Request {
    fn correlation_id(&self) -> Option<Uuid> {
        self.extensions().get::<Uuid>().copied()
    }
}

impl CorrelationIdExt for Parts {
    fn correlation_id(&self) -> Option<Uuid> {
        self.extensions.get::<Uuid>().copied()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/event/:id", get(|| async { "gallery" }))
            .route("/broken", get(|| async { StatusCode::BAD_GATEWAY }))
            .route(
                "/whoami",
                get(|request: Request| async move {
                    request.correlation_id().map(|id| id.to_string()).unwrap_or_default()
                }),
            )
            .layer(correlation_id_layer())
    }

    async fn echoed(uri: &str, sent: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(sent) = sent {
            builder = builder.header(CORRELATION_ID_HEADER, sent);
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("correlation header on every response")
            .to_str()
            .unwrap()
            .to_string();
        (response.status(), header)
    }

    #[tokio::test]
    async fn visitor_supplied_id_is_echoed() {
        let id = Uuid::new_v4().to_string();
        let (status, echoed_id) = echoed("/event/evt-1", Some(&id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(echoed_id, id);
    }

    #[tokio::test]
    async fn missing_or_garbled_ids_are_replaced() {
        let (_, fresh) = echoed("/event/evt-1", None).await;
        assert!(Uuid::parse_str(&fresh).is_ok());

        let (_, replaced) = echoed("/event/evt-1", Some("download-42")).await;
        assert_ne!(replaced, "download-42");
        assert!(Uuid::parse_str(&replaced).is_ok());
    }

    #[tokio::test]
    async fn error_responses_still_carry_the_id() {
        let id = Uuid::new_v4().to_string();
        let (status, echoed_id) = echoed("/broken", Some(&id)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(echoed_id, id);
    }

    #[tokio::test]
    async fn handlers_read_the_stored_id() {
        let id = Uuid::new_v4();
        let request = axum::http::Request::builder()
            .uri("/whoami")
            .header(CORRELATION_ID_HEADER, id.to_string())
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
        assert_eq!(body, id.to_string().as_bytes());
    }
}
