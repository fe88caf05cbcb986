//! The correlation handler — one bus round-trip per HTTP request.
//!
//! Per-request state machine: received → published → (responded | timed
//! out). The correlation subscription is created *before* the request is
//! published, closing the race between publish and response arrival, and is
//! dropped on every exit path so no request can leak a registration.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use homebus_app::bus::Subscription;
use homebus_domain::event::{Event, Payload};
use homebus_domain::topic;

use crate::state::BridgeState;

/// Fallback handler for every path not served by the bridge itself.
pub async fn handle(State(state): State<BridgeState>, uri: Uri, body: Bytes) -> Response {
    let path = uri.path();

    // anything that'll serve this path? if not, bail early
    if !state.paths.contains(path) {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    if body.len() > state.config.max_body_bytes {
        return (
            StatusCode::BAD_REQUEST,
            format!(
                "request body must be {} bytes or less",
                state.config.max_body_bytes
            ),
        )
            .into_response();
    }

    let id = Uuid::new_v4().to_string();
    let mut responses = state.bus.subscribe(topic::http_response(&id));

    let request = Event::new(topic::http_request(path), Payload::HttpRequest {
        id: id.clone(),
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    if state.bus.publish(request).await.is_err() {
        return (StatusCode::SERVICE_UNAVAILABLE, "event bus unavailable").into_response();
    }

    match tokio::time::timeout(state.config.response_timeout, first_response(&mut responses))
        .await
    {
        Ok(Some((status, body))) => relay(status, body),
        // end-of-stream: the bus shut down while we were waiting
        Ok(None) => (StatusCode::SERVICE_UNAVAILABLE, "event bus unavailable").into_response(),
        Err(_) => {
            tracing::debug!(%path, %id, "no adapter answered within the response timeout");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "timed out waiting for a response to be generated",
            )
                .into_response()
        }
    }
    // `responses` is dropped here on every branch: the registration is
    // reaped and any later reply for this id is ignored
}

/// Wait for the first `HttpResponse` on the correlation subscription,
/// skipping payloads of any other kind.
async fn first_response(responses: &mut Subscription) -> Option<(u16, String)> {
    while let Some(payload) = responses.recv().await {
        if let Payload::HttpResponse { status, body, .. } = payload {
            return Some((status, body));
        }
    }
    None
}

/// Map a bus-generated status/body pair onto the HTTP response.
fn relay(status: u16, body: String) -> Response {
    match StatusCode::from_u16(status) {
        Ok(status) => (status, body).into_response(),
        Err(_) => {
            tracing::warn!(status, "adapter produced an invalid status code");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("adapter produced an invalid status code ({status})"),
            )
                .into_response()
        }
    }
}
