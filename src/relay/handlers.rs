//! HTTP request handlers.

use axum::{
    extract::{Extension, Request, State},
    http::{header, Method},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use http_body_util::LengthLimitError;

use super::model::{upstream_url, ModelFamily};
use super::server::{AppState, RequestId};
use super::types::RelayRequest;
use crate::config::ApiKey;
use crate::error::{Error, Result};

/// Handle any method on the relay path.
///
/// Method and key checks run before the body is read, so neither depends on
/// what the caller sent. Everything from body parsing to reading the upstream
/// response sits behind one error boundary that logs faults before they are
/// turned into a 500.
pub async fn relay(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    request: Request,
) -> Result<Response> {
    let correlation_id = request_id.0.to_string();

    if request.method() != Method::POST {
        tracing::debug!(method = %request.method(), "Rejected non-POST request");
        return Err(Error::MethodNotAllowed);
    }

    let api_key = state.config.upstream.resolve_api_key().ok_or_else(|| {
        tracing::error!(
            request_id = %correlation_id,
            var = %state.config.upstream.api_key_env,
            "Upstream API key not configured"
        );
        Error::MissingApiKey
    })?;

    let body = read_body(request, state.config.server.max_body_bytes).await?;

    forward(&state, &api_key, &body, &correlation_id)
        .await
        .inspect_err(|e| {
            if e.is_internal() {
                tracing::error!(request_id = %correlation_id, error = %e, "Proxy error");
            }
        })
}

/// Buffer the inbound body, refusing anything over `limit` bytes.
async fn read_body(request: Request, limit: usize) -> Result<Bytes> {
    axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|e| {
            let source = e.into_inner();
            if source.downcast_ref::<LengthLimitError>().is_some() {
                tracing::info!(limit, "Rejected oversized request body");
                Error::PayloadTooLarge { limit }
            } else {
                tracing::error!(error = %source, "Failed to read request body");
                Error::Internal(format!("Failed to read request body: {}", source))
            }
        })
}

/// Validate the body, pick the endpoint and relay one upstream call.
async fn forward(
    state: &AppState,
    api_key: &ApiKey,
    body: &[u8],
    request_id: &str,
) -> Result<Response> {
    let request = RelayRequest::from_body(body)?;

    let family = ModelFamily::from_model(&request.model_name).ok_or_else(|| {
        tracing::debug!(model = %request.model_name, "Unsupported model requested");
        Error::UnsupportedModel {
            model: request.model_name.clone(),
        }
    })?;

    let url = upstream_url(&state.config.upstream, &request.model_name, family, api_key)?;

    tracing::info!(
        request_id = %request_id,
        model = %request.model_name,
        action = family.action(),
        "Relaying request upstream"
    );

    let upstream_response = state
        .http_client
        .post(url)
        .header(header::CONTENT_TYPE, "application/json")
        .json(&request.api_payload)
        .send()
        .await?;

    let status = upstream_response.status();
    let data: serde_json::Value = upstream_response.json().await?;

    tracing::info!(
        request_id = %request_id,
        status = status.as_u16(),
        "Upstream responded"
    );

    Ok((status, Json(data)).into_response())
}

/// Handle GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "gemrelay"
    }))
}
