// Response envelope for the users API.
// Handlers return HandlerResponse; the wrapper middleware turns every response,
// including extractor rejections and layer errors, into a ResponseFormat body.

use axum::{
    body::{Body, Bytes},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        response::Parts, HeaderValue, Request, Response, StatusCode,
    },
    Json,
    middleware::Next,
    response::IntoResponse,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use tracing::{error, info, warn};

use crate::utils::json::to_two_space_indented_json;

/// JSON body sent for every request
#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseFormat {
    pub status: String,          // e.g. "OK", "NOT_FOUND"
    pub code: u16,
    pub data: Value,
    pub messages: Vec<String>,
    pub date: String,            // RFC3339, UTC
}

impl ResponseFormat {
    fn new(status: StatusCode, data: Value, messages: Vec<String>) -> Self {
        Self {
            status: status_label(status),
            code: status.as_u16(),
            data,
            messages,
            date: Utc::now().to_rfc3339(),
        }
    }
}

/// "Unprocessable Entity" -> "UNPROCESSABLE_ENTITY"
fn status_label(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("UNKNOWN STATUS")
        .to_uppercase()
        .replace(' ', "_")
}

/// What a handler wants to say: status, payload and messages
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status_code: StatusCode,
    pub data: Value,
    pub messages: Vec<String>,
}

impl HandlerResponse {
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            data: Value::Null,
            messages: Vec::new(),
        }
    }

    /// Sets the payload placed under `data`
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> axum::response::Response {
        let mut response: Response<Body> = (
            self.status_code,
            Json(json!({ "data": self.data, "messages": self.messages })),
        )
            .into_response();

        // The wrapper reads this back instead of re-parsing the body
        response.extensions_mut().insert(self);
        response
    }
}

/// Fallback for routes that match nothing
pub async fn not_found_handler() -> HandlerResponse {
    HandlerResponse::new(StatusCode::NOT_FOUND)
        .message("The requested route does not exist")
}

/// Messages for a response that did not come from a handler: the plain-text
/// body axum or a layer produced, or the status reason when that is empty.
fn messages_from_body(status: StatusCode, body: &[u8]) -> Vec<String> {
    let text: String = String::from_utf8_lossy(body).trim().to_string();

    if !text.is_empty() {
        vec![text]
    } else if status.is_client_error() || status.is_server_error() {
        vec![status.canonical_reason().unwrap_or("Request failed").to_string()]
    } else {
        Vec::new()
    }
}

/// Splits a response into its parts plus the envelope's data and messages
async fn envelope_components(response: Response<Body>) -> (Parts, Value, Vec<String>) {
    if let Some(handled) = response.extensions().get::<HandlerResponse>().cloned() {
        let (parts, _) = response.into_parts();
        return (parts, handled.data, handled.messages);
    }

    let (parts, body) = response.into_parts();
    let bytes: Bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("Failed to read response body for status {}: {}", parts.status, e);
            Bytes::new()
        }
    };

    let messages: Vec<String> = messages_from_body(parts.status, &bytes);
    if parts.status.is_client_error() || parts.status.is_server_error() {
        warn!("Request rejected outside the handlers with {}: {:?}", parts.status, messages);
    }

    (parts, Value::Null, messages)
}

fn log_envelope(wrapped: &ResponseFormat) {
    match to_two_space_indented_json(wrapped) {
        Ok(spaced_json) => info!("\nFinal response:\n{}", spaced_json),
        Err(err) => error!("Failed to format response JSON: {:?}", err),
    }
}

/// Middleware that wraps every response in ResponseFormat
pub async fn response_wrapper(
    req: Request<Body>,
    next: Next,
) -> Result<Response<Body>, Infallible> {
    let response: Response<Body> = next.run(req).await;

    let (mut parts, data, messages) = envelope_components(response).await;
    let wrapped: ResponseFormat = ResponseFormat::new(parts.status, data, messages);

    log_envelope(&wrapped);

    let json_body: Vec<u8> = serde_json::to_vec(&wrapped).unwrap_or_else(|_| b"{}".to_vec());
    parts.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.remove(CONTENT_LENGTH);

    Ok(Response::from_parts(parts, Body::from(json_body)))
}
