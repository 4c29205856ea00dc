//! The `{ success, data, message }` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn failure(message: impl Into<String>) -> Json<Self> {
        Json(Self { success: false, data: None, message: Some(message.into()) })
    }
}

/// A successful response: status code plus enveloped data.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { status: StatusCode::OK, body: Envelope { success: true, data: Some(data), message: None } }
    }

    pub fn created(data: T) -> Self {
        Self { status: StatusCode::CREATED, ..Self::ok(data) }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.body.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// A success with nothing to return but a confirmation.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope { success: true, data: None, message: Some(message.into()) },
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
