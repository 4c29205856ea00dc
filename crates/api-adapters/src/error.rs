//! HTTP error mapping. Every failure renders the same envelope as a
//! success, with `success: false` and a human-readable `message`.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use domains::DomainError;

use crate::response::Envelope;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Malformed path, query, JSON or multipart input
    #[error("{0}")]
    BadRequest(String),
    #[error("too many attempts, retry in {retry_after_secs}s")]
    TooManyRequests { retry_after_secs: u64 },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(e) => match e {
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
                DomainError::Conflict(_) => StatusCode::CONFLICT,
                DomainError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// The message shown to clients. Internal details never leave the server.
    fn public_message(&self) -> String {
        match self {
            Self::Domain(e) => match e {
                DomainError::NotFound { entity, .. } => format!("{entity} not found"),
                DomainError::Validation(m)
                | DomainError::Unauthorized(m)
                | DomainError::Forbidden(m)
                | DomainError::Conflict(m)
                | DomainError::RateLimited(m) => m.clone(),
                DomainError::Internal(_) => "internal server error".to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let mut response = (status, Envelope::<()>::failure(self.public_message())).into_response();
        if let Self::TooManyRequests { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self::BadRequest(error.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::not_found("Game", "x"), StatusCode::NOT_FOUND),
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (DomainError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (DomainError::forbidden("no"), StatusCode::FORBIDDEN),
            (DomainError::conflict("dup"), StatusCode::CONFLICT),
            (DomainError::internal("db down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = ApiError::from(DomainError::internal("connection refused on 10.0.0.3"));
        assert_eq!(err.public_message(), "internal server error");
        let err = ApiError::from(DomainError::not_found("Booking", "123"));
        assert_eq!(err.public_message(), "Booking not found");
    }

    #[test]
    fn rate_limit_sets_retry_after() {
        let response = ApiError::TooManyRequests { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
