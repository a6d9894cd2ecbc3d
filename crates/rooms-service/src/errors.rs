//! Rooms service error types.
//!
//! Every error maps to an HTTP status code through `IntoResponse`. Messages
//! sent to clients stay generic for database and internal failures; the
//! underlying cause is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Rooms service error type.
///
/// Status mapping:
/// - Database, Internal: 500
/// - InvalidToken: 401
/// - NotFound: 404
/// - Forbidden: 403
/// - BadRequest: 400
/// - PayloadTooLarge: 413
/// - ServiceUnavailable: 503
#[derive(Debug, Error)]
pub enum RoomsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl RoomsError {
    /// Short label used for the `error_type` metric dimension.
    pub fn error_type(&self) -> &'static str {
        match self {
            RoomsError::Database(_) => "database",
            RoomsError::InvalidToken(_) => "unauthorized",
            RoomsError::NotFound(_) => "not_found",
            RoomsError::Forbidden(_) => "forbidden",
            RoomsError::BadRequest(_) => "bad_request",
            RoomsError::PayloadTooLarge(_) => "payload_too_large",
            RoomsError::ServiceUnavailable(_) => "unavailable",
            RoomsError::Internal => "internal",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    data: Option<()>,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for RoomsError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            RoomsError::Database(err) => {
                tracing::error!(target: "rooms.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            RoomsError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason.clone())
            }
            RoomsError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            RoomsError::Forbidden(reason) => (StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone()),
            RoomsError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            RoomsError::PayloadTooLarge(reason) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                reason.clone(),
            ),
            RoomsError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "rooms.availability", reason = %reason, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            RoomsError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            data: None,
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"rooms-api\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl From<sqlx::Error> for RoomsError {
    fn from(err: sqlx::Error) -> Self {
        RoomsError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            RoomsError::Database("connection failed".to_string()).to_string(),
            "Database error: connection failed"
        );
        assert_eq!(
            RoomsError::NotFound("Room not found".to_string()).to_string(),
            "Not found: Room not found"
        );
        assert_eq!(
            RoomsError::PayloadTooLarge("presentation".to_string()).to_string(),
            "Payload too large: presentation"
        );
        assert_eq!(RoomsError::Internal.to_string(), "Internal server error");
    }

    #[tokio::test]
    async fn test_into_response_database_error_is_generic() {
        let response = RoomsError::Database("relation rooms does not exist".to_string())
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert!(body_json["data"].is_null());
        assert_eq!(body_json["error"]["code"], "DATABASE_ERROR");
        assert_eq!(
            body_json["error"]["message"],
            "An internal database error occurred"
        );
    }

    #[tokio::test]
    async fn test_into_response_invalid_token_sets_www_authenticate() {
        let response = RoomsError::InvalidToken("token expired".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let www_auth = response
            .headers()
            .get("WWW-Authenticate")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.contains("Bearer realm=\"rooms-api\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INVALID_TOKEN");
        assert_eq!(body_json["error"]["message"], "token expired");
    }

    #[tokio::test]
    async fn test_into_response_client_errors_keep_message() {
        let cases = [
            (
                RoomsError::NotFound("Room not found".to_string()),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                RoomsError::Forbidden("Not allowed".to_string()),
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
            ),
            (
                RoomsError::BadRequest("Invalid name".to_string()),
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
            ),
            (
                RoomsError::PayloadTooLarge("Too big".to_string()),
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
            ),
        ];

        for (error, status, code) in cases {
            let message = match &error {
                RoomsError::NotFound(m)
                | RoomsError::Forbidden(m)
                | RoomsError::BadRequest(m)
                | RoomsError::PayloadTooLarge(m) => m.clone(),
                _ => unreachable!(),
            };
            let response = error.into_response();
            assert_eq!(response.status(), status);
            assert!(response.headers().get("WWW-Authenticate").is_none());

            let body_json = read_body_json(response.into_body()).await;
            assert_eq!(body_json["error"]["code"], code);
            assert_eq!(body_json["error"]["message"], message);
        }
    }

    #[tokio::test]
    async fn test_into_response_service_unavailable_is_generic() {
        let response =
            RoomsError::ServiceUnavailable("database maintenance".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(
            body_json["error"]["message"],
            "Service temporarily unavailable"
        );
    }

    #[tokio::test]
    async fn test_into_response_internal() {
        let response = RoomsError::Internal.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INTERNAL_ERROR");
    }

    #[test]
    fn test_from_sqlx_error() {
        let error: RoomsError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, RoomsError::Database(_)));
    }
}
