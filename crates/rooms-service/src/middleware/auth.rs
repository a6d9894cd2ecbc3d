//! Authentication middleware for protected routes.
//!
//! Validates the bearer token, resolves its subject to an existing user and
//! places that user, with permissions, in request extensions as
//! [`CurrentUser`].

use crate::auth::JwtValidator;
use crate::errors::RoomsError;
use crate::models::CurrentUser;
use crate::repositories::UsersRepository;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_validator: Arc<JwtValidator>,
    pub pool: PgPool,
}

fn extract_bearer_token(req: &Request) -> Result<&str, RoomsError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "rooms.middleware.auth", "Missing Authorization header");
            RoomsError::InvalidToken("Missing Authorization header".to_string())
        })?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::debug!(target: "rooms.middleware.auth", "Invalid Authorization header format");
        RoomsError::InvalidToken("Invalid Authorization header format".to_string())
    })
}

/// Require a valid bearer token naming an existing user.
///
/// Responds 401 when the token is missing or invalid, or when its subject
/// is not a known user.
#[instrument(skip_all, name = "rooms.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, RoomsError> {
    let token = extract_bearer_token(&req)?;

    let claims = state.jwt_validator.validate(token).await?;

    let user_id = claims.user_id().ok_or_else(|| {
        tracing::debug!(target: "rooms.middleware.auth", "Token subject is not a user id");
        RoomsError::InvalidToken("Invalid user identifier in token".to_string())
    })?;

    let current_user = UsersRepository::load_current_user(&state.pool, user_id)
        .await?
        .ok_or_else(|| {
            tracing::debug!(target: "rooms.middleware.auth", user_id = %user_id, "Token subject does not exist");
            RoomsError::InvalidToken("The access token is invalid or expired".to_string())
        })?;

    req.extensions_mut().insert::<CurrentUser>(current_user);

    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/v1/rooms");
        if let Some(value) = value {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        let req = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        let req = request_with_auth(None);
        assert!(
            matches!(extract_bearer_token(&req), Err(RoomsError::InvalidToken(msg)) if msg.contains("Missing"))
        );
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let req = request_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert!(
            matches!(extract_bearer_token(&req), Err(RoomsError::InvalidToken(msg)) if msg.contains("format"))
        );
    }
}
