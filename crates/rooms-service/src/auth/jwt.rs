//! Bearer token validation.
//!
//! Tokens are size-checked before parsing, must be signed with EdDSA by a key
//! from the JWKS, must not be expired, and must not be issued too far in the
//! future. Every failure maps to the same generic client message.

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::errors::RoomsError;
use common::jwt::{decode_ed25519_public_key_jwk, extract_kid, validate_iat};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

const INVALID_TOKEN_MESSAGE: &str = "The access token is invalid or expired";

/// JWT validator backed by a JWKS client.
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    clock_skew: Duration,
}

impl JwtValidator {
    pub fn new(jwks_client: Arc<JwksClient>, clock_skew: Duration) -> Self {
        Self {
            jwks_client,
            clock_skew,
        }
    }

    /// Validate a bearer token and return its claims.
    ///
    /// # Errors
    ///
    /// `RoomsError::InvalidToken` for any validation failure,
    /// `RoomsError::ServiceUnavailable` when the JWKS cannot be fetched.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<Claims, RoomsError> {
        let kid = extract_kid(token).map_err(|e| {
            tracing::debug!(target: "rooms.auth.jwt", error = ?e, "Token kid extraction failed");
            invalid_token()
        })?;

        let jwk = self.jwks_client.get_key(&kid).await?;

        let claims = verify_token(token, &jwk)?;

        if let Err(e) = validate_iat(claims.iat, self.clock_skew) {
            tracing::debug!(target: "rooms.auth.jwt", error = ?e, "Token iat validation failed");
            return Err(invalid_token());
        }

        tracing::debug!(target: "rooms.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}

fn invalid_token() -> RoomsError {
    RoomsError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
}

/// Verify the signature with `jwk` and decode the claims. EdDSA only.
fn verify_token(token: &str, jwk: &Jwk) -> Result<Claims, RoomsError> {
    if jwk.kty != "OKP" {
        tracing::warn!(target: "rooms.auth.jwt", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(invalid_token());
    }
    if let Some(alg) = &jwk.alg {
        if alg != "EdDSA" {
            tracing::warn!(target: "rooms.auth.jwt", alg = %alg, "Unexpected JWK algorithm");
            return Err(invalid_token());
        }
    }

    let public_key_b64 = jwk.x.as_ref().ok_or_else(|| {
        tracing::error!(target: "rooms.auth.jwt", kid = %jwk.kid, "JWK missing x field");
        invalid_token()
    })?;

    let public_key_bytes = decode_ed25519_public_key_jwk(public_key_b64).map_err(|e| {
        tracing::error!(target: "rooms.auth.jwt", error = %e, "Invalid public key encoding");
        invalid_token()
    })?;

    let decoding_key = DecodingKey::from_ed_der(&public_key_bytes);

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "rooms.auth.jwt", error = %e, "Token verification failed");
        invalid_token()
    })?;

    Ok(token_data.claims)
}
