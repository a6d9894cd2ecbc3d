//! JWKS client for fetching and caching the identity provider's public keys.
//!
//! Keys are fetched from the configured `/.well-known/jwks.json` endpoint and
//! cached with a TTL so key rotations are picked up without a restart. An
//! unknown `kid` against a still-valid cache is rejected without refetching.

use crate::errors::RoomsError;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Default cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Timeout for a single JWKS fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("OKP" for Ed25519).
    pub kty: String,

    /// Key ID.
    pub kid: String,

    /// Curve name ("Ed25519").
    #[serde(default)]
    pub crv: Option<String>,

    /// Public key value (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// Algorithm ("EdDSA").
    #[serde(default)]
    pub alg: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

struct CachedJwks {
    keys: HashMap<String, Jwk>,
    expires_at: Instant,
}

/// Thread-safe JWKS client with a TTL cache.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    cache_ttl: Duration,
}

impl JwksClient {
    pub fn new(jwks_url: String) -> Self {
        Self::with_ttl(jwks_url, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "rooms.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        }
    }

    /// Look up a key by `kid`, fetching the JWKS when the cache is empty or stale.
    ///
    /// # Errors
    ///
    /// - `RoomsError::ServiceUnavailable` if the JWKS cannot be fetched
    /// - `RoomsError::InvalidToken` if no key has this `kid`
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, RoomsError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    return match cached.keys.get(kid) {
                        Some(key) => {
                            tracing::debug!(target: "rooms.auth.jwks", kid = %kid, "JWKS cache hit");
                            Ok(key.clone())
                        }
                        None => {
                            tracing::debug!(target: "rooms.auth.jwks", kid = %kid, "Key not found in JWKS cache");
                            Err(invalid_token())
                        }
                    };
                }
            }
        }

        self.refresh_cache().await?;

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|c| c.keys.get(kid)) {
            return Ok(key.clone());
        }

        tracing::warn!(target: "rooms.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
        Err(invalid_token())
    }

    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<(), RoomsError> {
        tracing::debug!(target: "rooms.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "rooms.auth.jwks", error = %e, "Failed to fetch JWKS");
                unavailable()
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "rooms.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(unavailable());
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "rooms.auth.jwks", error = %e, "Failed to parse JWKS response");
            unavailable()
        })?;

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(target: "rooms.auth.jwks", key_count = keys.len(), "JWKS cache refreshed");

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            expires_at: Instant::now() + self.cache_ttl,
        });

        Ok(())
    }
}

fn invalid_token() -> RoomsError {
    RoomsError::InvalidToken("The access token is invalid or expired".to_string())
}

fn unavailable() -> RoomsError {
    RoomsError::ServiceUnavailable("Authentication service unavailable".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn jwks_body() -> serde_json::Value {
        serde_json::json!({
            "keys": [
                {"kty": "OKP", "kid": "key-1", "crv": "Ed25519", "x": "abc", "alg": "EdDSA"},
                {"kty": "OKP", "kid": "key-2"}
            ]
        })
    }

    #[test]
    fn test_jwk_deserialization_minimal() {
        let jwk: Jwk = serde_json::from_str(r#"{"kty": "OKP", "kid": "k"}"#).unwrap();

        assert_eq!(jwk.kid, "k");
        assert!(jwk.crv.is_none());
        assert!(jwk.x.is_none());
        assert!(jwk.alg.is_none());
    }

    #[tokio::test]
    async fn test_get_key_fetches_once_then_uses_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/.well-known/jwks.json", server.uri()));

        let key = client.get_key("key-1").await.unwrap();
        assert_eq!(key.x.as_deref(), Some("abc"));
        assert_eq!(client.get_key("key-2").await.unwrap().kid, "key-2");

        let missing = client.get_key("unknown").await;
        assert!(matches!(missing, Err(RoomsError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_get_key_upstream_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/.well-known/jwks.json", server.uri()));

        assert!(matches!(
            client.get_key("key-1").await,
            Err(RoomsError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_cache_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .expect(2)
            .mount(&server)
            .await;

        let client = JwksClient::with_ttl(
            format!("{}/.well-known/jwks.json", server.uri()),
            Duration::ZERO,
        );

        client.get_key("key-1").await.unwrap();
        client.get_key("key-1").await.unwrap();
    }
}
