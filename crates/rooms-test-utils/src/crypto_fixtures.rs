//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs that can sign bearer tokens and
//! publish themselves as a JWK.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Claims of a test bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl TestClaims {
    /// Claims for `sub`, issued now and valid for an hour.
    pub fn valid_for(sub: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: sub.into(),
            exp: now + 3600,
            iat: now,
        }
    }

    /// Claims for `sub` that expired an hour ago.
    pub fn expired_for(sub: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: sub.into(),
            exp: now - 3600,
            iat: now - 7200,
        }
    }
}

/// Ed25519 keypair that signs test tokens.
pub struct TestKeypair {
    kid: String,
    public_key_bytes: Vec<u8>,
    private_key_pkcs8: Vec<u8>,
}

impl TestKeypair {
    /// The same seed always produces the same keypair.
    pub fn new(seed: u8, kid: &str) -> Result<Self, FixtureError> {
        let mut seed_bytes = [0u8; 32];
        seed_bytes[0] = seed;
        for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
            *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
        }

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes).map_err(|e| {
            FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e))
        })?;

        Ok(Self {
            kid: kid.to_string(),
            public_key_bytes: key_pair.public_key().as_ref().to_vec(),
            private_key_pkcs8: build_pkcs8_from_seed(&seed_bytes),
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Sign `claims` as an EdDSA JWT carrying this key's `kid`.
    pub fn sign_token(&self, claims: &TestClaims) -> Result<String, FixtureError> {
        let encoding_key = EncodingKey::from_ed_der(&self.private_key_pkcs8);
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &encoding_key).map_err(|e| FixtureError::Signing(e.to_string()))
    }

    /// This key as a JWKS entry.
    pub fn jwk_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kty": "OKP",
            "kid": self.kid,
            "crv": "Ed25519",
            "x": URL_SAFE_NO_PAD.encode(&self.public_key_bytes),
            "alg": "EdDSA",
            "use": "sig"
        })
    }
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// Test-only. ring does not expose PKCS#8 for a seeded keypair.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(48);

    // Outer SEQUENCE, 46 bytes
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    // Version: INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    // AlgorithmIdentifier SEQUENCE with OID 1.3.101.112 (Ed25519)
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // OCTET STRING wrapping an OCTET STRING with the 32-byte seed
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);

    pkcs8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_is_deterministic() {
        let a = TestKeypair::new(7, "k1").expect("keypair");
        let b = TestKeypair::new(7, "k1").expect("keypair");
        assert_eq!(a.jwk_json(), b.jwk_json());

        let c = TestKeypair::new(8, "k1").expect("keypair");
        assert_ne!(a.jwk_json()["x"], c.jwk_json()["x"]);
    }

    #[test]
    fn test_pkcs8_layout() {
        let pkcs8 = build_pkcs8_from_seed(&[1u8; 32]);
        assert_eq!(pkcs8.len(), 48);
        assert_eq!(&pkcs8[..2], &[0x30, 0x2e]);
        assert_eq!(&pkcs8[16..], &[1u8; 32]);
    }

    #[test]
    fn test_signed_token_carries_kid() {
        let keypair = TestKeypair::new(1, "test-key").expect("keypair");
        let token = keypair
            .sign_token(&TestClaims::valid_for("someone"))
            .expect("sign");

        let header = jsonwebtoken::decode_header(&token).expect("header");
        assert_eq!(header.kid.as_deref(), Some("test-key"));
        assert_eq!(header.alg, Algorithm::EdDSA);
    }
}
