//! JWT claims carried by bearer tokens.
//!
//! The `sub` field is redacted in Debug output.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix some identity providers put in front of the user id in `sub`.
const USER_SUBJECT_PREFIX: &str = "user:";

/// Claims of a validated bearer token.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the acting user's id, plain or as `user:{uuid}`.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .finish()
    }
}

impl Claims {
    /// The user id named by `sub`, if it is one.
    pub fn user_id(&self) -> Option<Uuid> {
        let raw = self
            .sub
            .strip_prefix(USER_SUBJECT_PREFIX)
            .unwrap_or(&self.sub);
        Uuid::parse_str(raw).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims_with_sub(sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            exp: 1234567890,
            iat: 1234567800,
        }
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let claims = claims_with_sub("secret-user-id");

        let debug_str = format!("{:?}", claims);

        assert!(!debug_str.contains("secret-user-id"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_user_id_plain_and_prefixed() {
        let id = Uuid::new_v4();

        assert_eq!(claims_with_sub(&id.to_string()).user_id(), Some(id));
        assert_eq!(claims_with_sub(&format!("user:{id}")).user_id(), Some(id));
    }

    #[test]
    fn test_user_id_rejects_other_subjects() {
        assert_eq!(claims_with_sub("service:rooms").user_id(), None);
        assert_eq!(claims_with_sub("").user_id(), None);
        assert_eq!(claims_with_sub("user:").user_id(), None);
    }

    #[test]
    fn test_claims_ignore_unknown_fields() {
        let claims: Claims = serde_json::from_str(
            r#"{"sub":"abc","exp":1234567890,"iat":1234567800,"scope":"rooms"}"#,
        )
        .unwrap();
        assert_eq!(claims.sub, "abc");
    }
}
