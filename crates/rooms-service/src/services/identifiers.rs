//! Random identifiers for new rooms.
//!
//! All values come from `ring`'s system CSPRNG.

use crate::errors::RoomsError;
use common::types::{FriendlyId, FRIENDLY_ID_RANDOM_BYTES};
use ring::rand::{SecureRandom, SystemRandom};

/// Random bytes behind a meeting id (160 bits, 40 hex characters).
const MEETING_ID_RANDOM_BYTES: usize = 20;

/// Number of digits in a generated access code.
const ACCESS_CODE_DIGITS: u32 = 6;

fn fill_random(bytes: &mut [u8], what: &'static str) -> Result<(), RoomsError> {
    SystemRandom::new().fill(bytes).map_err(|e| {
        tracing::error!(target: "rooms.services.identifiers", error = %e, what, "Failed to generate random bytes");
        RoomsError::Internal
    })
}

/// Draws before giving up on a friendly id.
const FRIENDLY_ID_DRAWS: usize = 4;

pub fn generate_friendly_id() -> Result<FriendlyId, RoomsError> {
    for _ in 0..FRIENDLY_ID_DRAWS {
        let mut bytes = [0u8; FRIENDLY_ID_RANDOM_BYTES];
        fill_random(&mut bytes, "friendly_id")?;
        if let Some(id) = FriendlyId::from_random_bytes(&bytes) {
            return Ok(id);
        }
    }

    tracing::error!(target: "rooms.services.identifiers", "Random source kept producing rejected bytes");
    Err(RoomsError::Internal)
}

pub fn generate_meeting_id() -> Result<String, RoomsError> {
    let mut bytes = [0u8; MEETING_ID_RANDOM_BYTES];
    fill_random(&mut bytes, "meeting_id")?;
    Ok(hex::encode(bytes))
}

/// Six decimal digits, zero padded.
pub fn generate_access_code() -> Result<String, RoomsError> {
    let mut bytes = [0u8; 4];
    fill_random(&mut bytes, "access_code")?;
    let value = u32::from_be_bytes(bytes) % 10u32.pow(ACCESS_CODE_DIGITS);
    Ok(format!("{value:06}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_friendly_id_is_well_formed() {
        let id = generate_friendly_id().unwrap();
        assert!(FriendlyId::parse(id.as_str()).is_ok(), "{id}");
    }

    #[test]
    fn test_friendly_ids_are_distinct() {
        let ids: HashSet<String> = (0..100)
            .map(|_| generate_friendly_id().unwrap().to_string())
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_meeting_id_is_40_lowercase_hex() {
        let id = generate_meeting_id().unwrap();
        assert_eq!(id.len(), 40);
        assert!(id.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_access_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_access_code().unwrap();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
