//! Shared identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Characters a friendly id is built from.
pub const FRIENDLY_ID_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Number of dash-separated groups in a friendly id.
pub const FRIENDLY_ID_GROUPS: usize = 4;

/// Characters per group.
pub const FRIENDLY_ID_GROUP_LENGTH: usize = 3;

/// Characters in a friendly id, dashes excluded.
pub const FRIENDLY_ID_CHARS: usize = FRIENDLY_ID_GROUPS * FRIENDLY_ID_GROUP_LENGTH;

/// Random bytes drawn per attempt to build a friendly id.
///
/// Bytes that would bias the alphabet are skipped, so more than
/// [`FRIENDLY_ID_CHARS`] are drawn.
pub const FRIENDLY_ID_RANDOM_BYTES: usize = 32;

/// Bytes at or above this value are rejected when sampling characters.
const UNBIASED_BYTE_LIMIT: usize = 256 / FRIENDLY_ID_ALPHABET.len() * FRIENDLY_ID_ALPHABET.len();

/// Rejected friendly id input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid friendly id")]
pub struct InvalidFriendlyId;

/// Human-shareable room identifier, e.g. `abc-4de-f9h-ijk`.
///
/// Immutable once assigned. This is the only key rooms are looked up by
/// from outside the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FriendlyId(String);

impl FriendlyId {
    /// Build a friendly id from uniformly random bytes.
    ///
    /// Each accepted byte selects one character of [`FRIENDLY_ID_ALPHABET`].
    /// Bytes at or above the largest multiple of the alphabet size are
    /// skipped so every character is equally likely. Returns `None` if too
    /// few bytes were accepted.
    #[must_use]
    pub fn from_random_bytes(bytes: &[u8]) -> Option<Self> {
        let chars: Vec<char> = bytes
            .iter()
            .map(|b| usize::from(*b))
            .filter(|b| *b < UNBIASED_BYTE_LIMIT)
            .filter_map(|b| FRIENDLY_ID_ALPHABET.get(b % FRIENDLY_ID_ALPHABET.len()))
            .map(|ch| char::from(*ch))
            .take(FRIENDLY_ID_CHARS)
            .collect();

        if chars.len() < FRIENDLY_ID_CHARS {
            return None;
        }

        let groups: Vec<String> = chars
            .chunks(FRIENDLY_ID_GROUP_LENGTH)
            .map(|group| group.iter().collect())
            .collect();

        Some(Self(groups.join("-")))
    }

    /// Parse and validate a friendly id received from a client.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFriendlyId`] unless the input is exactly four
    /// dash-separated groups of three lowercase alphanumerics.
    pub fn parse(value: &str) -> Result<Self, InvalidFriendlyId> {
        let groups: Vec<&str> = value.split('-').collect();
        if groups.len() != FRIENDLY_ID_GROUPS {
            return Err(InvalidFriendlyId);
        }

        let well_formed = groups.iter().all(|group| {
            group.len() == FRIENDLY_ID_GROUP_LENGTH
                && group.bytes().all(|b| FRIENDLY_ID_ALPHABET.contains(&b))
        });

        if well_formed {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidFriendlyId)
        }
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FriendlyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
