//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers that flow through the vault.
//! A `MemberId` cannot be passed where a `CircleId` is expected, and an
//! idempotency key is never confused with either.
//!
//! Member identifiers come from an external wallet/identity provider, so
//! they are free-form strings validated at construction. Circle identifiers
//! are minted by the registry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum length of a member identifier, in bytes.
pub const MAX_MEMBER_ID_LEN: usize = 128;

/// Maximum length of an idempotency key, in bytes.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Unique identifier for a lending circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircleId(pub Uuid);

impl CircleId {
    /// Generate a new random circle identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CircleId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CircleId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CircleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "circle:{}", self.0)
    }
}

/// Identifier of a member as supplied by the wallet/identity provider
/// (typically a wallet address such as `0xA1b2...`).
///
/// Accepted characters are ASCII alphanumerics, `-`, `_` and `.`; the colon
/// is reserved as the separator in member bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberId(String);

impl MemberId {
    /// Validate and wrap a member identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let reject = |reason: &str| ValidationError::InvalidMemberId {
            value: value.clone(),
            reason: reason.to_string(),
        };
        if value.is_empty() {
            return Err(reject("must not be empty"));
        }
        if value.len() > MAX_MEMBER_ID_LEN {
            return Err(reject("exceeds 128 bytes"));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(reject("only ASCII alphanumerics, '-', '_' and '.' are allowed"));
        }
        Ok(Self(value))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MemberId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MemberId> for String {
    fn from(id: MemberId) -> Self {
        id.0
    }
}

impl std::str::FromStr for MemberId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-chosen key identifying one transaction intent.
///
/// Resubmitting an intent under the same key must never produce a second
/// ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validate and wrap an idempotency key: 1 to 128 visible ASCII
    /// characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(ValidationError::InvalidIdempotencyKey(format!(
                "length must be 1..={MAX_IDEMPOTENCY_KEY_LEN}, got {}",
                value.len()
            )));
        }
        if !value.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ValidationError::InvalidIdempotencyKey(
                "only visible ASCII characters are allowed".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_id_display_is_prefixed() {
        let id = CircleId::new();
        assert_eq!(id.to_string(), format!("circle:{}", id.as_uuid()));
    }

    #[test]
    fn circle_ids_are_unique() {
        assert_ne!(CircleId::new(), CircleId::new());
    }

    #[test]
    fn member_id_accepts_wallet_address() {
        let id = MemberId::new("0xA1b2C3d4E5f6").unwrap();
        assert_eq!(id.as_str(), "0xA1b2C3d4E5f6");
    }

    #[test]
    fn member_id_rejects_empty() {
        assert!(MemberId::new("").is_err());
    }

    #[test]
    fn member_id_rejects_colon() {
        let err = MemberId::new("alice:bob").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMemberId { .. }));
    }

    #[test]
    fn member_id_rejects_overlong() {
        assert!(MemberId::new("a".repeat(MAX_MEMBER_ID_LEN + 1)).is_err());
        assert!(MemberId::new("a".repeat(MAX_MEMBER_ID_LEN)).is_ok());
    }

    #[test]
    fn member_id_serde_validates() {
        let ok: MemberId = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(ok.as_str(), "alice");
        assert!(serde_json::from_str::<MemberId>("\"has space\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"alice\"");
    }

    #[test]
    fn idempotency_key_rejects_whitespace() {
        assert!(IdempotencyKey::new("abc def").is_err());
        assert!(IdempotencyKey::new("").is_err());
        assert!(IdempotencyKey::new("round-3:circle-9").is_ok());
    }
}
