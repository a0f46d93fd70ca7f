//! Transaction intents and their ledger-side lifecycle.

use ccv_core::{sha256_hex, CanonicalBytes, IdempotencyKey, Timestamp};
use ccv_crypto::{ed25519, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// What a transaction intent asks the ledger to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerAction {
    CreateCircle,
    JoinCircle,
    RecordContribution,
    CompleteRound,
}

impl LedgerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateCircle => "CREATE_CIRCLE",
            Self::JoinCircle => "JOIN_CIRCLE",
            Self::RecordContribution => "RECORD_CONTRIBUTION",
            Self::CompleteRound => "COMPLETE_ROUND",
        }
    }
}

impl std::fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to record one action on the ledger.
///
/// The idempotency key defaults to the SHA-256 of the canonical
/// `(action, params)` pair, so resubmitting the same action with the same
/// parameters can never create a second entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionIntent {
    pub action: LedgerAction,
    pub params: serde_json::Value,
    pub idempotency_key: IdempotencyKey,
    pub created_at: Timestamp,
}

impl TransactionIntent {
    pub fn new(
        action: LedgerAction,
        params: serde_json::Value,
        created_at: Timestamp,
    ) -> Result<Self, LedgerError> {
        let canonical = CanonicalBytes::new(&serde_json::json!({
            "action": action,
            "params": &params,
        }))?;
        let idempotency_key = IdempotencyKey::new(sha256_hex(&canonical)).map_err(|e| {
            LedgerError::Rejected {
                adapter: "client".to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            action,
            params,
            idempotency_key,
            created_at,
        })
    }

    /// Replace the derived key with a caller-chosen one.
    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = key;
        self
    }

    /// The bytes a signature covers.
    pub fn signing_bytes(&self) -> Result<CanonicalBytes, LedgerError> {
        Ok(CanonicalBytes::new(self)?)
    }

    pub fn sign(self, key: &Ed25519KeyPair) -> Result<SignedIntent, LedgerError> {
        let signature = key.sign(&self.signing_bytes()?);
        Ok(SignedIntent {
            intent: self,
            signer: key.public_key(),
            signature,
        })
    }
}

/// An intent with the operator's signature over its canonical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedIntent {
    pub intent: TransactionIntent,
    pub signer: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

impl SignedIntent {
    /// Check the signature against the embedded signer.
    pub fn verify(&self) -> Result<(), LedgerError> {
        ed25519::verify(&self.intent.signing_bytes()?, &self.signature, &self.signer)
            .map_err(|e| LedgerError::InvalidSignature(e.to_string()))
    }

    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.intent.idempotency_key
    }
}

/// Opaque ledger reference for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHandle(String);

impl TransactionHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger-side status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed { reason: String },
}

impl TransactionStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub handle: TransactionHandle,
    pub idempotency_key: IdempotencyKey,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}
