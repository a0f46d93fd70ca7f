//! Async ledger client: sign, submit with retry, poll for confirmation.

use std::sync::Arc;

use ccv_core::{IdempotencyKey, Timestamp};
use ccv_crypto::{Ed25519KeyPair, Ed25519PublicKey};
use tokio::time::Instant;

use crate::adapter::LedgerAdapter;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::retry::retry_transient;
use crate::types::{
    LedgerAction, Submission, TransactionHandle, TransactionIntent,
    TransactionStatus,
};

/// Client for the external ledger.
///
/// Every submission is signed with the operator key and retried under the
/// same idempotency key, so a retry after a lost response cannot create a
/// duplicate entry. Adapter calls run on the blocking pool.
#[derive(Clone)]
pub struct LedgerClient {
    adapter: Arc<dyn LedgerAdapter>,
    signer: Arc<Ed25519KeyPair>,
    config: LedgerConfig,
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("adapter", &self.adapter.adapter_name())
            .field("signer", &"[REDACTED]")
            .field("config", &self.config)
            .finish()
    }
}

impl LedgerClient {
    pub fn new(
        adapter: Arc<dyn LedgerAdapter>,
        signer: Arc<Ed25519KeyPair>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            adapter,
            signer,
            config,
        }
    }

    pub fn adapter_name(&self) -> &str {
        self.adapter.adapter_name()
    }

    pub fn operator_key(&self) -> Ed25519PublicKey {
        self.signer.public_key()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Submit `action` with `params`, keyed by the canonical digest of both.
    pub async fn submit(
        &self,
        action: LedgerAction,
        params: serde_json::Value,
    ) -> Result<Submission, LedgerError> {
        let intent = TransactionIntent::new(action, params, Timestamp::now())?;
        self.submit_intent(intent).await
    }

    /// Submit `action` under a caller-chosen idempotency key.
    pub async fn submit_with_key(
        &self,
        action: LedgerAction,
        params: serde_json::Value,
        key: IdempotencyKey,
    ) -> Result<Submission, LedgerError> {
        let intent =
            TransactionIntent::new(action, params, Timestamp::now())?.with_idempotency_key(key);
        self.submit_intent(intent).await
    }

    /// Sign and submit a prepared intent.
    ///
    /// Transient failures are retried with backoff. When every attempt fails
    /// the result is `SubmissionFailed`; a permanent failure is returned
    /// as-is after one attempt.
    pub async fn submit_intent(&self, intent: TransactionIntent) -> Result<Submission, LedgerError> {
        let signed = Arc::new(intent.sign(&self.signer)?);
        let key = signed.idempotency_key().clone();
        let action = signed.intent.action;

        let (result, attempts) = retry_transient(&self.config, "submission", || {
            let adapter = Arc::clone(&self.adapter);
            let signed = Arc::clone(&signed);
            async move { blocking(move || adapter.submit_transaction(&signed)).await }
        })
        .await;

        match result {
            Ok(handle) => {
                tracing::info!(
                    %action,
                    idempotency_key = %key,
                    %handle,
                    attempts,
                    adapter = self.adapter.adapter_name(),
                    "ledger transaction submitted"
                );
                Ok(Submission {
                    handle,
                    idempotency_key: key,
                    attempts,
                })
            }
            Err(e) if e.is_transient() => {
                tracing::error!(%action, idempotency_key = %key, attempts, "ledger submission failed: {e}");
                Err(LedgerError::SubmissionFailed {
                    idempotency_key: key,
                    attempts,
                    last_error: e.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(%action, idempotency_key = %key, "ledger rejected submission: {e}");
                Err(e)
            }
        }
    }

    /// Current status of a submitted transaction.
    pub async fn status(&self, handle: &TransactionHandle) -> Result<TransactionStatus, LedgerError> {
        let (result, _) = retry_transient(&self.config, "status query", || {
            let adapter = Arc::clone(&self.adapter);
            let handle = handle.clone();
            async move { blocking(move || adapter.get_transaction_status(&handle)).await }
        })
        .await;
        result
    }

    /// Poll until the transaction is confirmed or failed.
    ///
    /// Gives up with `ConfirmationTimeout` once the configured timeout
    /// elapses with the transaction still pending.
    pub async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<TransactionStatus, LedgerError> {
        let started = Instant::now();
        let timeout = self.config.confirmation_timeout();
        loop {
            let status = self.status(handle).await?;
            if status.is_final() {
                tracing::debug!(%handle, ?status, "ledger transaction final");
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                let waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(%handle, waited_ms, "ledger confirmation timed out");
                return Err(LedgerError::ConfirmationTimeout {
                    handle: handle.clone(),
                    waited_ms,
                });
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Submit, then wait for a final status.
    pub async fn submit_and_confirm(
        &self,
        action: LedgerAction,
        params: serde_json::Value,
    ) -> Result<(Submission, TransactionStatus), LedgerError> {
        let submission = self.submit(action, params).await?;
        let status = self.await_confirmation(&submission.handle).await?;
        Ok((submission, status))
    }
}

async fn blocking<T, F>(f: F) -> Result<T, LedgerError>
where
    F: FnOnce() -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LedgerError::Unavailable {
            reason: format!("adapter task failed: {e}"),
        })?
}

