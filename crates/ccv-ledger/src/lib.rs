//! # ccv-ledger
//!
//! Client for the external ledger that records circle actions: circle
//! creation, joins, contributions, and round settlements.
//!
//! Each action becomes a [`TransactionIntent`], signed by the operator key
//! and submitted through a [`LedgerAdapter`]. The client retries transient
//! failures under the same idempotency key and polls for confirmation.
//!
//! Two adapters ship with the crate: [`MockLedgerAdapter`] for tests and
//! simulations, and [`AppendOnlyLogAdapter`], a durable JSON-lines log.

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod log;
pub mod mock;
mod retry;
pub mod types;

pub use adapter::LedgerAdapter;
pub use client::LedgerClient;
pub use config::{ConfigError, LedgerConfig};
pub use error::LedgerError;
pub use log::AppendOnlyLogAdapter;
pub use mock::MockLedgerAdapter;
pub use types::{
    LedgerAction, SignedIntent, Submission, TransactionHandle, TransactionIntent,
    TransactionStatus,
};
