//! # ccv-settlement: Circle Registry and Round Settlement
//!
//! The domain core of Circle Cipher Vault. A [`CircleRegistry`] owns every
//! circle and exposes the synchronous operations the API and CLI drive:
//!
//! - **Registry** (`registry.rs`): create, join, activate, cancel, exclude,
//!   snapshots, listings, and the member dashboard.
//! - **Membership ledger** (`ledger.rs`): contribution commitments per
//!   round, verified against the round's required amount with a range
//!   proof, plus the escrow tally of deposited openings.
//! - **Settlement engine** (`engine.rs`): round completion with
//!   round-robin recipient selection, round views, overdue detection, and
//!   the asynchronous ledger outcome of completed rounds.
//!
//! Every operation returns a value or a typed [`CircleError`] and leaves
//! the registry unchanged on error.
//!
//! ## Crate Policy
//!
//! - Amounts stay hidden: payments arrive as Pedersen commitments and only
//!   a round's pool total is ever revealed.
//! - Time comes from the injected [`Clock`].
//! - No global state; the registry is constructed once and passed around.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod registry;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, SettlementConfig};
pub use error::{CircleError, ErrorKind};
pub use policy::{RecipientPolicy, RoundRobin};
pub use registry::CircleRegistry;
pub use view::{
    CircleFilter, CircleSnapshot, CircleSummary, CreateCircleParams, DashboardEntry, JoinOutcome,
    MemberDashboard, MemberView, OverdueRound, PaymentReceipt, RoundPool, RoundSettlement,
    RoundView,
};
