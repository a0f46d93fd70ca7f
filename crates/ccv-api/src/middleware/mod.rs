//! HTTP middleware.

pub mod metrics;
