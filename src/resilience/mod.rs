//! Resilience helpers for backend calls.
//!
//! # Data Flow
//! ```text
//! RestStore::select
//!     → retries.rs (retry network failures of idempotent reads)
//!         → backoff.rs (exponential delay with jitter)
//!
//! RealtimeClient reconnect loop
//!     → backoff.rs
//! ```
//!
//! # Design Decisions
//! - Every backend call has a deadline (client timeout)
//! - Writes are never retried automatically
//! - Jittered backoff prevents reconnect storms

pub mod backoff;
pub mod retries;

pub use backoff::{calculate_backoff, Backoff};
pub use retries::{retry_transient, RetryPolicy};
