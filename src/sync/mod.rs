//! Visual config synchronization.
//!
//! # Data Flow
//! ```text
//! visual_config change feed ──→ synchronizer ──→ loader ──┐
//!                                                         ├─→ context (memory, cache, projector)
//! dashboard edit ──→ mutator ──→ remote upsert + history ─┘
//! ```
//!
//! # Design Decisions
//! - One context per site, shared by `Arc`
//! - Loads never fail and saves never error past their boundary; outcomes
//!   surface through notifications and the save report
//! - A load that finishes after a newer one, or that raced a local edit,
//!   does not overwrite the newer state

pub mod context;
pub mod loader;
pub mod mutator;
pub mod subscription;
pub mod synchronizer;

pub use context::VisualConfigContext;
pub use loader::{merge_rows, LoadSource};
pub use mutator::{FragmentOutcome, FragmentStatus, SaveReport};
pub use subscription::{spawn_reload_loop, SubscriptionGuard};
pub use synchronizer::{ConfigSynchronizer, SyncHandle};
