//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     SiteConfig → store + cache + projector → visual context
//!         → warm start from cache → sync (subscribe, load) → content watches
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain requests → drop sync handles
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//!     SIGHUP → reload visual config
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core services, then listeners
//! - A backend that cannot stream changes degrades to a single load

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_cache, build_moderator, build_store, SiteServices, StartupError};
