//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters for loads, saves, realtime events, notifications)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted strings
//! - Metrics are cheap (atomic increments) and safe without an exporter

pub mod logging;
pub mod metrics;
