//! Coastline CMS library: live visual configuration and content hooks for
//! a coastal tourism site.

// Domain model
pub mod visual;
pub mod content;

// Sync and projection
pub mod sync;
pub mod projector;
pub mod notify;

// Infrastructure
pub mod remote;
pub mod cache;
pub mod config;
pub mod resilience;

// Surfaces and cross-cutting concerns
pub mod http;
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::SiteConfig;
pub use http::HttpServer;
pub use lifecycle::{Shutdown, SiteServices};
pub use sync::VisualConfigContext;
pub use visual::{VisualConfig, VisualConfigPatch};
