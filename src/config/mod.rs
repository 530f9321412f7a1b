//! Service configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → SiteConfig (validated, immutable)
//!     → handed to startup, which builds the store, cache and server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - This is service configuration; the site's visual configuration lives in
//!   the backend and is handled by `sync`

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendConfig, CacheConfig, LogFormat, ModerationConfig, ObservabilityConfig, RealtimeConfig,
    ServerConfig, SiteConfig,
};
