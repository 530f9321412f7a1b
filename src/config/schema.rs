//! Service configuration schema definitions.
//!
//! This module defines the settings of the site service itself (backend
//! connection, realtime, caching, HTTP surface, observability). All types
//! derive Serde traits for deserialization from TOML files, and every section
//! has defaults so a minimal or missing file still yields a runnable service.

use serde::{Deserialize, Serialize};

/// Root configuration for the site service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Hosted backend (tables, auth, edge functions).
    pub backend: BackendConfig,

    /// Realtime change notifications.
    pub realtime: RealtimeConfig,

    /// Local cache for the merged visual config.
    pub cache: CacheConfig,

    /// HTTP surface.
    pub server: ServerConfig,

    /// Content moderation.
    pub moderation: ModerationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL (e.g., "https://xyz.supabase.co"). When unset the service
    /// runs against an in-process store.
    pub url: Option<String>,

    /// Public API key sent as `apikey`.
    pub anon_key: String,

    /// Session token for the dashboard user; falls back to the anon key.
    pub access_token: Option<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Retries for reads that fail with a network error.
    pub read_retries: u32,

    /// Initial delay between read retries in milliseconds.
    pub retry_base_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: String::new(),
            access_token: None,
            timeout_secs: 10,
            read_retries: 2,
            retry_base_ms: 200,
        }
    }
}

/// Realtime socket settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Subscribe to change notifications.
    pub enabled: bool,

    /// Heartbeat interval in seconds.
    pub heartbeat_secs: u64,

    /// Base reconnect delay in milliseconds.
    pub reconnect_base_ms: u64,

    /// Maximum reconnect delay in milliseconds.
    pub reconnect_max_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            heartbeat_secs: 25,
            reconnect_base_ms: 500,
            reconnect_max_ms: 30_000,
        }
    }
}

/// Local cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// JSON file backing the cache. `None` keeps the cache in memory only.
    pub path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: Some("coastline-cache.json".to_string()),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Bearer token required by dashboard routes.
    pub admin_api_key: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Identity recorded as `changed_by` in history entries.
    pub editor_id: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            admin_api_key: "change-me".to_string(),
            request_timeout_secs: 30,
            editor_id: None,
        }
    }
}

/// Moderation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Run free text through moderation before persisting.
    pub enabled: bool,

    /// Edge function performing moderation.
    pub function: String,

    /// Words masked locally when no backend is configured.
    pub blocked_words: Vec<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            function: "moderate-content".to_string(),
            blocked_words: Vec::new(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SiteConfig::default();
        assert!(config.backend.url.is_none());
        assert_eq!(config.backend.timeout_secs, 10);
        assert!(config.realtime.enabled);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.moderation.function, "moderate-content");
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_minimal_toml() {
        let config: SiteConfig = toml::from_str(
            r#"
            [backend]
            url = "https://demo.supabase.co"
            anon_key = "anon"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.url.as_deref(), Some("https://demo.supabase.co"));
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.cache.path.as_deref(), Some("coastline-cache.json"));
    }
}
