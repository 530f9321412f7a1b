//! Remote load of the visual configuration.
//!
//! # Responsibilities
//! - Fetch active fragments and merge them onto defaults
//! - Fall back to the local cache, then to defaults
//! - Hand the result to the context's guarded apply path
//!
//! # Design Decisions
//! - `load` never fails; every error is logged and absorbed
//! - Unknown `config_type` rows and non-object payloads are skipped
//! - Mistyped keys inside a fragment are skipped one by one

use std::sync::Arc;

use serde_json::Value;

use crate::observability::metrics;
use crate::remote::{tables, Filter};
use crate::sync::context::{BusyFlag, VisualConfigContext};
use crate::visual::fragment::{self, FragmentKind, OverlayMode};
use crate::visual::VisualConfig;

/// Where a loaded config came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Cache,
    Defaults,
}

impl LoadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadSource::Remote => "remote",
            LoadSource::Cache => "cache",
            LoadSource::Defaults => "defaults",
        }
    }
}

/// Merge `visual_config` rows onto the default config.
pub fn merge_rows(rows: &[Value]) -> VisualConfig {
    let mut config = VisualConfig::default();
    for row in rows {
        let Some(config_type) = row.get("config_type").and_then(Value::as_str) else {
            tracing::warn!("Skipping visual_config row without config_type");
            continue;
        };
        let Some(kind) = FragmentKind::from_config_type(config_type) else {
            tracing::debug!(config_type, "Skipping unknown visual_config fragment");
            continue;
        };
        match row.get("config_data") {
            Some(Value::Object(blob)) => {
                // Lenient overlay never fails.
                let _ = fragment::overlay(&mut config, kind, blob, OverlayMode::Lenient);
            }
            _ => tracing::warn!(fragment = %kind, "Skipping visual_config row with non-object config_data"),
        }
    }
    config
}

impl VisualConfigContext {
    /// Fetch, merge, cache and project the remote config.
    ///
    /// Returns the config that is committed once the load has been applied,
    /// which may differ from what was fetched if a newer load or a local
    /// edit got there first.
    pub async fn load(&self) -> Arc<VisualConfig> {
        let _in_flight = BusyFlag::raise(&self.loads_in_flight);
        let ticket = self.guard.begin();

        let filter = Filter::new().eq("is_active", true);
        let (config, source) = match self.store.select(tables::VISUAL_CONFIG, &filter).await {
            Ok(rows) if !rows.is_empty() => {
                tracing::debug!(rows = rows.len(), "Fetched visual config fragments");
                (merge_rows(&rows), LoadSource::Remote)
            }
            Ok(_) => {
                tracing::info!("No active visual config rows, falling back");
                self.fallback()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch visual config, falling back");
                self.fallback()
            }
        };

        metrics::record_config_load(source.as_str());
        tracing::info!(source = source.as_str(), ticket = ticket.id, "Visual config loaded");
        self.commit_loaded(ticket, config)
    }

    fn fallback(&self) -> (VisualConfig, LoadSource) {
        match self.read_cache() {
            Some(cached) => (cached, LoadSource::Cache),
            None => (VisualConfig::default(), LoadSource::Defaults),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{LocalCache, MemoryCache, VISUAL_CONFIG_KEY};
    use crate::notify::NotificationLog;
    use crate::projector::CssProjector;
    use crate::remote::{MemoryStore, Op, StoreError};
    use crate::visual::NavbarPosition;
    use serde_json::json;

    fn context(store: Arc<MemoryStore>, cache: Arc<MemoryCache>) -> VisualConfigContext {
        VisualConfigContext::new(
            store,
            cache,
            Arc::new(CssProjector::new()),
            Arc::new(NotificationLog::new()),
        )
    }

    #[test]
    fn test_merge_rows_skips_unknown_and_malformed() {
        let rows = vec![
            json!({"config_type": "hero_banner", "config_data": {"primary": "#000"}}),
            json!({"config_type": "typography", "config_data": "Roboto"}),
            json!({"config_data": {}}),
            json!({"config_type": "navbar_settings", "config_data": {"position": "static", "extra": true}}),
        ];
        let config = merge_rows(&rows);
        assert_eq!(config.navbar_settings.position, NavbarPosition::Static);
        assert_eq!(config.typography, VisualConfig::default().typography);
        assert_eq!(config.color_palette, VisualConfig::default().color_palette);
    }

    #[tokio::test]
    async fn test_load_writes_cache_and_projects() {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            tables::VISUAL_CONFIG,
            vec![json!({"config_type": "color_palette", "config_data": {"primary": "#111"}, "is_active": true})],
        );
        let cache = Arc::new(MemoryCache::new());
        let ctx = context(store, cache.clone());

        let loaded = ctx.load().await;
        assert_eq!(loaded.color_palette.primary, "#111");
        assert_eq!(ctx.projector().variable("--color-primary").as_deref(), Some("#111"));

        let cached: Value = serde_json::from_str(&cache.get(VISUAL_CONFIG_KEY).unwrap()).unwrap();
        assert_eq!(cached["colorPalette"]["primary"], "#111");
        assert!(!ctx.is_loading());
    }

    #[tokio::test]
    async fn test_inactive_rows_ignored() {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            tables::VISUAL_CONFIG,
            vec![json!({"config_type": "color_palette", "config_data": {"primary": "#222"}, "is_active": false})],
        );
        let ctx = context(store, Arc::new(MemoryCache::new()));
        assert_eq!(*ctx.load().await, VisualConfig::default());
    }

    #[tokio::test]
    async fn test_malformed_cache_falls_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next(Op::Select, tables::VISUAL_CONFIG, StoreError::Network("down".into()));
        let cache = Arc::new(MemoryCache::new());
        cache.set(VISUAL_CONFIG_KEY, "{\"typography\":").unwrap();

        let ctx = context(store, cache.clone());
        assert_eq!(*ctx.load().await, VisualConfig::default());
        // The defaults replace the garbage entry.
        let cached: Value = serde_json::from_str(&cache.get(VISUAL_CONFIG_KEY).unwrap()).unwrap();
        assert_eq!(cached["typography"]["fontFamily"], "Inter");
    }

    #[test]
    fn test_load_source_labels() {
        assert_eq!(LoadSource::Remote.as_str(), "remote");
        assert_eq!(LoadSource::Cache.as_str(), "cache");
        assert_eq!(LoadSource::Defaults.as_str(), "defaults");
    }
}
