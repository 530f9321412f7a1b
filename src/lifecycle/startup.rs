//! Service assembly.
//!
//! # Responsibilities
//! - Build the backend client, cache, projector and notification log
//! - Wire every content collection to the shared store and notifier
//! - Start visual config sync and the content watches
//!
//! # Design Decisions
//! - No backend URL means an in-process store, so the site runs offline
//! - A cache file that cannot be opened degrades to an in-memory cache
//! - A local word list takes precedence over the moderation function

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{FileCache, LocalCache, MemoryCache};
use crate::config::{ModerationConfig, SiteConfig};
use crate::content::{
    Attractions, BlogManager, Collection, ContentManager, Entity, Gallery, Moderator, RemoteModerator,
    ReviewManager, WordFilter,
};
use crate::notify::{NotificationLog, Notifier};
use crate::projector::CssProjector;
use crate::remote::{MemoryStore, RemoteStore, RestStore, StoreError};
use crate::sync::{ConfigSynchronizer, SubscriptionGuard, SyncHandle, VisualConfigContext};

/// Failures that prevent the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Backend client error: {0}")]
    Backend(#[from] StoreError),
}

/// Everything the HTTP surface and background tasks share.
pub struct SiteServices {
    pub config: SiteConfig,
    pub store: Arc<dyn RemoteStore>,
    pub cache: Arc<dyn LocalCache>,
    pub projector: Arc<CssProjector>,
    pub notifications: Arc<NotificationLog>,
    pub visual: Arc<VisualConfigContext>,
    pub content: ContentManager,
    pub blog: BlogManager,
    pub reviews: ReviewManager,
    pub gallery: Arc<Gallery>,
    pub attractions: Arc<Attractions>,
}

impl SiteServices {
    /// Build services from configuration.
    pub fn build(config: SiteConfig) -> Result<Self, StartupError> {
        let store = build_store(&config)?;
        let cache = build_cache(&config);
        Ok(Self::with_store(config, store, cache))
    }

    /// Build services around an existing store and cache.
    pub fn with_store(
        config: SiteConfig,
        store: Arc<dyn RemoteStore>,
        cache: Arc<dyn LocalCache>,
    ) -> Self {
        let projector = Arc::new(CssProjector::new());
        let notifications = Arc::new(NotificationLog::new());
        let notifier: Arc<dyn Notifier> = notifications.clone();
        let moderator = build_moderator(&config.moderation, &store);

        let mut visual =
            VisualConfigContext::new(store.clone(), cache.clone(), projector.clone(), notifier.clone());
        let mut content =
            ContentManager::new(Arc::new(Collection::new(store.clone(), notifier.clone())));
        if let Some(editor) = &config.server.editor_id {
            visual = visual.with_identity(editor.clone());
            content = content.with_identity(editor.clone());
        }

        let blog = BlogManager::new(
            moderated(Collection::new(store.clone(), notifier.clone()), &moderator),
            moderated(Collection::new(store.clone(), notifier.clone()), &moderator),
            Arc::new(Collection::new(store.clone(), notifier.clone())),
        );
        let reviews = ReviewManager::new(moderated(
            Collection::new(store.clone(), notifier.clone()),
            &moderator,
        ));

        Self {
            gallery: Arc::new(Collection::new(store.clone(), notifier.clone())),
            attractions: Arc::new(Collection::new(store.clone(), notifier)),
            visual: Arc::new(visual),
            config,
            store,
            cache,
            projector,
            notifications,
            content,
            blog,
            reviews,
        }
    }

    /// Warm-start from cache, then keep the visual config synchronized.
    ///
    /// When the backend refuses the subscription the config is loaded once
    /// and `None` is returned; SIGHUP still forces reloads.
    pub async fn start_sync(&self) -> Option<SyncHandle> {
        self.visual.warm_start();
        if !self.config.realtime.enabled {
            tracing::info!("Realtime disabled, loading visual config once");
            self.visual.load().await;
            return None;
        }
        match ConfigSynchronizer::start(self.visual.clone()).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Visual config subscription failed, loading once");
                self.visual.load().await;
                None
            }
        }
    }

    /// Fetch page sections, the gallery and attractions, and refetch each of
    /// them on every remote change.
    pub async fn watch_content(&self) -> Vec<SubscriptionGuard> {
        self.content.sections().fetch().await;
        self.gallery.fetch().await;
        self.attractions.fetch().await;
        if !self.config.realtime.enabled {
            return Vec::new();
        }

        let mut guards = Vec::new();
        match self.content.sections().watch().await {
            Ok(guard) => guards.push(guard),
            Err(e) => tracing::warn!(error = %e, "Content section subscription failed"),
        }
        match self.gallery.watch().await {
            Ok(guard) => guards.push(guard),
            Err(e) => tracing::warn!(error = %e, "Gallery subscription failed"),
        }
        match self.attractions.watch().await {
            Ok(guard) => guards.push(guard),
            Err(e) => tracing::warn!(error = %e, "Attractions subscription failed"),
        }
        guards
    }
}

fn moderated<E: Entity>(
    collection: Collection<E>,
    moderator: &Option<Arc<dyn Moderator>>,
) -> Arc<Collection<E>> {
    match moderator {
        Some(moderator) => Arc::new(collection.with_moderator(moderator.clone())),
        None => Arc::new(collection),
    }
}

/// REST client when a backend URL is configured, in-process store otherwise.
pub fn build_store(config: &SiteConfig) -> Result<Arc<dyn RemoteStore>, StartupError> {
    match &config.backend.url {
        Some(url) => {
            tracing::info!(backend = %url, "Using hosted backend");
            Ok(Arc::new(RestStore::new(&config.backend, &config.realtime)?))
        }
        None => {
            tracing::warn!("No backend URL configured, using in-process store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// File cache at the configured path, memory cache otherwise.
pub fn build_cache(config: &SiteConfig) -> Arc<dyn LocalCache> {
    let Some(path) = &config.cache.path else {
        return Arc::new(MemoryCache::new());
    };
    match FileCache::open(path) {
        Ok(cache) => {
            tracing::info!(path = %path, "Using file cache");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Cache file unavailable, using memory cache");
            Arc::new(MemoryCache::new())
        }
    }
}

/// Moderator for free text, if moderation is enabled.
pub fn build_moderator(
    config: &ModerationConfig,
    store: &Arc<dyn RemoteStore>,
) -> Option<Arc<dyn Moderator>> {
    if !config.enabled {
        return None;
    }
    if !config.blocked_words.is_empty() {
        return Some(Arc::new(WordFilter::new(config.blocked_words.iter().cloned())));
    }
    Some(Arc::new(RemoteModerator::new(store.clone(), config.function.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::VISUAL_CONFIG_KEY;
    use crate::content::{ReviewDraft, Showcased};
    use crate::remote::tables;
    use serde_json::json;

    fn offline_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.cache.path = None;
        config.moderation.blocked_words = vec!["awful".to_string()];
        config.server.editor_id = Some("editor-1".to_string());
        config
    }

    #[test]
    fn test_build_without_backend_uses_memory_store() {
        let services = SiteServices::build(offline_config()).unwrap();
        assert_eq!(services.visual.identity(), Some("editor-1"));
        assert!(services.cache.get(VISUAL_CONFIG_KEY).is_none());
    }

    #[test]
    fn test_moderation_disabled() {
        let mut config = ModerationConfig::default();
        config.enabled = false;
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        assert!(build_moderator(&config, &store).is_none());
    }

    #[tokio::test]
    async fn test_reviews_use_word_filter() {
        let store = Arc::new(MemoryStore::new());
        let services =
            SiteServices::with_store(offline_config(), store.clone(), Arc::new(MemoryCache::new()));

        let review = services
            .reviews
            .submit(ReviewDraft {
                author_name: "Ana".into(),
                rating: 2,
                comment: "Awful parking".into(),
                approved: true,
            })
            .await
            .unwrap();
        assert_eq!(review.comment, "***** parking");
        assert_eq!(store.rows(tables::REVIEWS).len(), 1);
    }

    #[tokio::test]
    async fn test_start_sync_projects_remote_config() {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            tables::VISUAL_CONFIG,
            vec![json!({
                "config_type": "color_palette",
                "config_data": { "primary": "#112233" },
                "is_active": true,
            })],
        );
        let services =
            SiteServices::with_store(offline_config(), store.clone(), Arc::new(MemoryCache::new()));

        let handle = services.start_sync().await.unwrap();
        assert_eq!(services.visual.current().color_palette.primary, "#112233");
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_watch_content_fetches_every_live_table() {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            tables::GALLERY_IMAGES,
            vec![json!({
                "id": "7d3c1f0e-8f7a-4f43-9a55-2f1c6de0c010",
                "title": "Cliffs",
                "image_url": "https://cdn.example.com/cliffs.jpg",
            })],
        );
        store.seed(
            tables::SITE_CONTENT,
            vec![json!({
                "id": "0a6e2b51-3c1d-4e0f-8a77-5b2d9c4e1f20",
                "section_name": "hero",
                "content": { "title": "Old" },
            })],
        );
        let services =
            SiteServices::with_store(offline_config(), store.clone(), Arc::new(MemoryCache::new()));

        let guards = services.watch_content().await;
        assert_eq!(guards.len(), 3);
        assert_eq!(store.listener_count(tables::SITE_CONTENT), 1);
        assert_eq!(services.content.section("hero").unwrap().content["title"], "Old");
        assert!(services.gallery.visible()[0].is_active());
        assert!(services.attractions.items().is_empty());
    }

    #[tokio::test]
    async fn test_watch_content_skipped_without_realtime() {
        let mut config = offline_config();
        config.realtime.enabled = false;
        let store = Arc::new(MemoryStore::new());
        let services = SiteServices::with_store(config, store.clone(), Arc::new(MemoryCache::new()));

        assert!(services.watch_content().await.is_empty());
        assert_eq!(store.listener_count(tables::SITE_CONTENT), 0);
    }
}
