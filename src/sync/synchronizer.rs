//! Live synchronization of the visual config.

use std::sync::Arc;

use crate::remote::{tables, StoreResult};
use crate::sync::context::VisualConfigContext;
use crate::sync::subscription::{spawn_reload_loop, SubscriptionGuard};

/// Keeps a context in step with remote changes.
pub struct ConfigSynchronizer;

impl ConfigSynchronizer {
    /// Subscribe to `visual_config`, load once, then reload on every change.
    ///
    /// The subscription is opened before the initial load so no change made
    /// in between is missed.
    pub async fn start(ctx: Arc<VisualConfigContext>) -> StoreResult<SyncHandle> {
        let feed = ctx.store().subscribe(tables::VISUAL_CONFIG).await?;
        ctx.load().await;

        let reload_ctx = ctx.clone();
        let guard = spawn_reload_loop(feed, move || {
            let ctx = reload_ctx.clone();
            async move {
                ctx.load().await;
            }
        });
        tracing::info!(table = tables::VISUAL_CONFIG, "Visual config sync started");
        Ok(SyncHandle { ctx, guard })
    }
}

/// Handle of a running synchronizer. Dropping it stops synchronization.
pub struct SyncHandle {
    ctx: Arc<VisualConfigContext>,
    guard: SubscriptionGuard,
}

impl SyncHandle {
    pub fn context(&self) -> &Arc<VisualConfigContext> {
        &self.ctx
    }

    pub fn is_active(&self) -> bool {
        self.guard.is_active()
    }

    /// Stop synchronizing and release the subscription.
    pub async fn stop(self) {
        self.guard.stop().await;
        tracing::info!(table = tables::VISUAL_CONFIG, "Visual config sync stopped");
    }
}
