//! Generic table-bound collection.
//!
//! # Responsibilities
//! - Wrap one remote call per operation on an entity table
//! - Cache the last fetched list for readers
//! - Expose `loading` / `saving` flags while calls are in flight
//! - Notify success or failure of every mutation
//!
//! # Design Decisions
//! - Operations never return errors; failures become notifications and
//!   `None` / `false` results
//! - Moderated columns are rewritten before the write leaves the process
//! - Live updates re-fetch the whole list rather than patching it

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use uuid::Uuid;

use crate::content::entities::Entity;
use crate::content::moderation::{moderate_fields, Moderator};
use crate::notify::{Notification, Notifier};
use crate::observability::metrics;
use crate::remote::{Filter, RemoteStore, StoreError, StoreResult};
use crate::sync::context::BusyFlag;
use crate::sync::subscription::{spawn_reload_loop, SubscriptionGuard};

/// Client-side view of one entity table.
pub struct Collection<E: Entity> {
    store: Arc<dyn RemoteStore>,
    notifier: Arc<dyn Notifier>,
    moderator: Option<Arc<dyn Moderator>>,
    items: ArcSwap<Vec<E>>,
    loading: AtomicUsize,
    saving: AtomicUsize,
}

impl<E: Entity> Collection<E> {
    pub fn new(store: Arc<dyn RemoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            moderator: None,
            items: ArcSwap::from_pointee(Vec::new()),
            loading: AtomicUsize::new(0),
            saving: AtomicUsize::new(0),
        }
    }

    /// Moderate `E::MODERATED` columns on create and update.
    pub fn with_moderator(mut self, moderator: Arc<dyn Moderator>) -> Self {
        self.moderator = Some(moderator);
        self
    }

    /// Last fetched list.
    pub fn items(&self) -> Arc<Vec<E>> {
        self.items.load_full()
    }

    pub fn get(&self, id: Uuid) -> Option<E> {
        self.items.load().iter().find(|e| e.id() == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst) > 0
    }

    fn default_filter() -> Filter {
        match E::ORDER {
            Some((column, ascending)) => Filter::new().order_by(column, ascending),
            None => Filter::new(),
        }
    }

    /// Re-fetch the whole table. On failure the previous list is kept.
    pub async fn fetch(&self) -> Vec<E> {
        let _busy = BusyFlag::raise(&self.loading);
        match self.select(&Self::default_filter()).await {
            Ok(items) => {
                metrics::record_content_op(E::TABLE, "fetch", "ok");
                tracing::debug!(table = E::TABLE, count = items.len(), "Fetched collection");
                self.items.store(Arc::new(items.clone()));
                items
            }
            Err(e) => {
                metrics::record_content_op(E::TABLE, "fetch", "error");
                tracing::warn!(table = E::TABLE, error = %e, "Failed to fetch collection");
                self.failed(format!("Could not load {}s", E::LABEL.to_lowercase()), &e);
                self.items.load().as_ref().clone()
            }
        }
    }

    /// Rows matching `filter`, without touching the cached list.
    pub async fn query(&self, filter: Filter) -> Vec<E> {
        let _busy = BusyFlag::raise(&self.loading);
        let filter = match (filter.order.is_none(), E::ORDER) {
            (true, Some((column, ascending))) => filter.order_by(column, ascending),
            _ => filter,
        };
        match self.select(&filter).await {
            Ok(items) => {
                metrics::record_content_op(E::TABLE, "query", "ok");
                items
            }
            Err(e) => {
                metrics::record_content_op(E::TABLE, "query", "error");
                tracing::warn!(table = E::TABLE, error = %e, "Failed to query collection");
                self.failed(format!("Could not load {}s", E::LABEL.to_lowercase()), &e);
                Vec::new()
            }
        }
    }

    /// Insert a new row.
    pub async fn create(&self, draft: &E::Draft) -> Option<E> {
        let _busy = BusyFlag::raise(&self.saving);
        let mut row = match serde_json::to_value(draft) {
            Ok(row) => row,
            Err(e) => {
                tracing::error!(table = E::TABLE, error = %e, "Failed to encode draft");
                self.failed(format!("Could not create {}", E::LABEL.to_lowercase()), &StoreError::Validation(e.to_string()));
                return None;
            }
        };
        self.moderate(&mut row).await;

        let result = self
            .store
            .insert(E::TABLE, row)
            .await
            .and_then(decode::<E>);
        match result {
            Ok(created) => {
                metrics::record_content_op(E::TABLE, "create", "ok");
                tracing::info!(table = E::TABLE, id = %created.id(), "Created row");
                self.upsert_local(created.clone());
                self.notifier.notify(Notification::success(
                    format!("{} created", E::LABEL),
                    "Your changes were saved",
                ));
                Some(created)
            }
            Err(e) => {
                metrics::record_content_op(E::TABLE, "create", "error");
                tracing::error!(table = E::TABLE, error = %e, "Failed to create row");
                self.failed(format!("Could not create {}", E::LABEL.to_lowercase()), &e);
                None
            }
        }
    }

    /// Merge `patch` into the row with `id`.
    pub async fn update(&self, id: Uuid, mut patch: Value) -> bool {
        let _busy = BusyFlag::raise(&self.saving);
        self.moderate(&mut patch).await;

        let result = self
            .store
            .update(E::TABLE, &Filter::by_id(id), patch)
            .await
            .and_then(|rows| match rows.into_iter().next() {
                Some(row) => decode::<E>(row),
                None => Err(StoreError::NotFound(format!("{} {}", E::TABLE, id))),
            });
        match result {
            Ok(updated) => {
                metrics::record_content_op(E::TABLE, "update", "ok");
                tracing::info!(table = E::TABLE, id = %id, "Updated row");
                self.upsert_local(updated);
                self.notifier.notify(Notification::success(
                    format!("{} updated", E::LABEL),
                    "Your changes were saved",
                ));
                true
            }
            Err(e) => {
                metrics::record_content_op(E::TABLE, "update", "error");
                tracing::error!(table = E::TABLE, id = %id, error = %e, "Failed to update row");
                self.failed(format!("Could not update {}", E::LABEL.to_lowercase()), &e);
                false
            }
        }
    }

    /// Delete the row with `id`.
    pub async fn delete(&self, id: Uuid) -> bool {
        let _busy = BusyFlag::raise(&self.saving);
        let result = match self.store.delete(E::TABLE, &Filter::by_id(id)).await {
            Ok(0) => Err(StoreError::NotFound(format!("{} {}", E::TABLE, id))),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                metrics::record_content_op(E::TABLE, "delete", "ok");
                tracing::info!(table = E::TABLE, id = %id, "Deleted row");
                self.items.rcu(|items| {
                    items
                        .iter()
                        .filter(|e| e.id() != id)
                        .cloned()
                        .collect::<Vec<E>>()
                });
                self.notifier.notify(Notification::success(
                    format!("{} deleted", E::LABEL),
                    "The item was removed",
                ));
                true
            }
            Err(e) => {
                metrics::record_content_op(E::TABLE, "delete", "error");
                tracing::error!(table = E::TABLE, id = %id, error = %e, "Failed to delete row");
                self.failed(format!("Could not delete {}", E::LABEL.to_lowercase()), &e);
                false
            }
        }
    }

    /// Re-fetch on every change to the table until the guard is dropped.
    pub async fn watch(self: &Arc<Self>) -> StoreResult<SubscriptionGuard> {
        let feed = self.store.subscribe(E::TABLE).await?;
        let collection = Arc::clone(self);
        let guard = spawn_reload_loop(feed, move || {
            let collection = collection.clone();
            async move {
                collection.fetch().await;
            }
        });
        tracing::info!(table = E::TABLE, "Watching collection");
        Ok(guard)
    }

    pub(crate) fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub(crate) fn begin_save(&self) -> BusyFlag<'_> {
        BusyFlag::raise(&self.saving)
    }

    /// Insert or replace one item in the cached list.
    pub(crate) fn upsert_local(&self, item: E) {
        let id = item.id();
        self.items.rcu(|items| {
            let mut next: Vec<E> = items.as_ref().clone();
            match next.iter_mut().find(|e| e.id() == id) {
                Some(existing) => *existing = item.clone(),
                None => next.push(item.clone()),
            }
            next
        });
    }

    pub(crate) fn failed(&self, title: String, error: &StoreError) {
        self.notifier.notify(Notification::error(
            title,
            format!("Please try again ({})", error.kind().label()),
        ));
    }

    /// Rows matching `filter`, with the read error left to the caller.
    pub(crate) async fn select(&self, filter: &Filter) -> StoreResult<Vec<E>> {
        let rows = self.store.select(E::TABLE, filter).await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            match decode::<E>(row) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(table = E::TABLE, error = %e, "Skipping undecodable row"),
            }
        }
        Ok(items)
    }

    async fn moderate(&self, row: &mut Value) {
        let Some(moderator) = &self.moderator else {
            return;
        };
        if E::MODERATED.is_empty() {
            return;
        }
        if moderate_fields(moderator.as_ref(), row, E::MODERATED).await {
            self.notifier.notify(Notification::info(
                "Content auto-moderated",
                "Some words were replaced before publishing",
            ));
        }
    }
}

pub(crate) fn decode<E: Entity>(row: Value) -> StoreResult<E> {
    serde_json::from_value(row).map_err(|e| StoreError::Decode(format!("{}: {}", E::TABLE, e)))
}
