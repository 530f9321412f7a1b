//! The visual config context: owner of the in-memory config.
//!
//! # Responsibilities
//! - Hold the committed `VisualConfig` behind an atomic pointer
//! - Bundle the collaborators (store, cache, projector, notifier)
//! - Track load tickets and per-fragment write epochs for the stale guard
//! - Funnel every replacement of the config through one apply path
//!
//! # Design Decisions
//! - Injected explicitly; owned by the application root, never global
//! - Readers get `Arc` snapshots; replacement is whole-object
//! - The apply path holds a short lock so memory and cache always describe
//!   the same config
//! - Projection runs after the lock is released, so observers may call back
//!   into the context; the projector always ends on the committed config

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use serde_json::Value;

use crate::cache::{LocalCache, VISUAL_CONFIG_KEY};
use crate::notify::{Notification, Notifier};
use crate::projector::CssProjector;
use crate::remote::RemoteStore;
use crate::visual::fragment::{self, FragmentKind, OverlayMode};
use crate::visual::VisualConfig;

/// Snapshot taken when a load starts.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoadTicket {
    pub id: u64,
    pub epochs: [u64; 5],
}

/// Load ordering and per-fragment write tracking.
#[derive(Debug, Default)]
pub(crate) struct LoadGuard {
    next_ticket: AtomicU64,
    epochs: [AtomicU64; 5],
    pending: [AtomicUsize; 5],
}

impl LoadGuard {
    pub fn begin(&self) -> LoadTicket {
        LoadTicket {
            id: self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1,
            epochs: std::array::from_fn(|i| self.epochs[i].load(Ordering::SeqCst)),
        }
    }

    pub fn bump(&self, kinds: &[FragmentKind]) {
        for kind in kinds {
            self.epochs[kind.index()].fetch_add(1, Ordering::SeqCst);
        }
    }

    /// True if `kind` was written locally since `ticket`, or a write is in flight.
    pub fn is_dirty(&self, ticket: &LoadTicket, kind: FragmentKind) -> bool {
        let i = kind.index();
        self.epochs[i].load(Ordering::SeqCst) != ticket.epochs[i]
            || self.pending[i].load(Ordering::SeqCst) > 0
    }

    pub fn mark_pending(&self, kinds: &[FragmentKind]) -> PendingWrites<'_> {
        for kind in kinds {
            self.pending[kind.index()].fetch_add(1, Ordering::SeqCst);
        }
        PendingWrites {
            guard: self,
            kinds: kinds.to_vec(),
        }
    }
}

/// Marks fragments as having a remote write in flight until dropped.
pub(crate) struct PendingWrites<'a> {
    guard: &'a LoadGuard,
    kinds: Vec<FragmentKind>,
}

impl Drop for PendingWrites<'_> {
    fn drop(&mut self) {
        for kind in &self.kinds {
            self.guard.pending[kind.index()].fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Counts one in-flight operation for the lifetime of the guard. The
/// flag reads as busy while the count is non-zero.
pub(crate) struct BusyFlag<'a>(&'a AtomicUsize);

impl<'a> BusyFlag<'a> {
    pub fn raise(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owner of the site's visual configuration.
pub struct VisualConfigContext {
    pub(crate) store: Arc<dyn RemoteStore>,
    pub(crate) cache: Arc<dyn LocalCache>,
    pub(crate) projector: Arc<CssProjector>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) identity: Option<String>,
    pub(crate) guard: LoadGuard,
    pub(crate) loads_in_flight: AtomicUsize,
    pub(crate) saving: AtomicUsize,
    pub(crate) save_lock: tokio::sync::Mutex<()>,
    current: ArcSwap<VisualConfig>,
    // Last applied load ticket; also serializes the apply path.
    applied: Mutex<u64>,
    projecting: AtomicBool,
    reproject: AtomicBool,
}

impl VisualConfigContext {
    /// Create a context holding the default config.
    pub fn new(
        store: Arc<dyn RemoteStore>,
        cache: Arc<dyn LocalCache>,
        projector: Arc<CssProjector>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            cache,
            projector,
            notifier,
            identity: None,
            guard: LoadGuard::default(),
            loads_in_flight: AtomicUsize::new(0),
            saving: AtomicUsize::new(0),
            save_lock: tokio::sync::Mutex::new(()),
            current: ArcSwap::from_pointee(VisualConfig::default()),
            applied: Mutex::new(0),
            projecting: AtomicBool::new(false),
            reproject: AtomicBool::new(false),
        }
    }

    /// Identity recorded as `changed_by` in history entries.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Committed config snapshot.
    pub fn current(&self) -> Arc<VisualConfig> {
        self.current.load_full()
    }

    pub fn is_loading(&self) -> bool {
        self.loads_in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst) > 0
    }

    pub fn projector(&self) -> &Arc<CssProjector> {
        &self.projector
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Adopt the cached config, if any, before the first remote load.
    ///
    /// Returns true if a cached config was applied.
    pub fn warm_start(&self) -> bool {
        match self.read_cache() {
            Some(cached) => {
                self.commit(cached, &[]);
                tracing::info!("Visual config warm-started from local cache");
                true
            }
            None => false,
        }
    }

    /// Cached config overlaid on defaults. Malformed entries are a miss.
    pub(crate) fn read_cache(&self) -> Option<VisualConfig> {
        let raw = self.cache.get(VISUAL_CONFIG_KEY)?;
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed cached visual config");
                return None;
            }
        };
        let Value::Object(cached) = value else {
            tracing::warn!("Ignoring cached visual config that is not an object");
            return None;
        };

        let mut config = VisualConfig::default();
        for kind in FragmentKind::ALL {
            if let Some(Value::Object(blob)) = cached.get(kind.field_name()) {
                // Lenient overlay never fails.
                let _ = fragment::overlay(&mut config, kind, blob, OverlayMode::Lenient);
            }
        }
        Some(config)
    }

    /// Replace the committed config, bumping the epochs of `touched`.
    pub(crate) fn commit(&self, config: VisualConfig, touched: &[FragmentKind]) {
        {
            let _apply = self.applied.lock().expect("apply lock poisoned");
            self.guard.bump(touched);
            self.install(config);
        }
        self.project_committed();
    }

    /// Apply a finished load unless a newer load already landed. Fragments
    /// written locally while the load was in flight keep their local value.
    pub(crate) fn commit_loaded(&self, ticket: LoadTicket, mut loaded: VisualConfig) -> Arc<VisualConfig> {
        let installed = {
            let mut applied = self.applied.lock().expect("apply lock poisoned");
            if ticket.id < *applied {
                tracing::debug!(ticket = ticket.id, applied = *applied, "Discarding superseded config load");
                crate::observability::metrics::record_stale_load();
                return self.current();
            }
            *applied = ticket.id;

            let current = self.current();
            for kind in FragmentKind::ALL {
                if self.guard.is_dirty(&ticket, kind) {
                    tracing::debug!(fragment = %kind, "Keeping local fragment written during load");
                    fragment::copy_slice(&current, &mut loaded, kind);
                }
            }
            self.install(loaded)
        };
        self.project_committed();
        installed
    }

    // Callers hold the apply lock.
    fn install(&self, config: VisualConfig) -> Arc<VisualConfig> {
        let config = Arc::new(config);
        self.current.store(config.clone());
        self.write_cache(&config);
        config
    }

    /// Project the committed config. If a projection is already running
    /// (on another task, or further up this stack through an observer), it
    /// is asked to project again and this call returns immediately.
    fn project_committed(&self) {
        self.reproject.store(true, Ordering::SeqCst);
        while self.reproject.load(Ordering::SeqCst) {
            if self
                .projecting
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            while self.reproject.swap(false, Ordering::SeqCst) {
                self.projector.apply(&self.current());
            }
            self.projecting.store(false, Ordering::SeqCst);
        }
    }

    fn write_cache(&self, config: &VisualConfig) {
        let result = serde_json::to_string(config)
            .map_err(crate::cache::CacheError::from)
            .and_then(|raw| self.cache.set(VISUAL_CONFIG_KEY, &raw));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write visual config to local cache");
        }
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }
}
