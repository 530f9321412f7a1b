//! CSS projection of the visual configuration.
//!
//! # Responsibilities
//! - Map every config field to a named CSS custom property
//! - Hold the resulting style scope for the stylesheet endpoint
//! - Notify registered observers synchronously after each apply
//!
//! # Design Decisions
//! - Projection is a pure function of the config; applying twice is a no-op
//! - Observers are an explicit registry rather than a global event name
//! - Observers run outside the registry lock so they may (un)subscribe

pub mod css;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use arc_swap::ArcSwap;

use crate::visual::VisualConfig;

/// Receives every config applied to the projector.
pub trait ConfigObserver: Send + Sync {
    fn on_config_applied(&self, config: &VisualConfig);
}

impl<F> ConfigObserver for F
where
    F: Fn(&VisualConfig) + Send + Sync,
{
    fn on_config_applied(&self, config: &VisualConfig) {
        self(config)
    }
}

/// Handle returned by [`CssProjector::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Applies visual configs to a style scope.
pub struct CssProjector {
    scope: RwLock<BTreeMap<String, String>>,
    applied: ArcSwap<VisualConfig>,
    observers: RwLock<Vec<(ObserverId, Arc<dyn ConfigObserver>)>>,
    next_id: AtomicU64,
}

impl CssProjector {
    /// A projector whose scope already holds the default config.
    pub fn new() -> Self {
        let defaults = VisualConfig::default();
        Self {
            scope: RwLock::new(css::variables(&defaults)),
            applied: ArcSwap::from_pointee(defaults),
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Project `config` and notify observers.
    pub fn apply(&self, config: &VisualConfig) {
        let vars = css::variables(config);
        *self.scope.write().expect("style scope poisoned") = vars;
        self.applied.store(Arc::new(config.clone()));

        let observers: Vec<Arc<dyn ConfigObserver>> = self
            .observers
            .read()
            .expect("observer registry poisoned")
            .iter()
            .map(|(_, o)| o.clone())
            .collect();
        for observer in observers {
            observer.on_config_applied(config);
        }
        tracing::debug!(observers = self.observer_count(), "Visual config projected");
    }

    /// Config most recently applied (committed or preview).
    pub fn applied(&self) -> Arc<VisualConfig> {
        self.applied.load_full()
    }

    /// Current value of one variable, e.g. `--color-primary`.
    pub fn variable(&self, name: &str) -> Option<String> {
        self.scope
            .read()
            .expect("style scope poisoned")
            .get(name)
            .cloned()
    }

    /// Snapshot of the whole style scope.
    pub fn variables(&self) -> BTreeMap<String, String> {
        self.scope.read().expect("style scope poisoned").clone()
    }

    /// The style scope as a `:root { ... }` stylesheet.
    pub fn stylesheet(&self) -> String {
        css::render(&self.scope.read().expect("style scope poisoned"))
    }

    pub fn subscribe(&self, observer: Arc<dyn ConfigObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .expect("observer registry poisoned")
            .push((id, observer));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write().expect("observer registry poisoned");
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().expect("observer registry poisoned").len()
    }
}

impl Default for CssProjector {
    fn default() -> Self {
        Self::new()
    }
}
