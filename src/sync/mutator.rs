//! Optimistic visual config edits.
//!
//! # Responsibilities
//! - Apply a patch locally first, then persist it fragment by fragment
//! - Append a history entry for every persisted fragment
//! - Revert the local state and notify once when persistence fails
//! - Preview a patch on the projector without committing it
//!
//! # Data Flow
//! ```text
//! save(patch)
//!     → merge onto committed config (strict)
//!     → commit locally (memory, cache, projection)
//!     → for each fragment: upsert visual_config, insert content_history
//!     → SaveReport
//! ```
//!
//! # Design Decisions
//! - Fragments are written sequentially in a fixed order and the saga stops
//!   at the first failure; fragments already written stay written
//! - Saves are serialized against each other
//! - Fragments being written are shielded from concurrent remote loads

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::notify::Notification;
use crate::observability::metrics;
use crate::remote::{tables, ChangeType, ErrorKind, HistoryEntry, StoreResult};
use crate::sync::context::{BusyFlag, VisualConfigContext};
use crate::visual::fragment::{self, FragmentError, FragmentKind};
use crate::visual::{VisualConfig, VisualConfigPatch};

/// Columns identifying the active row of a fragment.
pub const FRAGMENT_CONFLICT: [&str; 2] = ["config_type", "is_active"];

const SAVE_FAILED_TITLE: &str = "Save failed";
const SAVE_FAILED_DESCRIPTION: &str = "Could not save configuration";

/// What happened to one fragment during a save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FragmentStatus {
    Committed,
    Failed { kind: ErrorKind, message: String },
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentOutcome {
    pub fragment: FragmentKind,
    #[serde(flatten)]
    pub status: FragmentStatus,
}

/// Per-fragment result of a save.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveReport {
    pub outcomes: Vec<FragmentOutcome>,
}

impl SaveReport {
    fn rejected(kinds: &[FragmentKind], error: &FragmentError) -> Self {
        let outcomes = kinds
            .iter()
            .map(|&kind| FragmentOutcome {
                fragment: kind,
                status: if kind == error.kind {
                    FragmentStatus::Failed {
                        kind: ErrorKind::Validation,
                        message: error.to_string(),
                    }
                } else {
                    FragmentStatus::NotAttempted
                },
            })
            .collect();
        Self { outcomes }
    }

    /// Every fragment of the patch was persisted.
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == FragmentStatus::Committed)
    }

    /// Some fragments were persisted before a later one failed.
    pub fn is_partial(&self) -> bool {
        !self.committed().is_empty() && self.failure().is_some()
    }

    pub fn committed(&self) -> Vec<FragmentKind> {
        self.outcomes
            .iter()
            .filter(|o| o.status == FragmentStatus::Committed)
            .map(|o| o.fragment)
            .collect()
    }

    /// The fragment that stopped the save, if any.
    pub fn failure(&self) -> Option<&FragmentOutcome> {
        self.outcomes
            .iter()
            .find(|o| matches!(o.status, FragmentStatus::Failed { .. }))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.failure().map(|o| &o.status) {
            Some(FragmentStatus::Failed { kind, .. }) => Some(*kind),
            _ => None,
        }
    }
}

impl VisualConfigContext {
    /// Apply `patch` locally and persist it.
    pub async fn save(&self, patch: &VisualConfigPatch) -> SaveReport {
        let _serial = self.save_lock.lock().await;
        let _busy = BusyFlag::raise(&self.saving);

        let kinds = patch.kinds();
        if kinds.is_empty() {
            tracing::debug!("Ignoring empty visual config patch");
            return SaveReport::default();
        }

        let old = self.current();
        let updated = match patch.apply_to(&old) {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!(fragment = %e.kind, error = %e.source, "Rejected visual config patch");
                metrics::record_fragment_save(e.kind.config_type(), "rejected");
                self.notify(Notification::error(
                    SAVE_FAILED_TITLE,
                    format!("{} ({})", SAVE_FAILED_DESCRIPTION, ErrorKind::Validation.label()),
                ));
                return SaveReport::rejected(&kinds, &e);
            }
        };

        let _pending = self.guard.mark_pending(&kinds);
        self.commit(updated.clone(), &kinds);

        let mut outcomes = Vec::with_capacity(kinds.len());
        let mut failed: Option<ErrorKind> = None;
        for &kind in &kinds {
            if failed.is_some() {
                outcomes.push(FragmentOutcome {
                    fragment: kind,
                    status: FragmentStatus::NotAttempted,
                });
                continue;
            }

            let status = match self.persist_fragment(kind, &old, &updated).await {
                Ok(()) => {
                    metrics::record_fragment_save(kind.config_type(), "committed");
                    tracing::debug!(fragment = %kind, "Fragment persisted");
                    FragmentStatus::Committed
                }
                Err(e) => {
                    metrics::record_fragment_save(kind.config_type(), "failed");
                    tracing::error!(fragment = %kind, error = %e, "Failed to persist fragment");
                    failed = Some(e.kind());
                    FragmentStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };
            outcomes.push(FragmentOutcome { fragment: kind, status });
        }

        match failed {
            Some(kind) => {
                self.revert(&old, &kinds);
                self.notify(Notification::error(
                    SAVE_FAILED_TITLE,
                    format!("{} ({})", SAVE_FAILED_DESCRIPTION, kind.label()),
                ));
            }
            None => {
                tracing::info!(fragments = kinds.len(), "Visual config saved");
                self.notify(Notification::success(
                    "Configuration saved",
                    "Visual settings were updated",
                ));
            }
        }
        SaveReport { outcomes }
    }

    /// Persist every fragment's default value.
    pub async fn reset_to_defaults(&self) -> SaveReport {
        tracing::info!("Resetting visual config to defaults");
        self.save(&VisualConfigPatch::full(&VisualConfig::default()))
            .await
    }

    /// Project `patch` merged onto the committed config without committing.
    pub fn preview(&self, patch: &VisualConfigPatch) -> Result<VisualConfig, FragmentError> {
        let previewed = patch.apply_to(&self.current())?;
        self.projector.apply(&previewed);
        tracing::debug!(fragments = patch.kinds().len(), "Previewing visual config");
        Ok(previewed)
    }

    /// Project the committed config again, dropping any preview.
    pub fn reset_preview(&self) {
        self.projector.apply(&self.current());
        tracing::debug!("Preview reset");
    }

    async fn persist_fragment(
        &self,
        kind: FragmentKind,
        old: &VisualConfig,
        updated: &VisualConfig,
    ) -> StoreResult<()> {
        let new_content = fragment::slice(updated, kind);
        let row = json!({
            "config_type": kind.config_type(),
            "config_data": new_content,
            "is_active": true,
        });
        self.store
            .upsert(tables::VISUAL_CONFIG, row, &FRAGMENT_CONFLICT)
            .await?;

        let entry = HistoryEntry::new(
            kind.history_section(),
            fragment::slice(old, kind),
            new_content,
            ChangeType::Update,
            self.identity.clone(),
        );
        self.store
            .insert(tables::CONTENT_HISTORY, entry.to_row())
            .await?;
        Ok(())
    }

    // Only the patched fragments go back; others may have been reloaded since.
    fn revert(&self, old: &Arc<VisualConfig>, kinds: &[FragmentKind]) {
        let mut reverted = (*self.current()).clone();
        for &kind in kinds {
            fragment::copy_slice(old, &mut reverted, kind);
        }
        self.commit(reverted, kinds);
        tracing::warn!(fragments = kinds.len(), "Reverted visual config after failed save");
    }
}
