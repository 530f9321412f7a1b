//! Editable page sections with history.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::content::collection::{decode, Collection};
use crate::content::entities::SiteContent;
use crate::notify::{Level, Notification};
use crate::observability::metrics;
use crate::remote::{tables, ChangeType, Filter, HistoryEntry, StoreResult};

/// Page sections (`hero`, `about`, `contact`, ...) stored as JSON blobs.
pub struct ContentManager {
    sections: Arc<Collection<SiteContent>>,
    identity: Option<String>,
}

impl ContentManager {
    pub fn new(sections: Arc<Collection<SiteContent>>) -> Self {
        Self {
            sections,
            identity: None,
        }
    }

    /// Identity recorded as `changed_by` in history entries.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn sections(&self) -> &Arc<Collection<SiteContent>> {
        &self.sections
    }

    /// A section from the last fetched list.
    pub fn section(&self, name: &str) -> Option<SiteContent> {
        self.sections
            .items()
            .iter()
            .find(|s| s.section_name == name)
            .cloned()
    }

    /// Write `content` to section `name` and record the change.
    ///
    /// Returns true once the section itself is saved. A history entry that
    /// cannot be recorded is reported separately and does not undo the save.
    pub async fn save_section(&self, name: &str, content: Value) -> bool {
        let _busy = self.sections.begin_save();
        let (saved, entry) = match self.write_section(name, content).await {
            Ok(written) => written,
            Err(e) => {
                metrics::record_content_op(tables::SITE_CONTENT, "save_section", "error");
                tracing::error!(section = name, error = %e, "Failed to save content section");
                self.sections
                    .failed("Could not save content".to_string(), &e);
                return false;
            }
        };
        metrics::record_content_op(tables::SITE_CONTENT, "save_section", "ok");
        self.sections.upsert_local(saved);

        let store = self.sections.store();
        match store.insert(tables::CONTENT_HISTORY, entry.to_row()).await {
            Ok(_) => {
                tracing::info!(section = name, "Saved content section");
                self.sections.notifier().notify(Notification::success(
                    "Content saved",
                    format!("Section \"{}\" was updated", name),
                ));
            }
            Err(e) => {
                tracing::error!(section = name, error = %e, "Saved content section without history entry");
                self.sections.notifier().notify(Notification::new(
                    Level::Warning,
                    "Content saved without history",
                    format!(
                        "Section \"{}\" was updated but the change was not recorded ({})",
                        name,
                        e.kind().label()
                    ),
                ));
            }
        }
        true
    }

    /// History of a section, newest first.
    pub async fn history(&self, name: &str) -> Vec<HistoryEntry> {
        let filter = Filter::new()
            .eq("section_name", name)
            .order_by("changed_at", false);
        match self
            .sections
            .store()
            .select(tables::CONTENT_HISTORY, &filter)
            .await
        {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|row| match serde_json::from_value(row) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!(section = name, error = %e, "Skipping undecodable history row");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                tracing::warn!(section = name, error = %e, "Failed to fetch content history");
                self.sections
                    .failed("Could not load history".to_string(), &e);
                Vec::new()
            }
        }
    }

    async fn write_section(
        &self,
        name: &str,
        content: Value,
    ) -> StoreResult<(SiteContent, HistoryEntry)> {
        let store = self.sections.store();
        let existing = store
            .select(tables::SITE_CONTENT, &Filter::new().eq("section_name", name))
            .await?
            .into_iter()
            .next();
        let (old_content, change_type) = match existing {
            Some(row) => (row.get("content").cloned().unwrap_or(Value::Null), ChangeType::Update),
            None => (Value::Null, ChangeType::Create),
        };

        let row = json!({ "section_name": name, "content": content.clone() });
        let saved = decode::<SiteContent>(
            store
                .upsert(tables::SITE_CONTENT, row, &["section_name"])
                .await?,
        )?;

        let entry = HistoryEntry::new(name, old_content, content, change_type, self.identity.clone());
        Ok((saved, entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationLog;
    use crate::remote::{MemoryStore, Op, StoreError};

    fn manager(store: Arc<MemoryStore>, log: Arc<NotificationLog>) -> ContentManager {
        ContentManager::new(Arc::new(Collection::new(store, log))).with_identity("admin")
    }

    #[tokio::test]
    async fn test_save_section_records_create_then_update() {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(NotificationLog::new());
        let content = manager(store.clone(), log.clone());

        assert!(content.save_section("hero", json!({"title": "Welcome"})).await);
        assert!(content.save_section("hero", json!({"title": "Bem-vindo"})).await);

        assert_eq!(store.rows(tables::SITE_CONTENT).len(), 1);
        assert_eq!(content.section("hero").unwrap().content["title"], "Bem-vindo");

        let history = store.rows(tables::CONTENT_HISTORY);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["change_type"], "create");
        assert_eq!(history[0]["old_content"], Value::Null);
        assert_eq!(history[1]["change_type"], "update");
        assert_eq!(history[1]["old_content"]["title"], "Welcome");
        assert_eq!(history[1]["changed_by"], "admin");
        assert_eq!(log.count(Level::Success), 2);
    }

    #[tokio::test]
    async fn test_history_failure_keeps_saved_section() {
        let store = Arc::new(MemoryStore::new());
        let log = Arc::new(NotificationLog::new());
        let content = manager(store.clone(), log.clone());
        store.fail_next(Op::Insert, tables::CONTENT_HISTORY, StoreError::Permission("rls".into()));

        assert!(content.save_section("about", json!({"body": "Family-run since 1982"})).await);
        assert_eq!(store.rows(tables::SITE_CONTENT).len(), 1);
        assert_eq!(
            content.section("about").unwrap().content["body"],
            "Family-run since 1982"
        );
        assert!(content.history("about").await.is_empty());

        assert_eq!(log.count(Level::Warning), 1);
        assert_eq!(log.count(Level::Success), 0);
        let last = log.recent().pop().unwrap();
        assert_eq!(last.title, "Content saved without history");
        assert!(last.description.contains("permission"));
        assert!(!content.sections().is_saving());
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let content = manager(store, Arc::new(NotificationLog::new()));
        content.save_section("contact", json!({"phone": "1"})).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        content.save_section("contact", json!({"phone": "2"})).await;

        let history = content.history("contact").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].new_content["phone"], "2");
        assert_eq!(history[0].change_type, ChangeType::Update);
    }
}
