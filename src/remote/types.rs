//! Remote store types and error definitions.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Errors returned by the backend service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Connection failed, timed out, or the service answered 5xx.
    #[error("Network error: {0}")]
    Network(String),

    /// Row-level security or auth rejected the request.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The service rejected the payload.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Row, table or function does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Coarse classification shown to users.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Network(_) => ErrorKind::Network,
            StoreError::Permission(_) => ErrorKind::Permission,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Decode(_) => ErrorKind::Unknown,
        }
    }

    /// Check if this error is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Network(_))
    }
}

/// Result type for remote store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error classification surfaced in notifications and save reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Permission,
    Validation,
    NotFound,
    Unknown,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Permission => "permission",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not found",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Sort order for a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Equality filter plus optional ordering, the subset of PostgREST we use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub eq: Vec<(String, Value)>,
    pub order: Option<Order>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on `id = value`.
    pub fn by_id(id: impl ToString) -> Self {
        Self::new().eq("id", id.to_string())
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.eq.push((column.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    /// Check a row against the equality conditions.
    pub fn matches(&self, row: &Value) -> bool {
        self.eq
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }

    /// Sort rows in place according to the order clause, if any.
    pub fn sort(&self, rows: &mut [Value]) {
        if let Some(order) = &self.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
    }
}

// Nulls first, then bools, numbers, strings; anything else compares equal.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or(0.0)
            .total_cmp(&y.as_f64().unwrap_or(0.0)),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Kind of row change delivered by a change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Events were dropped; consumers must re-fetch.
    Resync,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
            ChangeKind::Resync => "resync",
        }
    }
}

/// A row change notification. The record is informational only; consumers
/// re-fetch rather than patch.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub record: Option<Value>,
}

/// A live subscription to one table.
///
/// Dropping the feed releases the listener (and stops the socket task for
/// remote feeds).
pub struct ChangeFeed {
    table: String,
    rx: broadcast::Receiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl ChangeFeed {
    pub fn new(table: &str, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            table: table.to_string(),
            rx,
            task: None,
        }
    }

    /// Feed backed by a task that must stop when the feed is dropped.
    pub fn with_task(table: &str, rx: broadcast::Receiver<ChangeEvent>, task: JoinHandle<()>) -> Self {
        Self {
            table: table.to_string(),
            rx,
            task: Some(task),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Wait for the next event. Returns `None` once the source is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(table = %self.table, skipped, "Change feed lagged, forcing resync");
                Some(self.resync_event())
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Discard events already queued; returns how many were dropped.
    pub fn drain_pending(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => drained += 1,
                Err(_) => break,
            }
        }
        drained
    }

    fn resync_event(&self) -> ChangeEvent {
        ChangeEvent {
            table: self.table.clone(),
            kind: ChangeKind::Resync,
            record: None,
        }
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Kind of change recorded in the history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

/// Append-only audit record of a before/after change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub section_name: String,
    pub old_content: Value,
    pub new_content: Value,
    pub change_type: ChangeType,
    pub changed_by: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        section_name: impl Into<String>,
        old_content: Value,
        new_content: Value,
        change_type: ChangeType,
        changed_by: Option<String>,
    ) -> Self {
        Self {
            section_name: section_name.into(),
            old_content,
            new_content,
            change_type,
            changed_by,
            changed_at: Utc::now(),
        }
    }

    /// Row payload for an insert.
    pub fn to_row(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_classification() {
        assert_eq!(StoreError::Network("reset".into()).kind(), ErrorKind::Network);
        assert_eq!(StoreError::Permission("rls".into()).kind(), ErrorKind::Permission);
        assert_eq!(StoreError::Decode("eof".into()).kind(), ErrorKind::Unknown);
        assert!(StoreError::Network("x".into()).is_transient());
        assert!(!StoreError::Validation("x".into()).is_transient());
        assert_eq!(ErrorKind::NotFound.label(), "not found");
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::Permission("new row violates row-level security policy".into());
        assert_eq!(
            err.to_string(),
            "Permission denied: new row violates row-level security policy"
        );
    }

    #[test]
    fn test_filter_matches_and_sorts() {
        let filter = Filter::new().eq("is_active", true).order_by("sort_order", false);
        let mut rows = vec![
            json!({"is_active": true, "sort_order": 1}),
            json!({"is_active": true, "sort_order": 3}),
            json!({"is_active": false, "sort_order": 2}),
        ];
        rows.retain(|r| filter.matches(r));
        filter.sort(&mut rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["sort_order"], 3);
    }

    #[test]
    fn test_history_entry_row() {
        let entry = HistoryEntry::new(
            "hero",
            json!({"title": "Old"}),
            json!({"title": "New"}),
            ChangeType::Update,
            Some("editor-1".into()),
        );
        let row = entry.to_row();
        assert_eq!(row["change_type"], "update");
        assert_eq!(row["new_content"]["title"], "New");
        let back: HistoryEntry = serde_json::from_value(row).unwrap();
        assert_eq!(back.section_name, "hero");
    }

    #[tokio::test]
    async fn test_feed_closes_with_sender() {
        let (tx, rx) = broadcast::channel(4);
        let mut feed = ChangeFeed::new("reviews", rx);
        tx.send(ChangeEvent {
            table: "reviews".into(),
            kind: ChangeKind::Insert,
            record: None,
        })
        .unwrap();
        assert_eq!(feed.next().await.map(|e| e.kind), Some(ChangeKind::Insert));
        drop(tx);
        assert!(feed.next().await.is_none());
    }
}
