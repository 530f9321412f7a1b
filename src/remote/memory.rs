//! In-process backend store.
//!
//! # Responsibilities
//! - Keep tables as JSON rows behind a DashMap
//! - Emulate PostgREST semantics (ids, timestamps, merge-duplicates upsert)
//! - Broadcast row changes to subscribers
//! - Inject failures and hold reads or writes for tests and offline demos

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, Semaphore};
use uuid::Uuid;

use crate::remote::types::{ChangeEvent, ChangeFeed, ChangeKind, Filter, StoreError, StoreResult};
use crate::remote::RemoteStore;

const FEED_CAPACITY: usize = 64;

/// Store operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Select,
    Insert,
    Upsert,
    Update,
    Delete,
    Invoke,
    Subscribe,
}

impl Op {
    fn is_write(self) -> bool {
        matches!(self, Op::Insert | Op::Upsert | Op::Update | Op::Delete)
    }
}

type EdgeFunction = Arc<dyn Fn(Value) -> StoreResult<Value> + Send + Sync>;

struct InjectedFailure {
    op: Op,
    target: String,
    error: StoreError,
    once: bool,
    skip: usize,
}

/// Backend store living entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: DashMap<String, Vec<Value>>,
    channels: DashMap<String, broadcast::Sender<ChangeEvent>>,
    functions: DashMap<String, EdgeFunction>,
    failures: Mutex<Vec<InjectedFailure>>,
    calls: DashMap<(Op, String), usize>,
    offline: AtomicBool,
    write_gate: Mutex<Option<Arc<Semaphore>>>,
    held_writes: AtomicUsize,
    // Armed gate taken by the next select; the release handle stays behind.
    read_gate: Mutex<Option<Arc<Semaphore>>>,
    read_release: Mutex<Option<Arc<Semaphore>>>,
    held_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of `table`.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables.insert(table.to_string(), rows);
    }

    /// Current rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .get(table)
            .map(|rows| rows.value().clone())
            .unwrap_or_default()
    }

    /// Register an edge function handler.
    pub fn register_function<F>(&self, name: &str, handler: F)
    where
        F: Fn(Value) -> StoreResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(handler));
    }

    /// Fail the next `op` on `target` (table or function name).
    pub fn fail_next(&self, op: Op, target: &str, error: StoreError) {
        self.push_failure(op, target, error, true);
    }

    /// Fail every `op` on `target` until cleared.
    pub fn fail_always(&self, op: Op, target: &str, error: StoreError) {
        self.push_failure(op, target, error, false);
    }

    /// Let `skip` calls of `op` on `target` succeed, then fail the next one.
    pub fn fail_after(&self, op: Op, target: &str, skip: usize, error: StoreError) {
        self.failures
            .lock()
            .expect("failure list poisoned")
            .push(InjectedFailure {
                op,
                target: target.to_string(),
                error,
                once: true,
                skip,
            });
    }

    pub fn clear_failures(&self) {
        self.failures.lock().expect("failure list poisoned").clear();
    }

    /// When offline every operation fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls made for `op` on `target`.
    pub fn call_count(&self, op: Op, target: &str) -> usize {
        self.calls
            .get(&(op, target.to_string()))
            .map(|c| *c.value())
            .unwrap_or(0)
    }

    /// Number of live listeners on `table`.
    pub fn listener_count(&self, table: &str) -> usize {
        self.channels
            .get(table)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Park every write until [`MemoryStore::release_writes`] is called.
    pub fn hold_writes(&self) {
        *self.write_gate.lock().expect("write gate poisoned") = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let parked writes through and stop holding new ones.
    pub fn release_writes(&self) {
        if let Some(gate) = self.write_gate.lock().expect("write gate poisoned").take() {
            gate.close();
        }
    }

    /// Writes currently parked by [`MemoryStore::hold_writes`].
    pub fn held_writes(&self) -> usize {
        self.held_writes.load(Ordering::SeqCst)
    }

    /// Park the next select after it has read its rows, until
    /// [`MemoryStore::release_reads`]. Later selects pass straight through.
    pub fn hold_next_read(&self) {
        let gate = Arc::new(Semaphore::new(0));
        *self.read_gate.lock().expect("read gate poisoned") = Some(gate.clone());
        *self.read_release.lock().expect("read gate poisoned") = Some(gate);
    }

    /// Let a parked select return its (by now possibly outdated) rows.
    pub fn release_reads(&self) {
        self.read_gate.lock().expect("read gate poisoned").take();
        if let Some(gate) = self.read_release.lock().expect("read gate poisoned").take() {
            gate.close();
        }
    }

    /// Selects currently parked by [`MemoryStore::hold_next_read`].
    pub fn held_reads(&self) -> usize {
        self.held_reads.load(Ordering::SeqCst)
    }

    /// Emit a change event as if another session had modified `table`.
    pub fn notify_change(&self, table: &str, kind: ChangeKind) {
        self.emit(table, kind, None);
    }

    fn push_failure(&self, op: Op, target: &str, error: StoreError, once: bool) {
        self.failures
            .lock()
            .expect("failure list poisoned")
            .push(InjectedFailure {
                op,
                target: target.to_string(),
                error,
                once,
                skip: 0,
            });
    }

    async fn enter(&self, op: Op, target: &str) -> StoreResult<()> {
        *self.calls.entry((op, target.to_string())).or_insert(0) += 1;

        if op.is_write() {
            let gate = self.write_gate.lock().expect("write gate poisoned").clone();
            if let Some(gate) = gate {
                self.held_writes.fetch_add(1, Ordering::SeqCst);
                // Closing the semaphore is the release signal.
                let _ = gate.acquire().await;
                self.held_writes.fetch_sub(1, Ordering::SeqCst);
            }
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("backend unreachable".to_string()));
        }

        let mut failures = self.failures.lock().expect("failure list poisoned");
        if let Some(pos) = failures.iter().position(|f| f.op == op && f.target == target) {
            if failures[pos].skip > 0 {
                failures[pos].skip -= 1;
                return Ok(());
            }
            let error = failures[pos].error.clone();
            if failures[pos].once {
                failures.remove(pos);
            }
            return Err(error);
        }
        Ok(())
    }

    fn emit(&self, table: &str, kind: ChangeKind, record: Option<Value>) {
        if let Some(tx) = self.channels.get(table) {
            let _ = tx.send(ChangeEvent {
                table: table.to_string(),
                kind,
                record,
            });
        }
    }
}

fn into_object(table: &str, row: Value) -> StoreResult<Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Validation(format!(
            "row for {} must be an object, got {}",
            table, other
        ))),
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

fn merge_into(target: &mut Value, patch: &Map<String, Value>) {
    if let Value::Object(existing) = target {
        for (key, value) in patch {
            existing.insert(key.clone(), value.clone());
        }
        existing.insert("updated_at".to_string(), now());
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn select(&self, table: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        self.enter(Op::Select, table).await?;
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect();
        filter.sort(&mut rows);

        let gate = self.read_gate.lock().expect("read gate poisoned").take();
        if let Some(gate) = gate {
            self.held_reads.fetch_add(1, Ordering::SeqCst);
            let _ = gate.acquire().await;
            self.held_reads.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> StoreResult<Value> {
        self.enter(Op::Insert, table).await?;
        let mut map = into_object(table, row)?;
        map.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        map.entry("created_at").or_insert_with(now);
        let stored = Value::Object(map);

        self.tables
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        self.emit(table, ChangeKind::Insert, Some(stored.clone()));
        Ok(stored)
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> StoreResult<Value> {
        self.enter(Op::Upsert, table).await?;
        let map = into_object(table, row)?;
        let key: HashMap<&str, Option<&Value>> =
            on_conflict.iter().map(|c| (*c, map.get(*c))).collect();

        let (stored, kind) = {
            let mut rows = self.tables.entry(table.to_string()).or_default();
            let existing = rows.iter_mut().find(|r| {
                key.iter().all(|(column, value)| r.get(*column) == *value)
            });
            match existing {
                Some(current) => {
                    merge_into(current, &map);
                    (current.clone(), ChangeKind::Update)
                }
                None => {
                    let mut fresh = map.clone();
                    fresh
                        .entry("id")
                        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                    fresh.entry("created_at").or_insert_with(now);
                    fresh.insert("updated_at".to_string(), now());
                    let fresh = Value::Object(fresh);
                    rows.push(fresh.clone());
                    (fresh, ChangeKind::Insert)
                }
            }
        };

        self.emit(table, kind, Some(stored.clone()));
        Ok(stored)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> StoreResult<Vec<Value>> {
        self.enter(Op::Update, table).await?;
        let patch = into_object(table, patch)?;

        let updated: Vec<Value> = {
            let mut rows = self.tables.entry(table.to_string()).or_default();
            rows.iter_mut()
                .filter(|r| filter.matches(r))
                .map(|r| {
                    merge_into(r, &patch);
                    r.clone()
                })
                .collect()
        };

        for row in &updated {
            self.emit(table, ChangeKind::Update, Some(row.clone()));
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> StoreResult<usize> {
        self.enter(Op::Delete, table).await?;

        let removed: Vec<Value> = {
            let mut rows = self.tables.entry(table.to_string()).or_default();
            let (gone, kept): (Vec<Value>, Vec<Value>) =
                rows.drain(..).partition(|r| filter.matches(r));
            *rows = kept;
            gone
        };

        for row in &removed {
            self.emit(table, ChangeKind::Delete, Some(row.clone()));
        }
        Ok(removed.len())
    }

    async fn invoke(&self, function: &str, body: Value) -> StoreResult<Value> {
        self.enter(Op::Invoke, function).await?;
        let handler = self
            .functions
            .get(function)
            .map(|f| f.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("function {}", function)))?;
        handler(body)
    }

    async fn subscribe(&self, table: &str) -> StoreResult<ChangeFeed> {
        self.enter(Op::Subscribe, table).await?;
        let rx = self
            .channels
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0)
            .subscribe();
        Ok(ChangeFeed::new(table, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamp() {
        let store = MemoryStore::new();
        let row = store.insert("reviews", json!({"rating": 5})).await.unwrap();
        assert!(row["id"].as_str().is_some());
        assert!(row["created_at"].as_str().is_some());
        assert_eq!(store.rows("reviews").len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_merges_on_conflict_key() {
        let store = MemoryStore::new();
        let key = ["config_type", "is_active"];
        store
            .upsert(
                "visual_config",
                json!({"config_type": "typography", "is_active": true, "config_data": {"fontFamily": "Inter"}}),
                &key,
            )
            .await
            .unwrap();
        store
            .upsert(
                "visual_config",
                json!({"config_type": "typography", "is_active": true, "config_data": {"fontFamily": "Lora"}}),
                &key,
            )
            .await
            .unwrap();
        store
            .upsert(
                "visual_config",
                json!({"config_type": "typography", "is_active": false, "config_data": {}}),
                &key,
            )
            .await
            .unwrap();

        let rows = store.rows("visual_config");
        assert_eq!(rows.len(), 2);
        let active: Vec<_> = rows.iter().filter(|r| r["is_active"] == true).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["config_data"]["fontFamily"], "Lora");
    }

    #[tokio::test]
    async fn test_update_and_delete_by_filter() {
        let store = MemoryStore::new();
        store.seed(
            "reviews",
            vec![
                json!({"id": "a", "approved": false}),
                json!({"id": "b", "approved": false}),
            ],
        );
        let updated = store
            .update("reviews", &Filter::by_id("a"), json!({"approved": true}))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["approved"], true);

        let removed = store.delete("reviews", &Filter::by_id("b")).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.rows("reviews").len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        store.fail_next(Op::Select, "reviews", StoreError::Network("timeout".into()));
        assert!(store.select("reviews", &Filter::new()).await.is_err());
        assert!(store.select("reviews", &Filter::new()).await.is_ok());

        store.set_offline(true);
        let err = store.insert("reviews", json!({})).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.call_count(Op::Select, "reviews"), 2);
    }

    #[tokio::test]
    async fn test_subscribe_receives_changes() {
        let store = MemoryStore::new();
        let mut feed = store.subscribe("gallery_images").await.unwrap();
        assert_eq!(store.listener_count("gallery_images"), 1);

        store.insert("gallery_images", json!({"title": "Pier"})).await.unwrap();
        let event = feed.next().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.table, "gallery_images");

        drop(feed);
        assert_eq!(store.listener_count("gallery_images"), 0);
    }

    #[tokio::test]
    async fn test_invoke_registered_function() {
        let store = MemoryStore::new();
        store.register_function("echo", Ok);
        let out = store.invoke("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(out["x"], 1);
        assert!(matches!(
            store.invoke("missing", json!({})).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
