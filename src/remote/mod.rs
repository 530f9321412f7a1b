//! Backend service client subsystem.
//!
//! # Data Flow
//! ```text
//! sync / content layers
//!     → RemoteStore (select / insert / upsert / update / delete / invoke)
//!         → rest.rs     (PostgREST over reqwest)
//!         → memory.rs   (in-process tables, failure injection)
//!     → RemoteStore::subscribe
//!         → realtime.rs (Phoenix channel over websocket)
//!         → memory.rs   (broadcast per table)
//! ```
//!
//! # Design Decisions
//! - Rows are untyped JSON at this boundary; typing happens in the callers
//! - Change notifications carry no payload guarantee, callers re-fetch
//! - Every error is classified (network, permission, validation, ...)

pub mod memory;
pub mod realtime;
pub mod rest;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

pub use memory::{MemoryStore, Op};
pub use rest::RestStore;
pub use types::{
    ChangeEvent, ChangeFeed, ChangeKind, ChangeType, ErrorKind, Filter, HistoryEntry, Order,
    StoreError, StoreResult,
};

/// Table names used by this crate.
pub mod tables {
    pub const VISUAL_CONFIG: &str = "visual_config";
    pub const CONTENT_HISTORY: &str = "content_history";
    pub const SITE_CONTENT: &str = "site_content";
    pub const BLOG_POSTS: &str = "blog_posts";
    pub const BLOG_COMMENTS: &str = "blog_comments";
    pub const BLOG_REACTIONS: &str = "blog_reactions";
    pub const REVIEWS: &str = "reviews";
    pub const GALLERY_IMAGES: &str = "gallery_images";
    pub const TOURIST_ATTRACTIONS: &str = "tourist_attractions";
}

/// The hosted backend: tables, edge functions and change notifications.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Rows of `table` matching `filter`.
    async fn select(&self, table: &str, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Insert one row, returning the stored representation.
    async fn insert(&self, table: &str, row: Value) -> StoreResult<Value>;

    /// Insert or merge one row keyed on the `on_conflict` columns.
    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> StoreResult<Value>;

    /// Merge `patch` into every matching row, returning the updated rows.
    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> StoreResult<Vec<Value>>;

    /// Delete matching rows, returning how many were removed.
    async fn delete(&self, table: &str, filter: &Filter) -> StoreResult<usize>;

    /// Call an edge function.
    async fn invoke(&self, function: &str, body: Value) -> StoreResult<Value>;

    /// Subscribe to insert/update/delete notifications on `table`.
    async fn subscribe(&self, table: &str) -> StoreResult<ChangeFeed>;
}
