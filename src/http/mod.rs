//! HTTP surface subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → public routes: /theme.css, /api/visual-config, content.rs
//!     → admin routes (bearer token) → visual config saves, moderation queue
//!     → response.rs (error bodies)
//! ```

pub mod content;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
