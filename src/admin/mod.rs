//! Dashboard API.
//!
//! Every route requires `Authorization: Bearer <admin_api_key>`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/visual-config", put(save_visual_config))
        .route(
            "/admin/visual-config/preview",
            post(preview_visual_config).delete(reset_preview),
        )
        .route("/admin/visual-config/reset", post(reset_visual_config))
        .route("/admin/visual-config/reload", post(reload_visual_config))
        .route("/admin/notifications", get(get_notifications).delete(clear_notifications))
        .route("/admin/content/{section}", put(save_section))
        .route("/admin/content/{section}/history", get(get_section_history))
        .route("/admin/posts", get(get_all_posts).post(create_post))
        .route("/admin/posts/{id}/publish", post(publish_post))
        .route("/admin/comments/pending", get(get_pending_comments))
        .route("/admin/comments/{id}/approve", post(approve_comment))
        .route("/admin/reviews/pending", get(get_pending_reviews))
        .route("/admin/reviews/{id}/approve", post(approve_review))
        .route("/admin/reviews/{id}", axum::routing::delete(reject_review))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
