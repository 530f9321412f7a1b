use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::content::{BlogComment, BlogPost, BlogPostDraft, Review};
use crate::http::response::{status_for, ApiError};
use crate::http::server::AppState;
use crate::notify::Notification;
use crate::remote::{ErrorKind, HistoryEntry};
use crate::sync::SaveReport;
use crate::visual::{VisualConfig, VisualConfigPatch};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub loading: bool,
    pub saving: bool,
    pub css_variables: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let services = &state.services;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        loading: services.visual.is_loading(),
        saving: services.visual.is_saving(),
        css_variables: services.projector.variables().len(),
    })
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub report: SaveReport,
    pub config: VisualConfig,
}

fn save_status(report: &SaveReport) -> StatusCode {
    if report.is_success() {
        StatusCode::OK
    } else if report.is_partial() {
        StatusCode::MULTI_STATUS
    } else {
        status_for(report.error_kind().unwrap_or(ErrorKind::Unknown))
    }
}

fn save_response(state: &AppState, report: SaveReport) -> (StatusCode, Json<SaveResponse>) {
    let status = save_status(&report);
    let config = state.services.visual.current().as_ref().clone();
    (status, Json(SaveResponse { report, config }))
}

pub async fn save_visual_config(
    State(state): State<AppState>,
    Json(patch): Json<VisualConfigPatch>,
) -> (StatusCode, Json<SaveResponse>) {
    let report = state.services.visual.save(&patch).await;
    save_response(&state, report)
}

pub async fn reset_visual_config(State(state): State<AppState>) -> (StatusCode, Json<SaveResponse>) {
    let report = state.services.visual.reset_to_defaults().await;
    save_response(&state, report)
}

pub async fn reload_visual_config(State(state): State<AppState>) -> Json<VisualConfig> {
    Json(state.services.visual.load().await.as_ref().clone())
}

/// Project `patch` over the committed config without saving it.
pub async fn preview_visual_config(
    State(state): State<AppState>,
    Json(patch): Json<VisualConfigPatch>,
) -> Result<Response, ApiError> {
    let visual = &state.services.visual;
    visual.preview(&patch)?;
    Ok((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        visual.projector().stylesheet(),
    )
        .into_response())
}

pub async fn reset_preview(State(state): State<AppState>) -> StatusCode {
    state.services.visual.reset_preview();
    StatusCode::NO_CONTENT
}

pub async fn get_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.services.notifications.recent())
}

pub async fn clear_notifications(State(state): State<AppState>) -> StatusCode {
    state.services.notifications.clear();
    StatusCode::NO_CONTENT
}

fn done(ok: bool, failure: &str) -> Result<StatusCode, ApiError> {
    if ok {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(ErrorKind::Unknown, failure))
    }
}

pub async fn save_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
    Json(content): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let saved = state.services.content.save_section(&section, content).await;
    done(saved, "Could not save content section")
}

pub async fn get_section_history(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Json<Vec<HistoryEntry>> {
    Json(state.services.content.history(&section).await)
}

pub async fn get_all_posts(State(state): State<AppState>) -> Json<Vec<BlogPost>> {
    Json(state.services.blog.posts().fetch().await)
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(draft): Json<BlogPostDraft>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    state
        .services
        .blog
        .create_post(draft)
        .await
        .map(|post| (StatusCode::CREATED, Json(post)))
        .ok_or_else(|| ApiError::new(ErrorKind::Unknown, "Could not create post"))
}

pub async fn publish_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    done(state.services.blog.publish(id).await, "Could not publish post")
}

pub async fn get_pending_comments(State(state): State<AppState>) -> Json<Vec<BlogComment>> {
    Json(state.services.blog.pending_comments().await)
}

pub async fn approve_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    done(state.services.blog.approve_comment(id).await, "Could not approve comment")
}

pub async fn get_pending_reviews(State(state): State<AppState>) -> Json<Vec<Review>> {
    Json(state.services.reviews.pending().await)
}

pub async fn approve_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    done(state.services.reviews.approve(id).await, "Could not approve review")
}

pub async fn reject_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    done(state.services.reviews.reject(id).await, "Could not reject review")
}
