//! Public content routes.
//!
//! Reads are served from the collections; visitor submissions (comments,
//! reactions, reviews) go through the same managers as the dashboard.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::content::{
    BlogComment, BlogCommentDraft, BlogPost, GalleryImage, Review, ReviewDraft, TouristAttraction,
};
use crate::content::reviews::{MAX_RATING, MIN_RATING};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::remote::ErrorKind;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/content/{section}", get(get_section))
        .route("/api/gallery", get(get_gallery))
        .route("/api/attractions", get(get_attractions))
        .route("/api/posts", get(get_posts))
        .route("/api/posts/{slug}", get(get_post))
        .route("/api/posts/{slug}/comments", get(get_comments).post(post_comment))
        .route("/api/posts/{slug}/reactions", post(post_reaction))
        .route("/api/reviews", get(get_reviews).post(post_review))
}

async fn get_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let content = &state.services.content;
    if content.section(&section).is_none() {
        content.sections().fetch().await;
    }
    content
        .section(&section)
        .map(|s| Json(s.content))
        .ok_or_else(|| ApiError::not_found(format!("No content section '{}'", section)))
}

async fn get_gallery(State(state): State<AppState>) -> Json<Vec<GalleryImage>> {
    Json(state.services.gallery.visible())
}

async fn get_attractions(State(state): State<AppState>) -> Json<Vec<TouristAttraction>> {
    Json(state.services.attractions.visible())
}

async fn get_posts(State(state): State<AppState>) -> Json<Vec<BlogPost>> {
    Json(state.services.blog.published().await)
}

async fn published_post(state: &AppState, slug: &str) -> Result<BlogPost, ApiError> {
    state
        .services
        .blog
        .post_by_slug(slug)
        .await
        .filter(|post| post.published)
        .ok_or_else(|| ApiError::not_found(format!("No post '{}'", slug)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    published_post(&state, &slug).await.map(Json)
}

async fn get_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<BlogComment>>, ApiError> {
    let post = published_post(&state, &slug).await?;
    Ok(Json(state.services.blog.comments_for(post.id).await))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub author_name: String,
    #[serde(default)]
    pub author_email: Option<String>,
    pub content: String,
}

async fn post_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<BlogComment>), ApiError> {
    let post = published_post(&state, &slug).await?;
    let draft = BlogCommentDraft {
        post_id: post.id,
        author_name: request.author_name,
        author_email: request.author_email,
        content: request.content,
        approved: false,
    };
    state
        .services
        .blog
        .add_comment(draft)
        .await
        .map(|comment| (StatusCode::CREATED, Json(comment)))
        .ok_or_else(|| ApiError::new(ErrorKind::Unknown, "Could not store comment"))
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub session_id: String,
    pub reaction_type: String,
}

#[derive(Debug, Serialize)]
pub struct ReactionState {
    pub present: bool,
    pub counts: BTreeMap<String, usize>,
}

async fn post_reaction(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<ReactionRequest>,
) -> Result<Json<ReactionState>, ApiError> {
    let post = published_post(&state, &slug).await?;
    let blog = &state.services.blog;
    let present = blog
        .toggle_reaction(post.id, &request.session_id, &request.reaction_type)
        .await
        .ok_or_else(|| ApiError::new(ErrorKind::Network, "Could not read existing reactions"))?;
    Ok(Json(ReactionState {
        present,
        counts: blog.reaction_counts(post.id).await,
    }))
}

#[derive(Debug, Serialize)]
pub struct ReviewSummary {
    pub average_rating: Option<f64>,
    pub reviews: Vec<Review>,
}

async fn get_reviews(State(state): State<AppState>) -> Json<ReviewSummary> {
    let reviews = &state.services.reviews;
    Json(ReviewSummary {
        average_rating: reviews.average_rating().await,
        reviews: reviews.approved().await,
    })
}

async fn post_review(
    State(state): State<AppState>,
    Json(draft): Json<ReviewDraft>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    if !(MIN_RATING..=MAX_RATING).contains(&draft.rating) {
        return Err(ApiError::new(
            ErrorKind::Validation,
            format!("Rating must be between {} and {}", MIN_RATING, MAX_RATING),
        ));
    }
    state
        .services
        .reviews
        .submit(draft)
        .await
        .map(|review| (StatusCode::CREATED, Json(review)))
        .ok_or_else(|| ApiError::new(ErrorKind::Unknown, "Could not store review"))
}
