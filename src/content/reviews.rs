//! Visitor reviews and their moderation queue.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::content::collection::Collection;
use crate::content::entities::{Review, ReviewDraft};
use crate::notify::Notification;
use crate::remote::Filter;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

pub struct ReviewManager {
    reviews: Arc<Collection<Review>>,
}

impl ReviewManager {
    pub fn new(reviews: Arc<Collection<Review>>) -> Self {
        Self { reviews }
    }

    pub fn reviews(&self) -> &Arc<Collection<Review>> {
        &self.reviews
    }

    /// Submit a review for approval. Ratings outside 1..=5 never reach the
    /// backend.
    pub async fn submit(&self, mut draft: ReviewDraft) -> Option<Review> {
        if !(MIN_RATING..=MAX_RATING).contains(&draft.rating) {
            tracing::warn!(rating = draft.rating, "Rejected review with invalid rating");
            self.reviews.notifier().notify(Notification::error(
                "Invalid rating",
                format!("Rating must be between {} and {}", MIN_RATING, MAX_RATING),
            ));
            return None;
        }
        draft.approved = false;
        self.reviews.create(&draft).await
    }

    /// Reviews waiting for approval.
    pub async fn pending(&self) -> Vec<Review> {
        self.reviews.query(Filter::new().eq("approved", false)).await
    }

    /// Reviews shown on the site.
    pub async fn approved(&self) -> Vec<Review> {
        self.reviews.query(Filter::new().eq("approved", true)).await
    }

    pub async fn approve(&self, id: Uuid) -> bool {
        self.reviews.update(id, json!({ "approved": true })).await
    }

    /// Rejected reviews are deleted.
    pub async fn reject(&self, id: Uuid) -> bool {
        self.reviews.delete(id).await
    }

    /// Mean rating over approved reviews, `None` when there are none.
    pub async fn average_rating(&self) -> Option<f64> {
        let approved = self.approved().await;
        if approved.is_empty() {
            return None;
        }
        let total: u32 = approved.iter().map(|r| u32::from(r.rating)).sum();
        Some(f64::from(total) / approved.len() as f64)
    }
}
