//! Site content rows.
//!
//! Each entity maps one backend table. Drafts are the insert payloads;
//! server-generated columns (`id`, timestamps) only exist on the entity.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::remote::tables;

/// A row type bound to one table.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;
    /// Human name used in notifications.
    const LABEL: &'static str;
    /// Default ordering of fetches: column and ascending flag.
    const ORDER: Option<(&'static str, bool)> = None;
    /// Text columns passed through the moderator before writes.
    const MODERATED: &'static [&'static str] = &[];

    type Draft: Serialize + Send + Sync;

    fn id(&self) -> Uuid;
}

/// Entities that can be hidden and arranged on public pages.
pub trait Showcased {
    fn is_active(&self) -> bool;
    fn sort_order(&self) -> i32;
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteContent {
    pub id: Uuid,
    pub section_name: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteContentDraft {
    pub section_name: String,
    pub content: Value,
}

impl Entity for SiteContent {
    const TABLE: &'static str = tables::SITE_CONTENT;
    const LABEL: &'static str = "Content section";
    const ORDER: Option<(&'static str, bool)> = Some(("section_name", true));
    type Draft = SiteContentDraft;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogPostDraft {
    pub title: String,
    /// Derived from the title when empty.
    #[serde(default)]
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl Entity for BlogPost {
    const TABLE: &'static str = tables::BLOG_POSTS;
    const LABEL: &'static str = "Blog post";
    const ORDER: Option<(&'static str, bool)> = Some(("created_at", false));
    const MODERATED: &'static [&'static str] = &["title", "excerpt", "content"];
    type Draft = BlogPostDraft;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_name: String,
    #[serde(default)]
    pub author_email: Option<String>,
    pub content: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogCommentDraft {
    pub post_id: Uuid,
    pub author_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    pub content: String,
    /// Public submissions are always stored unapproved.
    #[serde(default)]
    pub approved: bool,
}

impl Entity for BlogComment {
    const TABLE: &'static str = tables::BLOG_COMMENTS;
    const LABEL: &'static str = "Comment";
    const ORDER: Option<(&'static str, bool)> = Some(("created_at", true));
    const MODERATED: &'static [&'static str] = &["author_name", "content"];
    type Draft = BlogCommentDraft;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogReaction {
    pub id: Uuid,
    pub post_id: Uuid,
    pub session_id: String,
    pub reaction_type: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogReactionDraft {
    pub post_id: Uuid,
    pub session_id: String,
    pub reaction_type: String,
}

impl Entity for BlogReaction {
    const TABLE: &'static str = tables::BLOG_REACTIONS;
    const LABEL: &'static str = "Reaction";
    type Draft = BlogReactionDraft;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub author_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub author_name: String,
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub approved: bool,
}

impl Entity for Review {
    const TABLE: &'static str = tables::REVIEWS;
    const LABEL: &'static str = "Review";
    const ORDER: Option<(&'static str, bool)> = Some(("created_at", false));
    const MODERATED: &'static [&'static str] = &["author_name", "comment"];
    type Draft = ReviewDraft;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImageDraft {
    pub title: String,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

impl Entity for GalleryImage {
    const TABLE: &'static str = tables::GALLERY_IMAGES;
    const LABEL: &'static str = "Gallery image";
    const ORDER: Option<(&'static str, bool)> = Some(("sort_order", true));
    type Draft = GalleryImageDraft;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Showcased for GalleryImage {
    fn is_active(&self) -> bool {
        self.is_active
    }

    fn sort_order(&self) -> i32 {
        self.sort_order
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouristAttraction {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouristAttractionDraft {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

impl Entity for TouristAttraction {
    const TABLE: &'static str = tables::TOURIST_ATTRACTIONS;
    const LABEL: &'static str = "Attraction";
    const ORDER: Option<(&'static str, bool)> = Some(("sort_order", true));
    type Draft = TouristAttractionDraft;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Showcased for TouristAttraction {
    fn is_active(&self) -> bool {
        self.is_active
    }

    fn sort_order(&self) -> i32 {
        self.sort_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_with_missing_optional_columns() {
        let image: GalleryImage = serde_json::from_value(json!({
            "id": "7d3c1f0e-8f7a-4f43-9a55-2f1c6de0c001",
            "title": "Lighthouse at dusk",
            "image_url": "https://cdn.example.com/lighthouse.jpg",
        }))
        .unwrap();
        assert!(image.is_active);
        assert_eq!(image.sort_order, 0);
        assert!(image.category.is_none());
    }

    #[test]
    fn test_decode_server_timestamps() {
        let review: Review = serde_json::from_value(json!({
            "id": "7d3c1f0e-8f7a-4f43-9a55-2f1c6de0c002",
            "author_name": "Ana",
            "rating": 5,
            "comment": "Lovely beach",
            "created_at": "2024-06-01T10:00:00+00:00",
        }))
        .unwrap();
        assert!(!review.approved);
        assert!(review.created_at.is_some());
    }

    #[test]
    fn test_draft_skips_empty_optionals() {
        let draft = BlogCommentDraft {
            post_id: Uuid::nil(),
            author_name: "Rui".into(),
            author_email: None,
            content: "Great tips".into(),
            approved: false,
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get("author_email").is_none());
        assert_eq!(BlogComment::MODERATED, &["author_name", "content"]);
    }
}
