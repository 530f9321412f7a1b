//! Blog posts, comments and reactions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::content::collection::Collection;
use crate::content::entities::{
    BlogComment, BlogCommentDraft, BlogPost, BlogPostDraft, BlogReaction, BlogReactionDraft,
};
use crate::remote::Filter;

/// URL slug for a post title: lowercase ASCII words joined by dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut dash = false;
    for c in title.chars() {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            if dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            dash = false;
        } else {
            dash = true;
        }
    }
    slug
}

// Portuguese and Spanish accents are the common case on this site.
fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        other => other,
    }
}

/// Blog operations over the posts, comments and reactions tables.
pub struct BlogManager {
    posts: Arc<Collection<BlogPost>>,
    comments: Arc<Collection<BlogComment>>,
    reactions: Arc<Collection<BlogReaction>>,
}

impl BlogManager {
    pub fn new(
        posts: Arc<Collection<BlogPost>>,
        comments: Arc<Collection<BlogComment>>,
        reactions: Arc<Collection<BlogReaction>>,
    ) -> Self {
        Self {
            posts,
            comments,
            reactions,
        }
    }

    pub fn posts(&self) -> &Arc<Collection<BlogPost>> {
        &self.posts
    }

    pub fn comments(&self) -> &Arc<Collection<BlogComment>> {
        &self.comments
    }

    /// Create a post, deriving the slug from the title when none is given.
    pub async fn create_post(&self, mut draft: BlogPostDraft) -> Option<BlogPost> {
        if draft.slug.trim().is_empty() {
            draft.slug = slugify(&draft.title);
        }
        self.posts.create(&draft).await
    }

    pub async fn publish(&self, id: Uuid) -> bool {
        self.posts
            .update(
                id,
                json!({ "published": true, "published_at": chrono::Utc::now().to_rfc3339() }),
            )
            .await
    }

    /// Published posts, newest first.
    pub async fn published(&self) -> Vec<BlogPost> {
        self.posts
            .query(
                Filter::new()
                    .eq("published", true)
                    .order_by("published_at", false),
            )
            .await
    }

    pub async fn post_by_slug(&self, slug: &str) -> Option<BlogPost> {
        self.posts
            .query(Filter::new().eq("slug", slug))
            .await
            .into_iter()
            .next()
    }

    /// Approved comments of a post, oldest first.
    pub async fn comments_for(&self, post_id: Uuid) -> Vec<BlogComment> {
        self.comments
            .query(
                Filter::new()
                    .eq("post_id", post_id.to_string())
                    .eq("approved", true),
            )
            .await
    }

    /// Comments waiting for approval.
    pub async fn pending_comments(&self) -> Vec<BlogComment> {
        self.comments
            .query(Filter::new().eq("approved", false))
            .await
    }

    /// Submit a comment; it stays hidden until approved.
    pub async fn add_comment(&self, mut draft: BlogCommentDraft) -> Option<BlogComment> {
        draft.approved = false;
        self.comments.create(&draft).await
    }

    pub async fn approve_comment(&self, id: Uuid) -> bool {
        self.comments.update(id, json!({ "approved": true })).await
    }

    /// Add or remove a session's reaction. Returns whether the reaction is
    /// present afterwards, or `None` when existing reactions could not be
    /// read; nothing is written in that case.
    pub async fn toggle_reaction(
        &self,
        post_id: Uuid,
        session_id: &str,
        reaction_type: &str,
    ) -> Option<bool> {
        let filter = Filter::new()
            .eq("post_id", post_id.to_string())
            .eq("session_id", session_id)
            .eq("reaction_type", reaction_type);
        let existing = match self.reactions.select(&filter).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(post = %post_id, error = %e, "Failed to look up reaction");
                self.reactions.failed("Could not update reaction".to_string(), &e);
                return None;
            }
        };

        let present = match existing.first() {
            Some(reaction) => {
                // A failed delete leaves the reaction in place.
                !self.reactions.delete(reaction.id).await
            }
            None => self
                .reactions
                .create(&BlogReactionDraft {
                    post_id,
                    session_id: session_id.to_string(),
                    reaction_type: reaction_type.to_string(),
                })
                .await
                .is_some(),
        };
        Some(present)
    }

    /// Reaction counts per type for a post.
    pub async fn reaction_counts(&self, post_id: Uuid) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for reaction in self
            .reactions
            .query(Filter::new().eq("post_id", post_id.to_string()))
            .await
        {
            *counts.entry(reaction.reaction_type).or_insert(0) += 1;
        }
        counts
    }
}
