//! Content hooks for the public site and the dashboard.
//!
//! # Data Flow
//! ```text
//! dashboard / site page
//!     → managers (site, blog, reviews, showcase)
//!         → Collection<E> (one remote call per operation)
//!             → moderation (edge function or word list)
//!             → RemoteStore
//!         → notifications
//! ```
//!
//! # Design Decisions
//! - Every table is served by the same generic collection
//! - Domain rules (slugs, rating bounds, approval) live in the managers

pub mod blog;
pub mod collection;
pub mod entities;
pub mod moderation;
pub mod reviews;
pub mod showcase;
pub mod site;

pub use blog::{slugify, BlogManager};
pub use collection::Collection;
pub use entities::{
    BlogComment, BlogCommentDraft, BlogPost, BlogPostDraft, BlogReaction, BlogReactionDraft,
    Entity, GalleryImage, GalleryImageDraft, Review, ReviewDraft, Showcased, SiteContent,
    SiteContentDraft, TouristAttraction, TouristAttractionDraft,
};
pub use moderation::{Moderator, RemoteModerator, WordFilter};
pub use reviews::ReviewManager;
pub use showcase::{Attractions, Gallery};
pub use site::ContentManager;
