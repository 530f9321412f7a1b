//! Visual configuration model.
//!
//! # Data Flow
//! ```text
//! visual_config rows (one JSON blob per fragment kind)
//!     → fragment.rs (lenient overlay onto defaults)
//!     → VisualConfig (always fully populated)
//!
//! dashboard edit
//!     → patch.rs (VisualConfigPatch, strict overlay)
//!     → VisualConfig
//! ```
//!
//! # Design Decisions
//! - Every fragment has a compiled-in default
//! - Merge is "defaults, then keys present in the blob", per fragment
//! - No field of a merged config is ever undefined

pub mod fragment;
pub mod patch;
pub mod schema;

pub use fragment::{FragmentError, FragmentKind, OverlayMode};
pub use patch::VisualConfigPatch;
pub use schema::{
    ButtonShape, ButtonStyles, ColorPalette, HoverEffect, LogoPosition, LogoSettings, LogoSize,
    NavItem, NavbarPosition, NavbarSettings, Typography, VisualConfig,
};
