//! Visual configuration schema definitions.
//!
//! This module defines the merged visual configuration of the site and its
//! five fragments. Every type has a compiled-in default, so a merged config
//! is always fully populated. Field names serialize as camelCase to match the
//! JSON blobs stored in the `visual_config` table.

use serde::{Deserialize, Serialize};

/// Root visual configuration of the site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct VisualConfig {
    /// Named color roles.
    pub color_palette: ColorPalette,

    /// Navigation bar contents and appearance.
    pub navbar_settings: NavbarSettings,

    /// Logo placement and asset.
    pub logo_settings: LogoSettings,

    /// Button shape, colors and hover effect.
    pub button_styles: ButtonStyles,

    /// Font family and text colors.
    pub typography: Typography,
}

/// Color palette: one value per named role.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub text: String,
    pub accent: String,
    pub navbar: String,
    pub button: String,
    pub link: String,
    pub card: String,
    pub border: String,
    pub muted: String,
    pub destructive: String,
    pub warning: String,
    pub success: String,
    pub info: String,
}

impl ColorPalette {
    /// All roles with their current values, in a stable order.
    pub fn roles(&self) -> [(&'static str, &str); 15] {
        [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("background", &self.background),
            ("text", &self.text),
            ("accent", &self.accent),
            ("navbar", &self.navbar),
            ("button", &self.button),
            ("link", &self.link),
            ("card", &self.card),
            ("border", &self.border),
            ("muted", &self.muted),
            ("destructive", &self.destructive),
            ("warning", &self.warning),
            ("success", &self.success),
            ("info", &self.info),
        ]
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            primary: "#0ea5e9".to_string(),
            secondary: "#f59e0b".to_string(),
            background: "#ffffff".to_string(),
            text: "#0f172a".to_string(),
            accent: "#14b8a6".to_string(),
            navbar: "#ffffff".to_string(),
            button: "#0ea5e9".to_string(),
            link: "#0284c7".to_string(),
            card: "#ffffff".to_string(),
            border: "#e2e8f0".to_string(),
            muted: "#64748b".to_string(),
            destructive: "#ef4444".to_string(),
            warning: "#f59e0b".to_string(),
            success: "#22c55e".to_string(),
            info: "#3b82f6".to_string(),
        }
    }
}

/// A single navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    /// Label shown in the navbar.
    pub name: String,

    /// Target path or URL.
    pub path: String,

    /// Hidden items stay configured but are not rendered.
    #[serde(default = "default_visible")]
    pub visible: bool,

    /// Sort key (ascending).
    #[serde(default)]
    pub order: u32,
}

fn default_visible() -> bool {
    true
}

impl NavItem {
    fn new(name: &str, path: &str, order: u32) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            visible: true,
            order,
        }
    }
}

/// Navbar position mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NavbarPosition {
    #[default]
    Fixed,
    Static,
}

/// Navbar settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavbarSettings {
    pub items: Vec<NavItem>,
    pub background_color: String,
    pub text_color: String,
    pub position: NavbarPosition,
}

impl NavbarSettings {
    /// Visible items sorted by their `order`.
    pub fn visible_items(&self) -> Vec<&NavItem> {
        let mut items: Vec<&NavItem> = self.items.iter().filter(|i| i.visible).collect();
        items.sort_by_key(|i| i.order);
        items
    }
}

impl Default for NavbarSettings {
    fn default() -> Self {
        Self {
            items: vec![
                NavItem::new("Home", "/", 0),
                NavItem::new("Attractions", "/#attractions", 1),
                NavItem::new("Gallery", "/#gallery", 2),
                NavItem::new("Virtual Tour", "/#virtual-tour", 3),
                NavItem::new("Reviews", "/#reviews", 4),
                NavItem::new("Blog", "/blog", 5),
                NavItem::new("Contact", "/#contact", 6),
            ],
            background_color: "#ffffff".to_string(),
            text_color: "#0f172a".to_string(),
            position: NavbarPosition::Fixed,
        }
    }
}

/// Horizontal logo placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogoPosition {
    #[default]
    Left,
    Center,
    Right,
}

/// Logo size preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogoSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Logo settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogoSettings {
    pub position: LogoPosition,
    pub size: LogoSize,

    /// Rendered height in pixels.
    pub height: u32,

    /// Margin around the logo in pixels.
    pub margin: u32,

    /// Uploaded logo asset; the text wordmark is used when absent.
    pub logo_url: Option<String>,
}

impl Default for LogoSettings {
    fn default() -> Self {
        Self {
            position: LogoPosition::Left,
            size: LogoSize::Medium,
            height: 40,
            margin: 8,
            logo_url: None,
        }
    }
}

/// Button shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ButtonShape {
    #[default]
    Rounded,
    Square,
    Pill,
}

/// Button hover effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HoverEffect {
    #[default]
    Scale,
    Shadow,
    Glow,
}

/// Button styles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ButtonStyles {
    pub primary_style: ButtonShape,
    pub primary_color: String,
    pub secondary_color: String,
    pub hover_effect: HoverEffect,
}

impl Default for ButtonStyles {
    fn default() -> Self {
        Self {
            primary_style: ButtonShape::Rounded,
            primary_color: "#0ea5e9".to_string(),
            secondary_color: "#f59e0b".to_string(),
            hover_effect: HoverEffect::Scale,
        }
    }
}

/// Typography settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Typography {
    pub font_family: String,
    pub heading_color: String,
    pub body_color: String,
    pub link_color: String,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            font_family: "Inter".to_string(),
            heading_color: "#0f172a".to_string(),
            body_color: "#334155".to_string(),
            link_color: "#0284c7".to_string(),
        }
    }
}
