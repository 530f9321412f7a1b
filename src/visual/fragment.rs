//! Fragment kinds and key-by-key overlay.
//!
//! # Responsibilities
//! - Name the five independently persisted fragments
//! - Extract a fragment's slice of a `VisualConfig` as JSON
//! - Overlay a JSON object onto one fragment of a config
//!
//! # Design Decisions
//! - Overlay works on the serialized form: keys present in the blob replace
//!   keys of the current value, everything else keeps its current value
//! - Lenient mode (remote loads) skips keys whose value does not fit the type
//! - Strict mode (local edits) rejects the whole fragment instead

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::visual::schema::VisualConfig;

/// One named slice of the visual configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    ColorPalette,
    NavbarSettings,
    LogoSettings,
    ButtonStyles,
    Typography,
}

impl FragmentKind {
    /// Every kind, in the order fragments are persisted.
    pub const ALL: [FragmentKind; 5] = [
        FragmentKind::ColorPalette,
        FragmentKind::NavbarSettings,
        FragmentKind::LogoSettings,
        FragmentKind::ButtonStyles,
        FragmentKind::Typography,
    ];

    /// Value of the `config_type` column.
    pub fn config_type(self) -> &'static str {
        match self {
            FragmentKind::ColorPalette => "color_palette",
            FragmentKind::NavbarSettings => "navbar_settings",
            FragmentKind::LogoSettings => "logo_settings",
            FragmentKind::ButtonStyles => "button_styles",
            FragmentKind::Typography => "typography",
        }
    }

    /// Key of this fragment in the serialized `VisualConfig`.
    pub fn field_name(self) -> &'static str {
        match self {
            FragmentKind::ColorPalette => "colorPalette",
            FragmentKind::NavbarSettings => "navbarSettings",
            FragmentKind::LogoSettings => "logoSettings",
            FragmentKind::ButtonStyles => "buttonStyles",
            FragmentKind::Typography => "typography",
        }
    }

    /// Parse a `config_type` column value. Unknown kinds yield `None`.
    pub fn from_config_type(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.config_type() == value)
    }

    /// Position within [`FragmentKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// `section_name` used for history entries of this fragment.
    pub fn history_section(self) -> String {
        format!("visual_config.{}", self.config_type())
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_type())
    }
}

/// How overlay treats values that do not fit the fragment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    /// Skip the offending key and keep the current value.
    Lenient,
    /// Fail the whole overlay.
    Strict,
}

/// A fragment value that could not be applied.
#[derive(Debug, Error)]
#[error("invalid {kind} value: {source}")]
pub struct FragmentError {
    pub kind: FragmentKind,
    #[source]
    pub source: serde_json::Error,
}

/// JSON form of one fragment of `config`.
pub fn slice(config: &VisualConfig, kind: FragmentKind) -> Value {
    let value = match kind {
        FragmentKind::ColorPalette => serde_json::to_value(&config.color_palette),
        FragmentKind::NavbarSettings => serde_json::to_value(&config.navbar_settings),
        FragmentKind::LogoSettings => serde_json::to_value(&config.logo_settings),
        FragmentKind::ButtonStyles => serde_json::to_value(&config.button_styles),
        FragmentKind::Typography => serde_json::to_value(&config.typography),
    };
    value.unwrap_or_default()
}

/// Copy one fragment from `from` into `to`.
pub fn copy_slice(from: &VisualConfig, to: &mut VisualConfig, kind: FragmentKind) {
    match kind {
        FragmentKind::ColorPalette => to.color_palette = from.color_palette.clone(),
        FragmentKind::NavbarSettings => to.navbar_settings = from.navbar_settings.clone(),
        FragmentKind::LogoSettings => to.logo_settings = from.logo_settings.clone(),
        FragmentKind::ButtonStyles => to.button_styles = from.button_styles.clone(),
        FragmentKind::Typography => to.typography = from.typography.clone(),
    }
}

/// Overlay `blob` onto the `kind` fragment of `config`.
pub fn overlay(
    config: &mut VisualConfig,
    kind: FragmentKind,
    blob: &Map<String, Value>,
    mode: OverlayMode,
) -> Result<(), FragmentError> {
    let wrap = |source| FragmentError { kind, source };
    match kind {
        FragmentKind::ColorPalette => {
            config.color_palette = overlay_keys(&config.color_palette, blob, mode).map_err(wrap)?
        }
        FragmentKind::NavbarSettings => {
            config.navbar_settings =
                overlay_keys(&config.navbar_settings, blob, mode).map_err(wrap)?
        }
        FragmentKind::LogoSettings => {
            config.logo_settings = overlay_keys(&config.logo_settings, blob, mode).map_err(wrap)?
        }
        FragmentKind::ButtonStyles => {
            config.button_styles = overlay_keys(&config.button_styles, blob, mode).map_err(wrap)?
        }
        FragmentKind::Typography => {
            config.typography = overlay_keys(&config.typography, blob, mode).map_err(wrap)?
        }
    }
    Ok(())
}

fn overlay_keys<T>(base: &T, blob: &Map<String, Value>, mode: OverlayMode) -> serde_json::Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut current = match serde_json::to_value(base)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    match mode {
        OverlayMode::Strict => {
            for (key, value) in blob {
                current.insert(key.clone(), value.clone());
            }
        }
        OverlayMode::Lenient => {
            for (key, value) in blob {
                let mut candidate = current.clone();
                candidate.insert(key.clone(), value.clone());
                match serde_json::from_value::<T>(Value::Object(candidate.clone())) {
                    Ok(_) => current = candidate,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Ignoring mistyped fragment key");
                    }
                }
            }
        }
    }

    serde_json::from_value(Value::Object(current))
}
