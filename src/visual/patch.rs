//! Partial visual configuration updates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::visual::fragment::{self, FragmentError, FragmentKind, OverlayMode};
use crate::visual::schema::VisualConfig;

/// A partial `VisualConfig`: for each fragment, the keys to change.
///
/// Deserializes from the same camelCase shape as the full config, e.g.
/// `{"buttonStyles": {"primaryStyle": "pill"}}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VisualConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navbar_settings: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_settings: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_styles: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typography: Option<Map<String, Value>>,
}

impl VisualConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that rewrites every fragment to its value in `config`.
    pub fn full(config: &VisualConfig) -> Self {
        let mut patch = Self::new();
        for kind in FragmentKind::ALL {
            if let Value::Object(map) = fragment::slice(config, kind) {
                patch.set(kind, map);
            }
        }
        patch
    }

    /// Builder form of [`VisualConfigPatch::set`]. Non-object values are ignored.
    pub fn with(mut self, kind: FragmentKind, value: Value) -> Self {
        match value {
            Value::Object(map) => self.set(kind, map),
            other => tracing::warn!(fragment = %kind, value = %other, "Ignoring non-object patch value"),
        }
        self
    }

    /// Replace the keys to change for `kind`.
    pub fn set(&mut self, kind: FragmentKind, keys: Map<String, Value>) {
        *self.slot_mut(kind) = Some(keys);
    }

    pub fn get(&self, kind: FragmentKind) -> Option<&Map<String, Value>> {
        match kind {
            FragmentKind::ColorPalette => self.color_palette.as_ref(),
            FragmentKind::NavbarSettings => self.navbar_settings.as_ref(),
            FragmentKind::LogoSettings => self.logo_settings.as_ref(),
            FragmentKind::ButtonStyles => self.button_styles.as_ref(),
            FragmentKind::Typography => self.typography.as_ref(),
        }
    }

    /// Fragments touched by this patch, in persistence order.
    pub fn kinds(&self) -> Vec<FragmentKind> {
        FragmentKind::ALL
            .into_iter()
            .filter(|k| self.get(*k).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }

    /// Merge this patch over `base`, rejecting values that do not fit.
    pub fn apply_to(&self, base: &VisualConfig) -> Result<VisualConfig, FragmentError> {
        let mut updated = base.clone();
        for kind in self.kinds() {
            if let Some(keys) = self.get(kind) {
                fragment::overlay(&mut updated, kind, keys, OverlayMode::Strict)?;
            }
        }
        Ok(updated)
    }

    fn slot_mut(&mut self, kind: FragmentKind) -> &mut Option<Map<String, Value>> {
        match kind {
            FragmentKind::ColorPalette => &mut self.color_palette,
            FragmentKind::NavbarSettings => &mut self.navbar_settings,
            FragmentKind::LogoSettings => &mut self.logo_settings,
            FragmentKind::ButtonStyles => &mut self.button_styles,
            FragmentKind::Typography => &mut self.typography,
        }
    }
}
