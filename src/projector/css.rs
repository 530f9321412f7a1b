//! Visual config → CSS custom properties.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::visual::{ButtonShape, HoverEffect, LogoPosition, LogoSize, NavbarPosition, VisualConfig};

/// Compute every CSS variable for `config`.
pub fn variables(config: &VisualConfig) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    let mut set = |name: &str, value: String| {
        vars.insert(format!("--{}", name), sanitize(&value));
    };

    for (role, value) in config.color_palette.roles() {
        set(&format!("color-{}", role), value.to_string());
    }

    let navbar = &config.navbar_settings;
    set("navbar-bg", navbar.background_color.clone());
    set("navbar-text", navbar.text_color.clone());
    set(
        "navbar-position",
        match navbar.position {
            NavbarPosition::Fixed => "fixed",
            NavbarPosition::Static => "static",
        }
        .to_string(),
    );

    let logo = &config.logo_settings;
    set("logo-height", format!("{}px", logo.height));
    set("logo-margin", format!("{}px", logo.margin));
    set(
        "logo-justify",
        match logo.position {
            LogoPosition::Left => "flex-start",
            LogoPosition::Center => "center",
            LogoPosition::Right => "flex-end",
        }
        .to_string(),
    );
    set(
        "logo-scale",
        match logo.size {
            LogoSize::Small => "0.75",
            LogoSize::Medium => "1",
            LogoSize::Large => "1.25",
        }
        .to_string(),
    );

    let buttons = &config.button_styles;
    set(
        "button-radius",
        match buttons.primary_style {
            ButtonShape::Rounded => "0.5rem",
            ButtonShape::Square => "0",
            ButtonShape::Pill => "9999px",
        }
        .to_string(),
    );
    set("button-primary", buttons.primary_color.clone());
    set("button-secondary", buttons.secondary_color.clone());
    let (transform, shadow) = match buttons.hover_effect {
        HoverEffect::Scale => ("scale(1.05)".to_string(), "none".to_string()),
        HoverEffect::Shadow => (
            "none".to_string(),
            "0 4px 12px rgba(0, 0, 0, 0.15)".to_string(),
        ),
        HoverEffect::Glow => ("none".to_string(), format!("0 0 12px {}", buttons.primary_color)),
    };
    set("button-hover-transform", transform);
    set("button-hover-shadow", shadow);

    let typography = &config.typography;
    set("font-family", format!("{}, sans-serif", typography.font_family));
    set("heading-color", typography.heading_color.clone());
    set("body-color", typography.body_color.clone());
    set("link-color", typography.link_color.clone());

    vars
}

/// Render variables as a `:root` block.
pub fn render(vars: &BTreeMap<String, String>) -> String {
    let mut css = String::from(":root {\n");
    for (name, value) in vars {
        let _ = writeln!(css, "  {}: {};", name, value);
    }
    css.push_str("}\n");
    css
}

// Values come from dashboard input and end up in a served stylesheet.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '\n' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_variable_per_field() {
        let vars = variables(&VisualConfig::default());
        assert_eq!(vars.len(), 15 + 3 + 4 + 5 + 4);
        assert_eq!(vars["--color-primary"], "#0ea5e9");
        assert_eq!(vars["--button-radius"], "0.5rem");
        assert_eq!(vars["--font-family"], "Inter, sans-serif");
        assert_eq!(vars["--logo-height"], "40px");
    }

    #[test]
    fn test_enum_mappings() {
        let mut config = VisualConfig::default();
        config.button_styles.primary_style = ButtonShape::Pill;
        config.button_styles.hover_effect = HoverEffect::Glow;
        config.logo_settings.position = LogoPosition::Right;
        config.navbar_settings.position = NavbarPosition::Static;

        let vars = variables(&config);
        assert_eq!(vars["--button-radius"], "9999px");
        assert_eq!(vars["--button-hover-shadow"], "0 0 12px #0ea5e9");
        assert_eq!(vars["--button-hover-transform"], "none");
        assert_eq!(vars["--logo-justify"], "flex-end");
        assert_eq!(vars["--navbar-position"], "static");
    }

    #[test]
    fn test_values_are_sanitized() {
        let mut config = VisualConfig::default();
        config.color_palette.primary = "red; } body { display: none".to_string();
        let vars = variables(&config);
        assert_eq!(vars["--color-primary"], "red  body  display: none");
    }

    #[test]
    fn test_render_root_block() {
        let mut vars = BTreeMap::new();
        vars.insert("--a".to_string(), "1".to_string());
        assert_eq!(render(&vars), ":root {\n  --a: 1;\n}\n");
    }
}
