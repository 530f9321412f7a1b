//! Visual config load, save, preview and live sync against the public API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use coastline_cms::cache::{LocalCache, VISUAL_CONFIG_KEY};
use coastline_cms::notify::Level;
use coastline_cms::remote::{tables, ChangeKind, MemoryStore, Op, StoreError};
use coastline_cms::sync::ConfigSynchronizer;
use coastline_cms::visual::{
    ButtonShape, ButtonStyles, FragmentKind, NavbarSettings, Typography, VisualConfig,
    VisualConfigPatch,
};

use common::{eventually, harness, visual_row};

#[tokio::test]
async fn test_merge_fills_absent_fragments_with_defaults() {
    let defaults = VisualConfig::default();
    // Every subset of the five fragments.
    for mask in 0u32..32 {
        let rows = FragmentKind::ALL
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, kind)| match kind {
                FragmentKind::ColorPalette => visual_row("color_palette", json!({ "primary": "#010101" })),
                FragmentKind::NavbarSettings => visual_row("navbar_settings", json!({ "textColor": "#020202" })),
                FragmentKind::LogoSettings => visual_row("logo_settings", json!({ "height": 64 })),
                FragmentKind::ButtonStyles => visual_row("button_styles", json!({ "primaryStyle": "square" })),
                FragmentKind::Typography => visual_row("typography", json!({ "fontFamily": "Lora" })),
            })
            .collect();
        let store = Arc::new(MemoryStore::new());
        store.seed(tables::VISUAL_CONFIG, rows);
        let h = harness(store);

        let config = h.ctx.load().await;
        let present = |i: usize| mask & (1 << i) != 0;
        assert_eq!(present(0), config.color_palette.primary == "#010101");
        assert_eq!(config.color_palette.secondary, defaults.color_palette.secondary);
        if !present(1) {
            assert_eq!(config.navbar_settings, defaults.navbar_settings);
        }
        if !present(2) {
            assert_eq!(config.logo_settings, defaults.logo_settings);
        }
        assert_eq!(present(3), config.button_styles.primary_style == ButtonShape::Square);
        assert_eq!(present(4), config.typography.font_family == "Lora");
        assert_eq!(config.typography.heading_color, defaults.typography.heading_color);
    }
}

#[tokio::test]
async fn test_single_fragment_row_keeps_other_defaults() {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        tables::VISUAL_CONFIG,
        vec![visual_row("color_palette", json!({ "primary": "#111" }))],
    );
    let h = harness(store);

    let config = h.ctx.load().await;
    assert_eq!(config.color_palette.primary, "#111");
    assert_eq!(config.navbar_settings, NavbarSettings::default());
    assert_eq!(h.projector.variable("--color-primary").as_deref(), Some("#111"));
}

#[tokio::test]
async fn test_projection_is_idempotent() {
    let h = harness(Arc::new(MemoryStore::new()));
    let mut config = VisualConfig::default();
    config.color_palette.accent = "#ff7f50".to_string();

    h.projector.apply(&config);
    let once = h.projector.variables();
    h.projector.apply(&config);
    assert_eq!(h.projector.variables(), once);
    assert_eq!(h.projector.stylesheet().matches("--color-accent").count(), 1);
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_cache() {
    let store = Arc::new(MemoryStore::new());
    store.fail_always(Op::Select, tables::VISUAL_CONFIG, StoreError::Network("down".into()));
    let h = harness(store);
    h.cache
        .set(VISUAL_CONFIG_KEY, r#"{"typography":{"fontFamily":"Roboto"}}"#)
        .unwrap();

    let config = h.ctx.load().await;
    assert_eq!(config.typography.font_family, "Roboto");
    assert_eq!(config.color_palette, VisualConfig::default().color_palette);
    assert_eq!(h.log.count(Level::Error), 0);
}

#[tokio::test]
async fn test_remote_failure_without_cache_uses_defaults() {
    let store = Arc::new(MemoryStore::new());
    store.set_offline(true);
    let h = harness(store);

    assert_eq!(*h.ctx.load().await, VisualConfig::default());
    assert!(!h.ctx.is_loading());
}

#[tokio::test]
async fn test_save_is_optimistic_until_the_write_lands() {
    let store = Arc::new(MemoryStore::new());
    let h = harness(store.clone());
    h.ctx.load().await;
    store.hold_writes();

    let patch = VisualConfigPatch::new()
        .with(FragmentKind::ColorPalette, json!({ "primary": "#123456" }));
    let ctx = h.ctx.clone();
    let save = tokio::spawn(async move { ctx.save(&patch).await });

    assert!(eventually(|| store.held_writes() == 1).await);
    assert_eq!(h.ctx.current().color_palette.primary, "#123456");
    assert!(h.ctx.is_saving());

    store.release_writes();
    let report = save.await.unwrap();
    assert!(report.is_success());
    assert!(!h.ctx.is_saving());
    assert_eq!(h.log.count(Level::Success), 1);
}

#[tokio::test]
async fn test_failed_save_reverts_exactly_and_notifies_once() {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        tables::VISUAL_CONFIG,
        vec![visual_row("button_styles", json!({ "primaryStyle": "square" }))],
    );
    let h = harness(store.clone());
    h.ctx.load().await;
    let before = h.ctx.current();
    store.fail_next(Op::Upsert, tables::VISUAL_CONFIG, StoreError::Network("reset".into()));

    let patch: VisualConfigPatch =
        serde_json::from_value(json!({ "buttonStyles": { "primaryStyle": "pill" } })).unwrap();
    let report = h.ctx.save(&patch).await;

    assert!(!report.is_success());
    assert_eq!(h.ctx.current().button_styles.primary_style, ButtonShape::Square);
    assert_eq!(*h.ctx.current(), *before);
    assert_eq!(h.projector.variable("--button-radius").as_deref(), Some("0"));
    assert_eq!(h.log.count(Level::Error), 1);
    assert!(store.rows(tables::CONTENT_HISTORY).is_empty());
}

#[tokio::test]
async fn test_each_saved_fragment_appends_one_history_entry() {
    let store = Arc::new(MemoryStore::new());
    let h = harness(store.clone());
    h.ctx.load().await;

    let patch = VisualConfigPatch::new()
        .with(FragmentKind::Typography, json!({ "fontFamily": "Merriweather" }))
        .with(FragmentKind::ButtonStyles, json!({ "hoverEffect": "glow" }));
    assert!(h.ctx.save(&patch).await.is_success());

    let history = store.rows(tables::CONTENT_HISTORY);
    assert_eq!(history.len(), 2);
    let typography = history
        .iter()
        .find(|row| row["section_name"] == "visual_config.typography")
        .unwrap();
    assert_eq!(
        typography["old_content"],
        serde_json::to_value(Typography::default()).unwrap()
    );
    assert_eq!(typography["new_content"]["fontFamily"], "Merriweather");
    assert_eq!(typography["changed_by"], "editor@coastline.test");
    assert!(history
        .iter()
        .any(|row| row["old_content"] == serde_json::to_value(ButtonStyles::default()).unwrap()));
}

#[tokio::test]
async fn test_saved_config_survives_restart_through_cache() {
    let store = Arc::new(MemoryStore::new());
    let h = harness(store.clone());
    h.ctx.load().await;
    let patch = VisualConfigPatch::new().with(FragmentKind::ColorPalette, json!({ "accent": "#abcdef" }));
    assert!(h.ctx.save(&patch).await.is_success());

    let restarted = harness(Arc::new(MemoryStore::new()));
    let raw = h.cache.get(VISUAL_CONFIG_KEY).unwrap();
    restarted.cache.set(VISUAL_CONFIG_KEY, &raw).unwrap();
    assert!(restarted.ctx.warm_start());
    assert_eq!(restarted.ctx.current().color_palette.accent, "#abcdef");
}

#[tokio::test]
async fn test_preview_does_not_persist() {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        tables::VISUAL_CONFIG,
        vec![visual_row("color_palette", json!({ "primary": "#000080" }))],
    );
    let h = harness(store.clone());
    h.ctx.load().await;

    let patch = VisualConfigPatch::new().with(FragmentKind::ColorPalette, json!({ "primary": "#fff" }));
    h.ctx.preview(&patch).unwrap();
    assert_eq!(h.projector.variable("--color-primary").as_deref(), Some("#fff"));
    assert_eq!(h.ctx.current().color_palette.primary, "#000080");
    assert_eq!(store.call_count(Op::Upsert, tables::VISUAL_CONFIG), 0);

    let reloaded = h.ctx.load().await;
    assert_eq!(reloaded.color_palette.primary, "#000080");
    assert_eq!(h.projector.variable("--color-primary").as_deref(), Some("#000080"));
}

#[tokio::test]
async fn test_load_during_save_keeps_optimistic_fragment() {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        tables::VISUAL_CONFIG,
        vec![visual_row("typography", json!({ "fontFamily": "Lato" }))],
    );
    let h = harness(store.clone());
    h.ctx.load().await;
    store.hold_writes();

    let patch = VisualConfigPatch::new().with(FragmentKind::Typography, json!({ "fontFamily": "Poppins" }));
    let ctx = h.ctx.clone();
    let save = tokio::spawn(async move { ctx.save(&patch).await });
    assert!(eventually(|| store.held_writes() == 1).await);

    // Another session changed a different fragment meanwhile.
    let mut rows = store.rows(tables::VISUAL_CONFIG);
    rows.push(visual_row("color_palette", json!({ "primary": "#0f0f0f" })));
    store.seed(tables::VISUAL_CONFIG, rows);

    let loaded = h.ctx.load().await;
    assert_eq!(loaded.typography.font_family, "Poppins");
    assert_eq!(loaded.color_palette.primary, "#0f0f0f");

    store.release_writes();
    assert!(save.await.unwrap().is_success());
    let after = h.ctx.load().await;
    assert_eq!(after.typography.font_family, "Poppins");
    assert_eq!(after.color_palette.primary, "#0f0f0f");
}

#[tokio::test]
async fn test_superseded_load_is_discarded() {
    let store = Arc::new(MemoryStore::new());
    store.seed(
        tables::VISUAL_CONFIG,
        vec![visual_row("button_styles", json!({ "primaryStyle": "square" }))],
    );
    let h = harness(store.clone());
    store.hold_next_read();

    let ctx = h.ctx.clone();
    let slow = tokio::spawn(async move { ctx.load().await });
    assert!(eventually(|| store.held_reads() == 1).await);

    store.seed(
        tables::VISUAL_CONFIG,
        vec![visual_row("button_styles", json!({ "primaryStyle": "pill" }))],
    );
    let fresh = h.ctx.load().await;
    assert_eq!(fresh.button_styles.primary_style, ButtonShape::Pill);

    store.release_reads();
    let returned = slow.await.unwrap();
    assert_eq!(returned.button_styles.primary_style, ButtonShape::Pill);
    assert_eq!(h.ctx.current().button_styles.primary_style, ButtonShape::Pill);
    assert_eq!(h.projector.variable("--button-radius").as_deref(), Some("9999px"));
    let cached = h.cache.get(VISUAL_CONFIG_KEY).unwrap();
    assert!(cached.contains("pill"));
}

#[tokio::test]
async fn test_synchronizer_reloads_on_remote_change_and_releases() {
    let store = Arc::new(MemoryStore::new());
    let h = harness(store.clone());
    let handle = ConfigSynchronizer::start(h.ctx.clone()).await.unwrap();
    assert!(handle.is_active());
    assert_eq!(store.listener_count(tables::VISUAL_CONFIG), 1);

    store.seed(
        tables::VISUAL_CONFIG,
        vec![visual_row("navbar_settings", json!({ "backgroundColor": "#224466" }))],
    );
    store.notify_change(tables::VISUAL_CONFIG, ChangeKind::Update);
    let ctx = h.ctx.clone();
    assert!(eventually(move || ctx.current().navbar_settings.background_color == "#224466").await);

    handle.stop().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.listener_count(tables::VISUAL_CONFIG), 0);
}

#[tokio::test]
async fn test_partial_save_reports_committed_fragments() {
    let store = Arc::new(MemoryStore::new());
    let h = harness(store.clone());
    h.ctx.load().await;
    store.fail_after(
        Op::Upsert,
        tables::VISUAL_CONFIG,
        1,
        StoreError::Permission("row level security".into()),
    );

    let patch = VisualConfigPatch::new()
        .with(FragmentKind::ColorPalette, json!({ "primary": "#aa0000" }))
        .with(FragmentKind::LogoSettings, json!({ "height": 72 }))
        .with(FragmentKind::Typography, json!({ "fontFamily": "Nunito" }));
    let report = h.ctx.save(&patch).await;

    assert!(report.is_partial());
    assert_eq!(report.committed(), vec![FragmentKind::ColorPalette]);
    assert_eq!(report.failure().unwrap().fragment, FragmentKind::LogoSettings);
    assert_eq!(store.call_count(Op::Upsert, tables::VISUAL_CONFIG), 2);
    assert_eq!(*h.ctx.current(), VisualConfig::default());
    assert_eq!(h.log.count(Level::Error), 1);
}
