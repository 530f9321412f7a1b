//! The REST client against a mock backend on a real port.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use coastline_cms::cache::MemoryCache;
use coastline_cms::config::{BackendConfig, RealtimeConfig};
use coastline_cms::content::{Moderator, RemoteModerator};
use coastline_cms::notify::{Level, NotificationLog};
use coastline_cms::projector::CssProjector;
use coastline_cms::remote::{ErrorKind, RemoteStore, RestStore};
use coastline_cms::visual::{FragmentKind, VisualConfigPatch};
use coastline_cms::VisualConfigContext;

use common::{start_mock_backend, visual_row, MockRequest};

fn rest_store(addr: std::net::SocketAddr) -> Arc<RestStore> {
    let backend = BackendConfig {
        url: Some(format!("http://{}", addr)),
        anon_key: "anon-key".to_string(),
        timeout_secs: 2,
        read_retries: 2,
        retry_base_ms: 5,
        ..BackendConfig::default()
    };
    let realtime = RealtimeConfig {
        enabled: false,
        ..RealtimeConfig::default()
    };
    Arc::new(RestStore::new(&backend, &realtime).unwrap())
}

fn context(store: Arc<RestStore>) -> (VisualConfigContext, Arc<NotificationLog>) {
    let log = Arc::new(NotificationLog::new());
    let ctx = VisualConfigContext::new(
        store,
        Arc::new(MemoryCache::new()),
        Arc::new(CssProjector::new()),
        log.clone(),
    );
    (ctx, log)
}

#[tokio::test]
async fn test_load_reads_active_rows() {
    let seen = Arc::new(Mutex::new(Vec::<MockRequest>::new()));
    let recorder = seen.clone();
    let addr = start_mock_backend(move |request| {
        recorder.lock().unwrap().push(request);
        async move {
            let rows = json!([visual_row("typography", json!({ "fontFamily": "Raleway" }))]);
            (200, rows.to_string())
        }
    })
    .await;

    let (ctx, _log) = context(rest_store(addr));
    let config = ctx.load().await;
    assert_eq!(config.typography.font_family, "Raleway");

    let requests = seen.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path(), "/rest/v1/visual_config");
    assert!(requests[0].target.contains("is_active=eq.true"));
}

#[tokio::test]
async fn test_transient_read_failure_is_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let addr = start_mock_backend(move |_| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 0 {
                (503, r#"{"message":"warming up"}"#.to_string())
            } else {
                (200, json!([visual_row("color_palette", json!({ "primary": "#336699" }))]).to_string())
            }
        }
    })
    .await;

    let (ctx, _log) = context(rest_store(addr));
    assert_eq!(ctx.load().await.color_palette.primary, "#336699");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_upsert_is_a_permission_failure() {
    let addr = start_mock_backend(|request| async move {
        match request.method.as_str() {
            "GET" => (200, "[]".to_string()),
            _ => (403, r#"{"message":"new row violates row-level security policy"}"#.to_string()),
        }
    })
    .await;

    let (ctx, log) = context(rest_store(addr));
    ctx.load().await;
    let before = ctx.current();

    let patch = VisualConfigPatch::new().with(FragmentKind::LogoSettings, json!({ "height": 80 }));
    let report = ctx.save(&patch).await;
    assert_eq!(report.error_kind(), Some(ErrorKind::Permission));
    assert_eq!(*ctx.current(), *before);
    assert_eq!(log.count(Level::Error), 1);
}

#[tokio::test]
async fn test_upsert_targets_fragment_conflict_key() {
    let seen = Arc::new(Mutex::new(Vec::<MockRequest>::new()));
    let recorder = seen.clone();
    let addr = start_mock_backend(move |request| {
        let body = if request.method == "POST" {
            format!("[{}]", request.body)
        } else {
            "[]".to_string()
        };
        recorder.lock().unwrap().push(request);
        async move { (201, body) }
    })
    .await;

    let (ctx, _log) = context(rest_store(addr));
    let patch = VisualConfigPatch::new().with(FragmentKind::ColorPalette, json!({ "accent": "#e11d48" }));
    assert!(ctx.save(&patch).await.is_success());

    let requests = seen.lock().unwrap();
    let upsert = requests
        .iter()
        .find(|r| r.path() == "/rest/v1/visual_config")
        .unwrap();
    assert!(upsert.target.contains("on_conflict=config_type%2Cis_active"));
    assert!(upsert.body.contains("\"config_type\":\"color_palette\""));
    assert!(requests.iter().any(|r| r.path() == "/rest/v1/content_history"));
}

#[tokio::test]
async fn test_remote_moderator_calls_edge_function() {
    let addr = start_mock_backend(|request| async move {
        assert_eq!(request.path(), "/functions/v1/moderate-content");
        (200, r#"{"moderatedContent":"nice view, **** staff"}"#.to_string())
    })
    .await;

    let store: Arc<dyn RemoteStore> = rest_store(addr);
    let moderator = RemoteModerator::new(store, "moderate-content");
    assert_eq!(moderator.moderate("nice view, rude staff").await.unwrap(), "nice view, **** staff");
}
