//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use coastline_cms::cache::MemoryCache;
use coastline_cms::config::SiteConfig;
use coastline_cms::notify::NotificationLog;
use coastline_cms::projector::CssProjector;
use coastline_cms::remote::{MemoryStore, RemoteStore};
use coastline_cms::{HttpServer, Shutdown, SiteServices, VisualConfigContext};

pub const ADMIN_KEY: &str = "test-admin-key";

/// A `visual_config` row as the backend stores it.
pub fn visual_row(config_type: &str, data: Value) -> Value {
    json!({
        "config_type": config_type,
        "config_data": data,
        "is_active": true,
    })
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
    pub projector: Arc<CssProjector>,
    pub log: Arc<NotificationLog>,
    pub ctx: Arc<VisualConfigContext>,
}

/// A context over an in-process store.
pub fn harness(store: Arc<MemoryStore>) -> Harness {
    let cache = Arc::new(MemoryCache::new());
    let projector = Arc::new(CssProjector::new());
    let log = Arc::new(NotificationLog::new());
    let ctx = Arc::new(
        VisualConfigContext::new(store.clone(), cache.clone(), projector.clone(), log.clone())
            .with_identity("editor@coastline.test"),
    );
    Harness {
        store,
        cache,
        projector,
        log,
        ctx,
    }
}

/// Offline configuration for tests: no cache file, fixed admin key.
pub fn test_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.cache.path = None;
    config.server.admin_api_key = ADMIN_KEY.to_string();
    config.server.bind_address = "127.0.0.1:0".to_string();
    config.moderation.blocked_words = vec!["scam".to_string()];
    config
}

/// Serve `services` on an ephemeral port.
pub async fn spawn_server(services: Arc<SiteServices>) -> (SocketAddr, Arc<Shutdown>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(services);
    let stop = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, stop).await;
    });
    (addr, shutdown)
}

/// Services over an in-process store, already served.
pub async fn spawn_site(store: Arc<MemoryStore>) -> (SocketAddr, Arc<SiteServices>, Arc<Shutdown>) {
    let remote: Arc<dyn RemoteStore> = store;
    let services = Arc::new(SiteServices::with_store(
        test_config(),
        remote,
        Arc::new(MemoryCache::new()),
    ));
    services.start_sync().await;
    let (addr, shutdown) = spawn_server(services.clone()).await;
    (addr, services, shutdown)
}

/// A request received by the mock backend.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub target: String,
    pub body: String,
}

impl MockRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }
}

/// Start a programmable mock of the backend's REST API.
pub async fn start_mock_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            401 => "401 Unauthorized",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some(MockRequest {
        method,
        target,
        body,
    })
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
