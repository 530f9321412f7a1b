//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with public and dashboard routes
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve on a listener until shutdown is triggered
//! - Expose the live stylesheet and the merged visual config

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::http::content;
use crate::http::request::request_id_middleware;
use crate::lifecycle::{Shutdown, SiteServices};
use crate::visual::VisualConfig;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<SiteServices>,
    pub admin_api_key: Arc<str>,
}

/// HTTP surface of the site service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(services: Arc<SiteServices>) -> Self {
        let timeout = Duration::from_secs(services.config.server.request_timeout_secs);
        let state = AppState {
            admin_api_key: Arc::from(services.config.server.admin_api_key.as_str()),
            services,
        };
        Self {
            router: Self::build_router(state, timeout),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, timeout: Duration) -> Router {
        Router::new()
            .route("/healthz", get(health))
            .route("/theme.css", get(stylesheet))
            .route("/api/visual-config", get(visual_config))
            .merge(content::router())
            .merge(setup_admin_router(state.clone()))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(request_id_middleware))
                    .layer(TimeoutLayer::new(timeout)),
            )
    }

    /// The assembled router, for serving elsewhere.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` is triggered, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Arc<Shutdown>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    loading: bool,
    saving: bool,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let visual = &state.services.visual;
    Json(Health {
        status: "ok",
        loading: visual.is_loading(),
        saving: visual.is_saving(),
    })
}

async fn stylesheet(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        state.services.projector.stylesheet(),
    )
}

async fn visual_config(State(state): State<AppState>) -> Json<VisualConfig> {
    Json(state.services.visual.current().as_ref().clone())
}
