//! Coastline CMS service.
//!
//! # Architecture Overview
//!
//! ```text
//!   dashboard / site ──HTTP──▶ http + admin ──▶ sync (visual config) ──▶ projector ──▶ /theme.css
//!                                   │                 │   ▲
//!                                   │                 ▼   │ change events
//!                                   └──▶ content ──▶ remote store (REST + realtime)
//!                                                     │
//!                                                     ▼
//!                                               local cache (warm start)
//! ```
//!
//! Startup order: config, logging, metrics, services, warm start, sync,
//! content watches, signal handler, HTTP. Shutdown runs the other way.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use coastline_cms::config::load_config;
use coastline_cms::lifecycle::signals::spawn_signal_handler;
use coastline_cms::observability::{logging, metrics};
use coastline_cms::{HttpServer, Shutdown, SiteServices};

#[derive(Parser)]
#[command(name = "coastline-cms")]
#[command(about = "Visual configuration and content service for the Coastline site", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "COASTLINE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    logging::init_logging(config.observability.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "coastline-cms starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        backend = config.backend.url.as_deref().unwrap_or("in-process"),
        realtime = config.realtime.enabled,
        moderation = config.moderation.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let services = Arc::new(SiteServices::build(config)?);

    let sync = services.start_sync().await;
    let watches = services.watch_content().await;

    let shutdown = Arc::new(Shutdown::new());
    let signals = spawn_signal_handler(shutdown.clone(), services.visual.clone());

    HttpServer::new(services.clone()).run(listener, shutdown).await?;

    if let Some(sync) = sync {
        sync.stop().await;
    }
    for watch in watches {
        watch.stop().await;
    }
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
