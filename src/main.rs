//! Pagecast Server
//!
//! Presents a PDF to any number of viewers, keeping everyone on the same
//! page in real time.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagecast_server::config::Config;
use pagecast_server::relay::{LocalRelay, MqttRelay, RelayPort};
use pagecast_server::render::RenderPort;
use pagecast_server::routes;
use pagecast_server::state::AppState;
use pagecast_server::storage::DocumentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "pagecast_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Pagecast Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Documents directory: {}", config.storage.documents_dir.display());

    let store = DocumentStore::new(&config.storage.documents_dir);
    store.ensure_dir().await?;

    let renderer = build_renderer(&config);

    let relay: Arc<dyn RelayPort> = if config.relay.enabled {
        Arc::new(MqttRelay::connect(&config.relay.broker))
    } else {
        tracing::info!("MQTT relay disabled, chat stays in-process");
        Arc::new(LocalRelay::new())
    };

    let app_state = AppState::new(store, renderer, relay, config.viewers.buffer);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(app_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("Pagecast Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

#[cfg(feature = "mupdf")]
fn build_renderer(config: &Config) -> Arc<dyn RenderPort> {
    Arc::new(pagecast_server::render::MupdfRenderer::new(config.render.scale))
}

#[cfg(not(feature = "mupdf"))]
fn build_renderer(_config: &Config) -> Arc<dyn RenderPort> {
    tracing::warn!("Built without the mupdf feature; documents cannot be rendered");
    Arc::new(pagecast_server::render::UnavailableRenderer)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
