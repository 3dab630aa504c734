//! bindery HTTP export server

use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bindery::server::{ServerConfig, router};
use bindery::{Packager, UserSettings};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bindery=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    let mut packager = Packager::new();
    if let Some(path) = &config.settings_path {
        match UserSettings::from_path(path) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", path.display());
                packager = packager.with_settings(&settings);
            }
            Err(e) => tracing::warn!("Ignoring settings: {}", e),
        }
    }

    let addr = match config.addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid listen address {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };

    let app = router(packager, config.max_body_bytes).layer(TraceLayer::new_for_http());

    tracing::info!("Starting bindery server v{} on {}", env!("CARGO_PKG_VERSION"), addr);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
    }
    tracing::info!("Shutting down");
}
