//! fsbucket - S3-compatible HTTP gateway over local filesystem directories

use clap::Parser;
use fsbucket::api::router;
use fsbucket::config::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// fsbucket - serve filesystem directories as S3-compatible buckets
#[derive(Parser, Debug)]
#[command(name = "fsbucket")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (overrides config)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose {
        "fsbucket=trace,tower_http=trace"
    } else {
        "fsbucket=debug,tower_http=debug"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load settings from file if specified, otherwise use default loading
    let mut settings = if let Some(ref path) = cli.config {
        Settings::from_file(path)?
    } else {
        Settings::load()?
    };

    // CLI overrides
    if let Some(ref addr) = cli.listen {
        let parsed: SocketAddr = addr.parse()?;
        settings.app.host = parsed.ip().to_string();
        settings.app.port = parsed.port();
    }

    info!("Starting fsbucket S3 server");
    info!("  Listen address: {}", settings.listen_addr());
    info!("  Virtual host suffix: {}", settings.app.virtual_host);
    for (name, bucket) in &settings.buckets {
        info!(
            "  Bucket '{}': {:?} ({} credentials)",
            name,
            bucket.root_path,
            bucket.credentials.len()
        );
        if bucket.credentials.is_empty() {
            warn!("  Bucket '{}' has no credentials and cannot be accessed", name);
        }
    }

    let app = router(Arc::new(settings.clone()));

    // Start server with graceful shutdown
    let listener = TcpListener::bind(settings.listen_addr()).await?;
    info!("fsbucket listening on http://{}", settings.listen_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
