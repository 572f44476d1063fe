use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use layermesh::model::StaticCatalog;
use layermesh::services::probe_loop;
use layermesh::worker::HttpWorkerClient;
use layermesh::{api, AppState};
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Layermesh coordinator - pipeline-parallel generation over a worker fleet
#[derive(Parser, Debug)]
#[command(name = "layermesh")]
#[command(about = "Coordinator for pipeline-parallel text generation")]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Seconds between background worker status sweeps
    #[arg(long, default_value = "10")]
    probe_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.log_level.as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("warn") => Level::WARN,
        Some("error") => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting layermesh coordinator");

    // Registry and model session live in process memory only; a restart
    // loses all worker and model state.
    let transport = Arc::new(HttpWorkerClient::new()?);
    let catalog = Arc::new(StaticCatalog::new());
    let state = AppState::new(transport, catalog);

    // Spawn the background probe loop keeping displayed status fresh
    info!("Starting health probe loop");
    let monitor = state.monitor.clone();
    let probe_period = Duration::from_secs(cli.probe_interval_secs);
    tokio::spawn(async move {
        probe_loop(monitor, probe_period).await;
    });

    // Create API router
    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Coordinator listening");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Coordinator shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
            Ok(mut stream) => {
                stream.recv().await;
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
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
