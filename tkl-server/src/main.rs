//! Topkilat storefront server
//!
//! Takes top-up orders, collects payment through a gateway and delivers the
//! goods through a topup provider.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::ShutdownHandle;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tkl_core::events::fulfillment_channel;
use tkl_core::orchestrator::Orchestrator;
use tkl_core::processors::{FulfillmentWorker, Reconciler};
use tkl_core::store::PgOrderStore;
use tkl_core::{gateways, providers};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Topkilat - top-up storefront order server
#[derive(Parser, Debug)]
#[command(name = "tkl-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./tkl-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long, env = "TKL_LOG_JSON", default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_json);

    tracing::info!("Starting tkl-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    let core = loaded_config.core;
    tracing::info!(
        payment = core.payment.name(),
        provider = core.provider.name(),
        "Configuration loaded from {:?}",
        args.config
    );

    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Wire the orchestrator
    let gateway = gateways::from_config(&core.payment).map_err(|e| {
        tracing::error!("Failed to build payment gateway client: {}", e);
        e
    })?;
    let provider = providers::from_config(&core.provider).map_err(|e| {
        tracing::error!("Failed to build topup provider client: {}", e);
        e
    })?;
    let (job_tx, job_rx) = fulfillment_channel();
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(PgOrderStore::new(db_pool.clone())),
        gateway,
        provider,
        job_tx.clone(),
        core.checkout,
        core.fulfillment,
    ));

    // Spawn background processors
    let shutdown = ShutdownHandle::new();
    let worker = FulfillmentWorker::new(
        orchestrator.clone(),
        job_rx,
        job_tx,
        shutdown.subscribe(),
    );
    let reconciler = Reconciler::new(orchestrator.clone(), shutdown.subscribe());
    let worker_handle = tokio::spawn(worker.run());
    let reconciler_handle = tokio::spawn(reconciler.run());

    // Build the router
    let router = build_router(AppState::new(orchestrator));

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop processors after in-flight requests have drained
    shutdown.trigger();
    for (name, handle) in [("FulfillmentWorker", worker_handle), ("Reconciler", reconciler_handle)] {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "{} task failed", name);
        }
    }

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
