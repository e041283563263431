//! slotbook-server entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{Level, info, warn};

use slotbook_core::{TracingOutputFormat, init_tracing};
use slotbook_server::{AppState, Database, ProviderFactory, ServerConfig, routes, seed_demo};

/// slotbook - appointments and calendar import for a small salon
#[derive(Debug, Parser)]
#[command(name = "slotbook-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long, short, env = "SLOTBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:3001
    #[arg(long, env = "SLOTBOOK_BIND")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(long, env = "SLOTBOOK_DB")]
    database: Option<PathBuf>,

    /// Load demo data into an empty database
    #[arg(long)]
    seed_demo: bool,

    /// Enable debug output
    #[arg(long, short = 'v')]
    debug: bool,

    /// Log format: pretty, compact or json
    #[arg(long)]
    log_format: Option<TracingOutputFormat>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match args.config {
        Some(ref path) => ServerConfig::load_from(path)?,
        None => ServerConfig::load()?,
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(path) = args.database {
        config.database.path = Some(path);
    }
    if args.seed_demo {
        config.database.seed_demo = true;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    let mut tracing = config.logging.tracing_config()?;
    if args.debug {
        tracing = tracing.with_level(Level::DEBUG);
    }
    init_tracing(tracing)?;

    let db = Database::open(config.database_path())?;
    if config.database.seed_demo && seed_demo(&db)? {
        info!("loaded demo data");
    }

    let credential = config.google.credential()?;
    let state = AppState::new(db, provider_factory(&config))
        .with_booking_policy(config.booking.policy())
        .with_fallback_credential(credential);
    let app = routes::router(state, routes::cors_layer(&config.server.allowed_origins));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "slotbook-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("slotbook-server stopped");
    Ok(())
}

#[cfg(feature = "google")]
fn provider_factory(config: &ServerConfig) -> Arc<dyn ProviderFactory> {
    Arc::new(slotbook_server::GoogleProviderFactory::new(
        config.google.timeout(),
    ))
}

#[cfg(not(feature = "google"))]
fn provider_factory(_config: &ServerConfig) -> Arc<dyn ProviderFactory> {
    warn!("built without a calendar provider; sync imports nothing");
    Arc::new(slotbook_server::FixedProviderFactory::new(
        slotbook_providers::MemoryProvider::new(),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
