//! PulseGate Server
//!
//! HTTP gateway that signs in to a Garmin Connect account on behalf of one or
//! more users, keeps their token state on local disk and serves depersonalized
//! daily health metrics as JSON.
//!
//! Usage:
//! ```bash
//! # Defaults: 0.0.0.0:5000, credentials under ~/.garminconnect
//! pulsegate-server
//!
//! # With config file (env vars override it)
//! GARMIN_SERVICE_API_KEY=secret pulsegate-server --config config.yaml
//!
//! # One-shot command, prints JSON to stdout
//! pulsegate-server exec sync_all '{"start_date":"2024-01-01","end_date":"2024-01-07"}'
//! ```
//!
//! Test with:
//! ```bash
//! curl http://localhost:5000/sleep \
//!   -H "Content-Type: application/json" \
//!   -d '{"date": "2024-01-05", "user_id": "jane"}'
//! ```

mod config;
mod exec;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::ServerConfig;
use exec::{Command, execute};
use pulsegate_egress::GarminConnector;
use pulsegate_ingress::AppState;
use pulsegate_observability::Metrics;
use pulsegate_storage::FileCredentialStore;
use pulsegate_sync::{SessionResolver, SyncService};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// PulseGate Server - Garmin Connect metrics gateway
#[derive(Parser)]
#[command(name = "pulsegate-server")]
#[command(about = "Multi-tenant gateway for Garmin Connect health metrics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "PULSEGATE_CONFIG",
        global = true
    )]
    config: Option<String>,

    /// Address to bind (overrides config and HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default if no command specified)
    Serve,
    /// Run a single command and print its JSON result
    Exec {
        /// Command name, e.g. check_auth, fetch_sleep, sync_all
        command: String,

        /// JSON arguments, e.g. '{"date":"2024-01-05"}'
        args: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    // Merge environment variables (they override config file)
    config.merge_env();

    // CLI flags have the highest precedence
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    match cli.command {
        Some(Commands::Exec { command, args }) => run_exec(&config, &command, args).await,
        Some(Commands::Serve) | None => serve(config, cli.config.as_deref()).await,
    }
}

/// Install the global tracing subscriber
fn init_tracing(config: &ServerConfig) -> anyhow::Result<()> {
    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.logging.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}

fn build_sync_service(config: &ServerConfig) -> anyhow::Result<SyncService> {
    let store = FileCredentialStore::new(
        &config.credentials.default_dir,
        &config.credentials.users_dir,
    )
    .context("Failed to initialize credential store")?;

    let connector = GarminConnector::new(config.upstream.to_garmin_config())
        .context("Failed to initialize Garmin connector")?;

    Ok(SyncService::new(SessionResolver::new(
        Arc::new(store),
        Arc::new(connector),
    )))
}

async fn serve(config: ServerConfig, config_path: Option<&str>) -> anyhow::Result<()> {
    init_tracing(&config)?;

    match config_path {
        Some(path) => info!("Loaded configuration from {}", path),
        None => info!("Using default configuration"),
    }

    let sync = build_sync_service(&config)?;
    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);

    let api_key = config.api_key();
    if api_key.is_some() {
        info!("API key authentication enabled");
    } else {
        warn!("No service API key configured; endpoints are open");
    }

    let app = pulsegate_ingress::app(AppState::new(sync, metrics), api_key);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("PulseGate listening on http://{}", addr);
    info!("   Upstream:           {}", config.upstream.base_url);
    info!("   Health check:       http://{}/health", addr);
    info!("   Prometheus metrics: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn run_exec(
    config: &ServerConfig,
    command: &str,
    args: Option<String>,
) -> anyhow::Result<()> {
    let command = match command.parse::<Command>() {
        Ok(command) => command,
        Err(unknown) => {
            println!("{}", unknown.to_json());
            std::process::exit(1);
        }
    };

    // Keep stdout clean for the JSON result
    init_tracing(config)?;

    let sync = build_sync_service(config)?;
    let args = args.unwrap_or_default();
    let result = execute(&sync, command, args.as_bytes()).await?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
