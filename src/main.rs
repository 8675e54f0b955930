mod api;
mod audit;
mod commands;
mod dashboard;
mod lifecycle;
mod process;

use clap::{Parser, Subcommand};
use edison_channels::whatsapp::WhatsAppConnector;
use edison_core::{activity::ActivityLog, config, credentials};
use lifecycle::{Lifecycle, LifecycleOptions};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "edison",
    version,
    about = "Edison, a WhatsApp pairing control surface and command bot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Start,
    /// Print the resolved configuration and credential state.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let mut cfg = config::load(&cli.config)?;
    cfg.apply_env_overrides()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.edison.log_level)),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let options = LifecycleOptions::from(&cfg.session);
            credentials::ensure_dir(&options.auth_dir)?;

            let audit = audit::AuditSink::from_config(&cfg.audit);
            match &audit {
                Some(sink) => info!("Audit forwarding to {}", sink.endpoint()),
                None => info!("Audit forwarding disabled"),
            }

            let connector = Arc::new(WhatsAppConnector::new(cfg.session.device_name.clone()));
            let lifecycle = Arc::new(Lifecycle::new(connector, options, audit));
            install_panic_hook(Arc::clone(lifecycle.activity()));

            println!("{}: Starting server...", cfg.edison.name);
            let state = api::ApiState::new(
                Arc::clone(&lifecycle),
                cfg.server.port,
                cfg.server.dev_mode,
            );
            let served = api::serve(&cfg.server.host, state, shutdown_signal()).await;

            lifecycle.shutdown().await;
            if let Err(e) = served {
                error!("API server error: {e}");
                return Err(e.into());
            }
            info!("Server stopped");
        }
        Commands::Status => {
            let auth_dir = cfg.session.auth_dir();
            println!("{}: Status Check\n", cfg.edison.name);
            println!("Config: {}", cli.config);
            println!("Listen: {}:{}", cfg.server.host, cfg.server.port);
            println!("Auth dir: {}", auth_dir.display());
            println!(
                "  credentials: {}",
                if credentials::has_credentials(&auth_dir) {
                    "stored (will reconnect without pairing)"
                } else {
                    "none (pairing code required)"
                }
            );
            println!(
                "  audit: {}",
                if cfg.audit.credentials().is_some() {
                    "configured"
                } else {
                    "disabled"
                }
            );
            println!(
                "  mode: {}",
                if cfg.server.dev_mode {
                    "development"
                } else {
                    "production"
                }
            );
        }
    }

    Ok(())
}

/// Record panics in the activity log as well as the tracing output. The
/// runtime keeps serving; a panicking task only takes itself down.
fn install_panic_hook(activity: Arc<ActivityLog>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!("Unexpected failure: {info}");
        activity.try_push(format!("Unexpected failure: {info}"));
        default_hook(info);
    }));
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
