use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};

use crate::application::{ExpenseService, ServiceError};
use crate::http::{self, AppState};
use crate::storage::ExpenseRepository;
use crate::telemetry::{self, LogFormat};

/// Expenses - expense tracking over HTTP
#[derive(Parser)]
#[command(name = "expenses")]
#[command(about = "An expense-tracking record store served over HTTP")]
#[command(version)]
pub struct Cli {
    /// Database URL (e.g. "sqlite:expenses.db?mode=rwc")
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        default_value = "sqlite:expenses.db?mode=rwc"
    )]
    pub database_url: String,

    /// Log output format
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply pending migrations, then serve the HTTP API
    Serve(ServeArgs),

    /// Apply pending migrations and exit
    Migrate,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 2565)]
    pub port: u16,

    /// Turn off the Authorization date-header check
    #[arg(long, env = "EXPENSES_NO_DATE_GATE")]
    pub no_date_gate: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let Cli {
            database_url,
            log_format,
            command,
        } = self;

        telemetry::init(log_format);

        match command {
            Commands::Serve(args) => serve(&database_url, args).await,
            Commands::Migrate => migrate(&database_url).await,
        }
    }
}

async fn migrate(database_url: &str) -> Result<()> {
    let repo = ExpenseRepository::connect(database_url).await?;
    let applied = repo.migrate().await?;
    info!(applied, "database is up to date");
    repo.close().await;
    Ok(())
}

async fn serve(database_url: &str, args: ServeArgs) -> Result<()> {
    info!("Setting up database");
    let service = ExpenseService::init(database_url)
        .await
        .context("Failed to prepare database")?;
    let service = Arc::new(service);

    let date_gate = !args.no_date_gate;
    if date_gate {
        warn!("date-header gate enabled: it checks a header format and is not authentication");
    }

    let app = http::router(AppState::new(Arc::clone(&service)), date_gate);

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", args.host, args.port))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Server gracefully stopped");
    match service.close().await {
        Ok(()) | Err(ServiceError::Closed) => Ok(()),
        Err(err) => Err(err).context("Failed to close database"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
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

    info!("Shutting down the server");
}
