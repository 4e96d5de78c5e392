//! Start the Inkwell server.

use clap::Args;

use inkwell_core::config::{AppConfig, SeedPolicy};
use inkwell_core::error::AppError;
use inkwell_database::migration::run_migrations;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Do not apply pending migrations on startup
    #[arg(long)]
    pub skip_migrations: bool,

    /// Rewrite stored permissions and system roles from the registry
    #[arg(long)]
    pub sync_rbac: bool,
}

pub async fn execute(args: &ServeArgs, mut config: AppConfig) -> Result<(), AppError> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if args.sync_rbac {
        config.rbac.seed_policy = SeedPolicy::Sync;
    }

    println!("Starting Inkwell server...");
    println!("  Host: {}", config.server.host);
    println!("  Port: {}", config.server.port);

    let db = super::connect(&config).await?;
    if !args.skip_migrations {
        println!("Running database migrations...");
        run_migrations(db.pool()).await?;
    }

    inkwell_api::run_server(config, db).await
}
