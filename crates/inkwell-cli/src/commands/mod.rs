//! CLI command definitions and dispatch.

pub mod migrate;
pub mod rbac;
pub mod serve;
pub mod user;

use clap::{Parser, Subcommand};

use inkwell_core::config::AppConfig;
use inkwell_core::error::AppError;
use inkwell_database::DatabasePool;

use crate::output::OutputFormat;

/// Inkwell: blog backend with role based access control
#[derive(Debug, Parser)]
#[command(name = "inkwell", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file, without extension
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Environment overlay loaded from `config/{env}`
    /// [default: $INKWELL_ENV, then development]
    #[arg(short, long)]
    pub env: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve(serve::ServeArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Permissions and system roles
    Rbac(rbac::RbacArgs),
    /// User management
    User(user::UserArgs),
}

impl Cli {
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load_from(&self.config, &self.environment())?;
        match &self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Migrate(args) => migrate::execute(args, &config, self.format).await,
            Commands::Rbac(args) => rbac::execute(args, &config, self.format).await,
            Commands::User(args) => user::execute(args, &config, self.format).await,
        }
    }

    /// The `--env` flag wins over `INKWELL_ENV`.
    pub fn environment(&self) -> String {
        self.env
            .clone()
            .or_else(|| std::env::var("INKWELL_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }
}

/// Helper: open the database pool from config
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_env_flag_selects_overlay() {
        let cli = Cli::try_parse_from(["inkwell", "--env", "staging", "migrate", "status"]).unwrap();
        assert_eq!(cli.environment(), "staging");
        assert_eq!(cli.config, "config/default");
    }
}
