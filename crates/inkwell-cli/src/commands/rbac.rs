//! Permission registry commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use inkwell_auth::rbac::{PgRbacStore, RbacSeeder};
use inkwell_core::config::{AppConfig, SeedPolicy};
use inkwell_core::error::AppError;
use inkwell_service::build_registry;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct RbacArgs {
    #[command(subcommand)]
    pub command: RbacCommand,
}

#[derive(Debug, Subcommand)]
pub enum RbacCommand {
    /// Insert missing permissions and system roles
    Seed,
    /// Insert missing rows and rewrite existing ones from the registry
    Sync,
    /// List registered permissions
    List,
    /// List registered system roles
    Roles,
}

#[derive(Debug, Serialize, Tabled)]
struct PermissionRow {
    name: String,
    action: String,
    subject: String,
    conditional: bool,
    label: String,
}

#[derive(Debug, Serialize, Tabled)]
struct RoleRow {
    name: String,
    label: String,
    permissions: String,
}

pub async fn execute(
    args: &RbacArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let registry = build_registry(&config.rbac)?;

    match &args.command {
        RbacCommand::Seed | RbacCommand::Sync => {
            let policy = if matches!(args.command, RbacCommand::Sync) {
                SeedPolicy::Sync
            } else {
                SeedPolicy::InsertOnly
            };
            let db = super::connect(config).await?;
            let store = PgRbacStore::new(db.pool().clone());
            let report = RbacSeeder::new(&registry, &store).seed(policy).await?;
            db.close().await;

            if report.is_empty() {
                output::print_success("Permissions and roles are up to date.");
            } else {
                output::print_item(&report, format);
                output::print_success(&format!("Seeded with policy '{policy}'."));
            }
        }
        RbacCommand::List => {
            let rows: Vec<PermissionRow> = registry
                .permissions()
                .iter()
                .map(|p| PermissionRow {
                    name: p.name.clone(),
                    action: p.rule.action.to_string(),
                    subject: p.rule.subject.clone(),
                    conditional: p.rule.conditions.is_some(),
                    label: p.label.clone().unwrap_or_default(),
                })
                .collect();
            output::print_list(&rows, format);
        }
        RbacCommand::Roles => {
            let rows: Vec<RoleRow> = registry
                .roles()
                .iter()
                .map(|r| RoleRow {
                    name: r.name.clone(),
                    label: r.label.clone().unwrap_or_default(),
                    permissions: r.permissions.join(", "),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
