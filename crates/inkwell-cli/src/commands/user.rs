//! User management CLI commands.

use clap::{Args, Subcommand};

use inkwell_auth::password::PasswordHasher;
use inkwell_core::config::AppConfig;
use inkwell_core::error::AppError;
use inkwell_database::repositories::{RoleRepository, UserRepository};
use inkwell_service::{NewAccount, UserService};

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create an account
    Create {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
        /// Extra role by name; repeatable
        #[arg(short, long = "role")]
        roles: Vec<String>,
        /// Mark the account as the founding account
        #[arg(long)]
        creator: bool,
    },
}

pub async fn execute(
    args: &UserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let db = super::connect(config).await?;
    let service = UserService::new(
        UserRepository::new(db.pool().clone()),
        RoleRepository::new(db.pool().clone()),
        PasswordHasher::new(),
        config.rbac.default_user_role.clone(),
    );

    match &args.command {
        UserCommand::Create {
            username,
            password,
            email,
            nickname,
            roles,
            creator,
        } => {
            let user = service
                .register(NewAccount {
                    username: username.clone(),
                    password: password.clone(),
                    nickname: nickname.clone(),
                    email: email.clone(),
                    roles: roles.clone(),
                    is_creator: *creator,
                })
                .await?;
            output::print_item(&user, format);
            output::print_success(&format!("User '{}' created.", user.username));
        }
    }

    db.close().await;
    Ok(())
}
