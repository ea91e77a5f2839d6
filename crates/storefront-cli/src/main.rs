//! Storefront CLI - Administrative commands
//!
//! Usage:
//!   storefront create-db
//!   storefront drop-db --yes
//!   storefront create-admin --email <email> --password <password>

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use storefront_api::auth::{AuthError, AuthService, SystemClock};
use storefront_core::{AppConfig, PgStore, Stores, UserRole};

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront database and account administration")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every table that does not exist yet
    CreateDb,
    /// Drop every table and its data
    DropDb {
        /// Confirm the drop
        #[arg(long)]
        yes: bool,
    },
    /// Create an account with the admin role
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path.clone())?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;

    match cli.command {
        Commands::CreateDb => {
            store.create_schema().await?;
            println!("Database tables created");
        }
        Commands::DropDb { yes } => {
            if !yes {
                bail!("refusing to drop tables without --yes");
            }
            store.drop_schema().await?;
            println!("Database tables dropped");
        }
        Commands::CreateAdmin { email, password } => {
            config.validate()?;
            store.create_schema().await?;

            let stores = Stores::from_backend(Arc::new(store));
            let auth = AuthService::new(
                stores.users,
                stores.ledger,
                &config.auth,
                Arc::new(SystemClock),
            );

            match auth
                .register_with_role(&email, &password, UserRole::Admin)
                .await
            {
                Ok(registration) => {
                    tracing::info!(user_id = %registration.user_id, "admin created");
                    println!("Admin {email} created ({})", registration.user_id);
                }
                Err(AuthError::AlreadyExists) => bail!("a user with email {email} already exists"),
                Err(e) => return Err(e).context("failed to create admin"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_admin() {
        let cli = Cli::try_parse_from([
            "storefront",
            "create-admin",
            "--email",
            "admin@shop.test",
            "--password",
            "secret",
        ])
        .unwrap();

        match cli.command {
            Commands::CreateAdmin { email, password } => {
                assert_eq!(email, "admin@shop.test");
                assert_eq!(password, "secret");
            }
            _ => panic!("expected create-admin"),
        }
    }

    #[test]
    fn test_parse_drop_db_defaults_to_unconfirmed() {
        let cli = Cli::try_parse_from(["storefront", "drop-db"]).unwrap();
        assert!(matches!(cli.command, Commands::DropDb { yes: false }));

        let cli = Cli::try_parse_from(["storefront", "--config", "app.toml", "create-db"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("app.toml")));
    }
}
