//! Rhema CLI - database migrations and staff role management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! rhema-cli migrate
//!
//! # Give a user back-office access
//! rhema-cli admin grant -e secretaria@example.com -r secretary
//!
//! # Remove back-office access
//! rhema-cli admin revoke -e secretaria@example.com
//!
//! # List staff
//! rhema-cli admin list
//! ```
//!
//! Every command reads `DATABASE_URL` (or a `.env` file).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rhema-cli")]
#[command(author, version, about = "Rhema bookstore CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage back-office roles
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Set the role of an existing profile
    Grant {
        /// Profile email address
        #[arg(short, long)]
        email: String,

        /// Role (`admin`, `secretary`)
        #[arg(short, long, default_value = "secretary")]
        role: String,
    },
    /// Demote a profile back to `customer`
    Revoke {
        #[arg(short, long)]
        email: String,
    },
    /// List profiles with back-office access
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { email, role } => {
                commands::admin::grant(&email, &role).await?;
            }
            AdminAction::Revoke { email } => commands::admin::revoke(&email).await?,
            AdminAction::List => commands::admin::list().await?,
        },
    }
    Ok(())
}
