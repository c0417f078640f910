//! Badge registry CLI - database migrations and allow-list management.
//!
//! # Usage
//!
//! ```bash
//! # Run registry and session store migrations
//! badge-cli migrate
//!
//! # Allow an email, optionally with a default country
//! badge-cli allowlist add -e person@example.com -c Norway
//!
//! # Revoke access
//! badge-cli allowlist deactivate -e person@example.com
//!
//! # Show the allow-list
//! badge-cli allowlist list
//!
//! # Delete used and expired login links
//! badge-cli links prune
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "badge-cli")]
#[command(author, version, about = "Badge registry CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the allow-list
    Allowlist {
        #[command(subcommand)]
        action: AllowlistAction,
    },
    /// Manage login links
    Links {
        #[command(subcommand)]
        action: LinksAction,
    },
}

#[derive(Subcommand)]
enum AllowlistAction {
    /// Allow an email address (reactivates a deactivated one)
    Add {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Country prefilled on the registration form
        #[arg(short, long)]
        country: Option<String>,
    },
    /// Revoke an email address
    Deactivate {
        /// Email address
        #[arg(short, long)]
        email: String,
    },
    /// List all entries
    List,
}

#[derive(Subcommand)]
enum LinksAction {
    /// Delete used and expired login links
    Prune,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Allowlist { action } => match action {
            AllowlistAction::Add { email, country } => {
                commands::allowlist::add(&email, country.as_deref()).await?;
            }
            AllowlistAction::Deactivate { email } => {
                commands::allowlist::deactivate(&email).await?;
            }
            AllowlistAction::List => commands::allowlist::list().await?,
        },
        Commands::Links { action } => match action {
            LinksAction::Prune => commands::links::prune().await?,
        },
    }
    Ok(())
}
