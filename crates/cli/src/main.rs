//! Storeloom CLI - Database migrations and credit administration.
//!
//! # Usage
//!
//! ```bash
//! # Run platform database migrations
//! storeloom-cli migrate
//!
//! # Show an account's balance (creates the record at 100 if absent)
//! storeloom-cli credits show acct_123
//!
//! # Grant credits to an account
//! storeloom-cli credits grant acct_123 50
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `credits show` / `credits grant` - Inspect and top up balances

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "storeloom-cli")]
#[command(author, version, about = "Storeloom operations CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect or grant account credits
    Credits {
        #[command(subcommand)]
        action: CreditsAction,
    },
}

#[derive(Subcommand)]
enum CreditsAction {
    /// Show an account's balance
    Show {
        /// Account ID from the identity provider
        account: String,
    },
    /// Add credits to an account
    Grant {
        /// Account ID from the identity provider
        account: String,

        /// Number of credits to add (must be positive)
        amount: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Credits { action } => match action {
            CreditsAction::Show { account } => commands::credits::show(&account).await?,
            CreditsAction::Grant { account, amount } => {
                commands::credits::grant(&account, amount).await?;
            }
        },
    }
    Ok(())
}
