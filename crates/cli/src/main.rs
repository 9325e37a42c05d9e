//! Customer registry CLI - database migrations and inspection tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! registry-cli migrate
//!
//! # Print the change history of a customer
//! registry-cli history 42
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `history` - Show update/delete history for a customer

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(author, version, about = "Customer registry CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Show the change history of a customer
    History {
        /// Customer ID
        customer_id: i32,
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
        Commands::History { customer_id } => commands::history::show(customer_id).await?,
    }
    Ok(())
}
