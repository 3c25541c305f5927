//! Bazaar CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! bazaar-cli migrate
//!
//! # Create a user (password read from BAZAAR_USER_PASSWORD)
//! BAZAAR_USER_PASSWORD=... bazaar-cli user create -u alice -e alice@example.com --staff
//!
//! # Print the catalog relationship table
//! bazaar-cli schema relations --model product
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create users
//! - `schema relations` - Inspect catalog relationships

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Inspect the catalog schema
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,

        /// Grant staff status
        #[arg(long)]
        staff: bool,
    },
}

#[derive(Subcommand)]
enum SchemaAction {
    /// Print the relationships added by the `catalog relations` migration
    Relations {
        /// Only relations declared on or pointing at this table
        #[arg(short, long)]
        model: Option<String>,
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
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                email,
                staff,
            } => {
                commands::user::create(&username, email.as_deref(), staff).await?;
            }
        },
        Commands::Schema { action } => match action {
            SchemaAction::Relations { model } => commands::schema::relations(model.as_deref())?,
        },
    }
    Ok(())
}
