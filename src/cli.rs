//! CLI command implementations.
//!
//! Administrative operations against the SQL store plus config checks:
//!
//! ```bash
//! # Initialize database schema
//! fingate init -d sqlite://fingate.db
//!
//! # Show a user document
//! fingate user -d sqlite://fingate.db -u user-1
//!
//! # Show a user's consent audit trail
//! fingate history -d sqlite://fingate.db -u user-1 -n 20
//!
//! # Validate a configuration file
//! fingate check-config -c fingate.toml
//! ```

use clap::{Parser, Subcommand};
use fingate_config::{load_config, validate_config};
use fingate_store::{ConsentStore, SqlStore, SqlStoreConfig, UserStore};
use tabled::{Table, Tabled};

/// Fingate administrative CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "fingate",
    version,
    about = "Consent and entitlement administration",
    propagate_version = true
)]
pub struct Cli {
    /// Log level filter (overrides RUST_LOG).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize database schema.
    Init {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,
    },

    /// Show a user document.
    User {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// User ID to show.
        #[arg(short, long)]
        user_id: String,

        /// Output format (table, json).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show a user's consent change history.
    History {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,

        /// User ID to show.
        #[arg(short, long)]
        user_id: String,

        /// Maximum number of entries.
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// List all known user IDs.
    Users {
        /// Database connection URL.
        #[arg(short, long, env = "DATABASE_URL")]
        database: String,
    },

    /// Load and validate a configuration file.
    CheckConfig {
        /// Path to the configuration file.
        #[arg(short, long)]
        config: String,
    },
}

/// Favorite row for display.
#[derive(Tabled)]
struct FavoriteDisplay {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Daily Updates")]
    daily_updates: String,
}

/// Change-log row for display.
#[derive(Tabled)]
struct HistoryDisplay {
    #[tabled(rename = "Revision")]
    revision: u64,
    #[tabled(rename = "Analytics")]
    analytics: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init { database } => init_schema(&database).await,
        Commands::User {
            database,
            user_id,
            format,
        } => show_user(&database, &user_id, &format).await,
        Commands::History {
            database,
            user_id,
            limit,
        } => show_history(&database, &user_id, limit).await,
        Commands::Users { database } => list_users(&database).await,
        Commands::CheckConfig { config } => check_config(&config),
    }
}

async fn connect(url: &str) -> Result<SqlStore, Box<dyn std::error::Error>> {
    let store = SqlStore::connect(SqlStoreConfig::new(url).max_connections(1)).await?;
    Ok(store)
}

async fn init_schema(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    store.init_schema().await?;
    println!("Database schema initialized successfully.");
    Ok(())
}

async fn show_user(
    url: &str,
    user_id: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    let Some(record) = store.user(user_id).await? else {
        println!("User {user_id} not found.");
        return Ok(());
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&record)?),
        _ => {
            println!("User:     {}", record.user_id);
            println!("Email:    {}", record.email.as_deref().unwrap_or("-"));
            println!("Customer: {}", record.customer_id.as_deref().unwrap_or("-"));
            println!(
                "Tier:     {} ({})",
                record.subscription.tier, record.subscription.status
            );
            if record.favorite_tickers.is_empty() {
                println!("No favorites.");
            } else {
                let rows: Vec<FavoriteDisplay> = record
                    .favorite_tickers
                    .iter()
                    .map(|t| FavoriteDisplay {
                        symbol: t.symbol.clone(),
                        daily_updates: if t.daily_updates { "yes" } else { "no" }.to_string(),
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }
    }
    Ok(())
}

async fn show_history(
    url: &str,
    user_id: &str,
    limit: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    let entries = store.change_history(user_id, limit).await?;
    if entries.is_empty() {
        println!("No consent history for {user_id}.");
        return Ok(());
    }

    let rows: Vec<HistoryDisplay> = entries
        .iter()
        .map(|e| HistoryDisplay {
            revision: e.revision,
            analytics: format!(
                "{} -> {}",
                e.previous_preferences.analytics, e.new_preferences.analytics
            ),
            source: e.source.to_string(),
            timestamp: e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

async fn list_users(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect(url).await?;
    let ids = store.user_ids().await?;
    if ids.is_empty() {
        println!("No users.");
    } else {
        for id in ids {
            println!("{id}");
        }
    }
    Ok(())
}

fn check_config(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    validate_config(&config)?;
    println!(
        "Config OK: {} price mappings, history limit {}.",
        config.billing.tier_prices.len(),
        config.consent.history_limit
    );
    Ok(())
}
