use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use trawl::commands::{self, Context};
use trawl::config::Config;
use trawl::storage::Database;

/// Get the config directory path (~/.config/trawl/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("trawl"))
}

#[derive(Parser, Debug)]
#[command(name = "trawl", about = "RSS aggregator that polls registered feeds and stores new posts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a user and log in as them
    Register { name: String },
    /// Switch the current user
    Login { name: String },
    /// List all users
    Users,
    /// Delete all users and their feeds, follows, and posts
    Reset,
    /// Register a feed and follow it (requires login)
    Addfeed { name: String, url: String },
    /// List all registered feeds with their creators
    Feeds,
    /// Follow an already-registered feed (requires login)
    Follow { url: String },
    /// List the feeds the current user follows
    Following,
    /// Stop following a feed (requires login)
    Unfollow { url: String },
    /// Show recent posts from followed feeds
    Browse {
        #[arg(default_value_t = 2)]
        limit: i64,
    },
    /// Poll feeds on an interval (e.g. "30s", "1m") until ctrl-c
    Agg {
        interval: String,
        /// Feeds claimed and fetched concurrently per tick
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_dir = get_config_dir()?;
    std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

    let config_path = config_dir.join("config.toml");
    let config = Config::load(&config_path)?;

    let db_path = config
        .db_path
        .clone()
        .unwrap_or_else(|| config_dir.join("trawl.db").to_string_lossy().into_owned());
    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {db_path}"))?;

    let mut ctx = Context {
        db,
        config,
        config_path,
    };

    match &cli.command {
        Command::Register { name } => commands::register(&mut ctx, name).await,
        Command::Login { name } => commands::login(&mut ctx, name).await,
        Command::Users => commands::users(&ctx).await,
        Command::Reset => commands::reset(&mut ctx).await,
        Command::Addfeed { name, url } => commands::add_feed(&ctx, name, url).await,
        Command::Feeds => commands::feeds(&ctx).await,
        Command::Follow { url } => commands::follow(&ctx, url).await,
        Command::Following => commands::following(&ctx).await,
        Command::Unfollow { url } => commands::unfollow(&ctx, url).await,
        Command::Browse { limit } => commands::browse(&ctx, *limit).await,
        Command::Agg { interval, workers } => commands::aggregate(&ctx, interval, *workers).await,
    }
}
