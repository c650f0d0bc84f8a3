//! CLI command handlers.
//!
//! Every handler receives an explicit [`Context`] owned by the process
//! entry point — there is no ambient global state. Handlers that act on
//! behalf of "the current user" resolve it through [`Context::current_user`],
//! which fails when nobody is logged in.

use anyhow::{bail, Context as _, Result};
use std::path::PathBuf;

use crate::config::{parse_interval, Config};
use crate::feed::FeedFetcher;
use crate::poller::Scheduler;
use crate::storage::{Database, User};

/// Everything a command needs: the database handle, the loaded config, and
/// where to write the config back when `register`/`login` change it.
pub struct Context {
    pub db: Database,
    pub config: Config,
    pub config_path: PathBuf,
}

impl Context {
    /// Resolve the logged-in user, failing if there is none or the config
    /// points at a user that no longer exists.
    pub async fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user
            .as_deref()
            .context("not logged in: run `trawl login <name>` first")?;
        self.db
            .get_user_by_name(name)
            .await?
            .with_context(|| format!("logged-in user {name:?} no longer exists"))
    }

    fn set_current_user(&mut self, name: &str) -> Result<()> {
        self.config.current_user = Some(name.to_string());
        self.config
            .save(&self.config_path)
            .context("failed to save config")
    }
}

pub async fn register(ctx: &mut Context, name: &str) -> Result<()> {
    if ctx.db.get_user_by_name(name).await?.is_some() {
        bail!("user {name:?} already exists");
    }

    let user = ctx.db.create_user(name).await?;
    ctx.set_current_user(&user.name)?;
    println!("User {} created and logged in", user.name);
    Ok(())
}

pub async fn login(ctx: &mut Context, name: &str) -> Result<()> {
    let Some(user) = ctx.db.get_user_by_name(name).await? else {
        bail!("user {name:?} not found");
    };

    ctx.set_current_user(&user.name)?;
    println!("Logged in as {}", user.name);
    Ok(())
}

pub async fn users(ctx: &Context) -> Result<()> {
    let current = ctx.config.current_user.as_deref();
    for user in ctx.db.list_users().await? {
        if current == Some(user.name.as_str()) {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}

pub async fn reset(ctx: &mut Context) -> Result<()> {
    let removed = ctx.db.reset_users().await?;
    ctx.config.current_user = None;
    ctx.config
        .save(&ctx.config_path)
        .context("failed to save config")?;
    println!("Removed {removed} user(s) and all their data");
    Ok(())
}

pub async fn add_feed(ctx: &Context, name: &str, url: &str) -> Result<()> {
    let user = ctx.current_user().await?;

    if ctx.db.get_feed_by_url(url).await?.is_some() {
        bail!("feed {url:?} is already registered");
    }

    let feed = ctx.db.create_feed(name, url, user.id).await?;
    ctx.db.create_follow(user.id, feed.id).await?;
    println!("Feed {} registered and followed", feed.name);
    Ok(())
}

pub async fn feeds(ctx: &Context) -> Result<()> {
    for feed in ctx.db.list_feeds_with_creators().await? {
        println!("{} ({}) added by {}", feed.name, feed.url, feed.creator);
    }
    Ok(())
}

pub async fn follow(ctx: &Context, url: &str) -> Result<()> {
    let user = ctx.current_user().await?;
    let Some(feed) = ctx.db.get_feed_by_url(url).await? else {
        bail!("no feed registered for {url:?}");
    };

    if ctx.db.create_follow(user.id, feed.id).await? {
        println!("{} now follows {}", user.name, feed.name);
    } else {
        println!("{} already follows {}", user.name, feed.name);
    }
    Ok(())
}

pub async fn following(ctx: &Context) -> Result<()> {
    let user = ctx.current_user().await?;
    for name in ctx.db.follows_for_user(user.id).await? {
        println!("* {name}");
    }
    Ok(())
}

pub async fn unfollow(ctx: &Context, url: &str) -> Result<()> {
    let user = ctx.current_user().await?;
    let Some(feed) = ctx.db.get_feed_by_url(url).await? else {
        bail!("no feed registered for {url:?}");
    };

    if ctx.db.delete_follow(user.id, feed.id).await? {
        println!("{} unfollowed {}", user.name, feed.name);
    } else {
        println!("{} was not following {}", user.name, feed.name);
    }
    Ok(())
}

pub async fn browse(ctx: &Context, limit: i64) -> Result<()> {
    let user = ctx.current_user().await?;
    for post in ctx.db.posts_for_user(user.id, limit).await? {
        println!("{}", post.title);
        println!("  {}", post.url);
        if let Some(description) = &post.description {
            println!("  {description}");
        }
        println!();
    }
    Ok(())
}

/// Run the poller until ctrl-c.
pub async fn aggregate(ctx: &Context, interval: &str, workers: usize) -> Result<()> {
    let period = parse_interval(interval)?;
    println!("Collecting feeds every {interval}");

    let fetcher = FeedFetcher::new()?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    Scheduler::new(period)
        .with_workers(workers)
        .run(ctx.db.clone(), fetcher, shutdown_rx)
        .await
        .context("poller stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU64, Ordering};

    static CTX_COUNTER: AtomicU64 = AtomicU64::new(0);

    async fn test_ctx() -> Context {
        let dir = std::env::temp_dir().join(format!(
            "trawl_commands_test_{}_{}",
            std::process::id(),
            CTX_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Context {
            db: Database::open(":memory:").await.unwrap(),
            config: Config::default(),
            config_path: dir.join("config.toml"),
        }
    }

    #[tokio::test]
    async fn test_register_logs_in_and_persists_config() {
        let mut ctx = test_ctx().await;

        register(&mut ctx, "ana").await.unwrap();
        assert_eq!(ctx.config.current_user.as_deref(), Some("ana"));

        let saved = Config::load(&ctx.config_path).unwrap();
        assert_eq!(saved.current_user.as_deref(), Some("ana"));
    }

    #[tokio::test]
    async fn test_register_duplicate_fails() {
        let mut ctx = test_ctx().await;

        register(&mut ctx, "ana").await.unwrap();
        assert!(register(&mut ctx, "ana").await.is_err());
    }

    #[tokio::test]
    async fn test_login_unknown_user_fails() {
        let mut ctx = test_ctx().await;
        assert!(login(&mut ctx, "ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_current_user_requires_login() {
        let ctx = test_ctx().await;
        assert!(ctx.current_user().await.is_err());
    }

    #[tokio::test]
    async fn test_add_feed_requires_login_and_auto_follows() {
        let mut ctx = test_ctx().await;

        assert!(add_feed(&ctx, "Blog", "https://example.com/rss")
            .await
            .is_err());

        register(&mut ctx, "ana").await.unwrap();
        add_feed(&ctx, "Blog", "https://example.com/rss")
            .await
            .unwrap();

        let user = ctx.current_user().await.unwrap();
        assert_eq!(ctx.db.follows_for_user(user.id).await.unwrap(), ["Blog"]);

        // Same URL cannot be registered twice
        assert!(add_feed(&ctx, "Again", "https://example.com/rss")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_aggregate_rejects_bad_interval() {
        let ctx = test_ctx().await;
        assert!(aggregate(&ctx, "soon", 1).await.is_err());
        assert!(aggregate(&ctx, "0s", 1).await.is_err());
    }
}
