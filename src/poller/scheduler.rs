//! Interval-driven scheduler for the ingestion pipeline.
//!
//! One batch of worker tasks runs per tick; each worker independently
//! claims and ingests a single feed, so the worker count bounds fetch
//! concurrency while the claim ordering keeps the rotation fair.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::pipeline::{run_cycle, CycleError, CycleOutcome};
use crate::feed::FeedFetcher;
use crate::storage::Database;

pub struct Scheduler {
    interval: Duration,
    workers: usize,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            workers: 1,
        }
    }

    /// Set the number of feeds claimed and ingested per tick.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Run the polling loop until `shutdown` flips to true or the store
    /// becomes unavailable.
    ///
    /// The first batch runs immediately; subsequent batches wait for the
    /// interval. An in-flight batch is allowed to finish on shutdown —
    /// partial ingestion is idempotent, so stopping between batches is the
    /// only coordination needed.
    pub async fn run(
        &self,
        db: Database,
        fetcher: FeedFetcher,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), CycleError> {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            workers = self.workers,
            "poller started"
        );

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {}
                changed = shutdown.changed() => {
                    // A dropped sender means nobody can ask us to stop
                    // later; treat it the same as an explicit stop.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("poller stopping");
                        return Ok(());
                    }
                    continue;
                }
            }

            self.run_batch(&db, &fetcher).await?;

            if *shutdown.borrow() {
                info!("poller stopping");
                return Ok(());
            }
        }
    }

    /// Spawn one worker per slot and collect every report before the next
    /// tick is considered.
    async fn run_batch(&self, db: &Database, fetcher: &FeedFetcher) -> Result<(), CycleError> {
        let (report_tx, mut report_rx) = mpsc::channel(self.workers);

        // The polling interval doubles as the claim staleness window: a
        // feed fetched within the last interval is not due again.
        let min_age = self.interval;
        for _ in 0..self.workers {
            let db = db.clone();
            let fetcher = fetcher.clone();
            let report_tx = report_tx.clone();
            tokio::spawn(async move {
                let report = run_cycle(&db, &fetcher, min_age).await;
                let _ = report_tx.send(report).await;
            });
        }
        drop(report_tx);

        while let Some(report) = report_rx.recv().await {
            match report {
                Ok(CycleOutcome::Ingested {
                    feed_name,
                    found,
                    inserted,
                }) => {
                    info!(feed = %feed_name, found, inserted, "feed collected");
                }
                Ok(CycleOutcome::FetchFailed { feed_name, error }) => {
                    warn!(feed = %feed_name, error = %error, "fetch failed, feed skipped until its next turn");
                }
                Err(CycleError::NoFeeds) => {
                    // Nothing registered or nothing due: back off to the
                    // next tick rather than terminating the loop.
                    warn!("no feeds ready to fetch, waiting for next tick");
                }
                Err(store_error @ CycleError::Store(_)) => return Err(store_error),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Blog</title>
    <description>d</description>
    <item><title>One</title><link>https://example.com/one</link></item>
</channel></rss>"#;

    #[tokio::test]
    async fn test_first_batch_runs_immediately_and_shutdown_stops_loop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&server)
            .await;

        let db = Database::open(":memory:").await.unwrap();
        let user = db.create_user("ana").await.unwrap();
        let feed = db
            .create_feed("Blog", &format!("{}/feed", server.uri()), user.id)
            .await
            .unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Scheduler::new(Duration::from_secs(3600));
        let handle = {
            let db = db.clone();
            tokio::spawn(async move {
                scheduler
                    .run(db, FeedFetcher::new().unwrap(), shutdown_rx)
                    .await
            })
        };

        // The first batch runs without waiting for the hour-long interval
        let mut ingested = false;
        for _ in 0..100 {
            if !db.posts_for_feed(feed.id).await.unwrap().is_empty() {
                ingested = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(ingested, "first batch should run immediately");

        shutdown_tx.send(true).unwrap();
        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_empty_feed_set_does_not_stop_the_loop() {
        let db = Database::open(":memory:").await.unwrap();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Scheduler::new(Duration::from_millis(10)).with_workers(2);
        let handle = {
            let db = db.clone();
            tokio::spawn(async move {
                scheduler
                    .run(db, FeedFetcher::new().unwrap(), shutdown_rx)
                    .await
            })
        };

        // Several empty ticks elapse; the loop must still be alive
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        shutdown_tx.send(true).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
