use std::time::Duration;

use thiserror::Error;

use crate::feed::{parse_published, FeedFetcher, FetchError};
use crate::storage::{Database, DatabaseError, NewPost};

/// Errors that end a polling cycle before any fetch happens.
///
/// Fetch and per-entry failures are not represented here: they are absorbed
/// into [`CycleOutcome`] so the scheduler keeps running through them.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Nothing to claim: the feed table is empty, or every feed was already
    /// fetched within the current staleness window
    #[error("no feeds ready to fetch")]
    NoFeeds,
    /// The store could not be reached or the claim/insert failed outright
    #[error("feed store unavailable: {0}")]
    Store(#[from] DatabaseError),
}

/// What one polling cycle did with its claimed feed.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The feed was fetched and its entries run through dedup insert.
    /// `found` counts entries observed in the document (duplicates
    /// included); `inserted` counts the rows actually committed.
    Ingested {
        feed_name: String,
        found: usize,
        inserted: usize,
    },
    /// The fetch or parse failed. The feed's claim stamp still stands, so
    /// it will not be retried until its next turn in the rotation.
    FetchFailed {
        feed_name: String,
        error: FetchError,
    },
}

/// Run one polling cycle: claim the stalest feed due for fetching, fetch
/// and parse its document, and insert every entry not already ingested.
///
/// `min_age` is the staleness window — feeds fetched more recently than
/// this are not claimable, which is what keeps concurrent pollers off the
/// same feed. The claim stamps `last_fetched_at` before any network I/O,
/// so a slow or hung fetch delays only this feed's next turn and never
/// blocks other feeds from being claimed.
pub async fn run_cycle(
    db: &Database,
    fetcher: &FeedFetcher,
    min_age: Duration,
) -> Result<CycleOutcome, CycleError> {
    let feed = db
        .claim_next_feed(min_age)
        .await?
        .ok_or(CycleError::NoFeeds)?;
    tracing::debug!(feed = %feed.name, url = %feed.url, "claimed feed");

    let document = match fetcher.fetch(&feed.url).await {
        Ok(document) => document,
        Err(error) => {
            return Ok(CycleOutcome::FetchFailed {
                feed_name: feed.name,
                error,
            })
        }
    };

    let found = document.entries.len();
    let mut inserted = 0;
    for entry in document.entries {
        let candidate = NewPost {
            feed_id: feed.id,
            url: entry.link,
            title: entry.title,
            description: entry.description,
            published_at: entry
                .pub_date
                .as_deref()
                .and_then(parse_published)
                .map(|dt| dt.timestamp()),
        };

        match db.insert_post(&candidate).await {
            Ok(Some(_)) => inserted += 1,
            Ok(None) => {} // entry URL already ingested
            Err(error) => {
                // One bad entry never blocks its siblings
                tracing::error!(
                    feed = %feed.name,
                    url = %candidate.url,
                    error = %error,
                    "failed to store post, skipping entry"
                );
            }
        }
    }

    Ok(CycleOutcome::Ingested {
        feed_name: feed.name,
        found,
        inserted,
    })
}
