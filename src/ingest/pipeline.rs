use chrono::Utc;
use chrono_tz::Tz;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;

use super::clock::PassClock;
use crate::feed::{normalize, parse_feed, FetchError, Fetcher, ParseError, RawEntry};
use crate::storage::{Database, DatabaseError};

/// Why a single feed contributed nothing to a pass.
///
/// Never fatal: the feed is skipped and the pass moves on.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Feed contained no entries")]
    Empty,
}

/// Why a whole pass did not complete.
#[derive(Debug, Error)]
pub enum PassError {
    /// Another pass holds the pass lock; this request was coalesced into it.
    #[error("An ingestion pass is already running")]
    Busy,
    /// The store failed; the pass was aborted and not recorded.
    #[error("Ingestion pass aborted: {0}")]
    Store(#[from] DatabaseError),
}

/// Summary of one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Feeds fetched and parsed successfully
    pub feeds_ok: usize,
    /// Feeds skipped because of fetch/parse failures or empty content
    pub feeds_skipped: usize,
    /// New articles stored
    pub inserted: usize,
    /// Entries dropped for lack of a link
    pub dropped_entries: usize,
}

#[derive(Debug, Default)]
struct FeedOutcome {
    inserted: usize,
    dropped: usize,
}

/// Runs fetch → parse → normalize → insert over the configured feeds.
///
/// Passes are serialized by an internal lock: a pass requested while another
/// is running returns [`PassError::Busy`] immediately instead of queueing.
pub struct Ingestor {
    db: Database,
    fetcher: Fetcher,
    feeds: Vec<String>,
    tz: Tz,
    clock: PassClock,
    pass_lock: Mutex<()>,
}

impl Ingestor {
    pub fn new(db: Database, fetcher: Fetcher, feeds: Vec<String>, tz: Tz, clock: PassClock) -> Self {
        Self {
            db,
            fetcher,
            feeds,
            tz,
            clock,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn clock(&self) -> &PassClock {
        &self.clock
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    /// Run one full pass over every configured feed, in configured order.
    ///
    /// Fetch and parse failures skip the affected feed. A store failure aborts
    /// the pass; articles inserted before the failure stay stored. On success
    /// the pass time is recorded in the [`PassClock`].
    pub async fn run_pass(&self) -> Result<PassReport, PassError> {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            tracing::info!("Ingestion pass already in progress, skipping");
            return Err(PassError::Busy);
        };

        let started = Instant::now();
        let mut report = PassReport::default();

        for url in &self.feeds {
            tracing::debug!(feed = %url, "Fetching feed");
            let entries = match self.load_entries(url).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(feed = %url, error = %e, "Skipping feed for this pass");
                    report.feeds_skipped += 1;
                    continue;
                }
            };

            let outcome = self.store_entries(entries).await.inspect_err(|e| {
                tracing::error!(feed = %url, error = %e, "Store failure, aborting ingestion pass");
            })?;

            if outcome.dropped > 0 {
                tracing::warn!(feed = %url, dropped = outcome.dropped, "Entries without a link skipped");
            }
            tracing::debug!(feed = %url, inserted = outcome.inserted, "Feed ingested");

            report.feeds_ok += 1;
            report.inserted += outcome.inserted;
            report.dropped_entries += outcome.dropped;
        }

        let finished = Utc::now();
        self.clock.record(finished);
        tracing::info!(
            feeds_ok = report.feeds_ok,
            feeds_skipped = report.feeds_skipped,
            inserted = report.inserted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            at = %finished.with_timezone(&self.tz).format("%Y-%m-%d %H:%M:%S"),
            "Feeds updated"
        );

        Ok(report)
    }

    async fn load_entries(&self, url: &str) -> Result<Vec<RawEntry>, FeedError> {
        let bytes = self.fetcher.fetch(url).await?;
        let entries = parse_feed(&bytes)?;
        if entries.is_empty() {
            return Err(FeedError::Empty);
        }
        Ok(entries)
    }

    async fn store_entries(&self, entries: Vec<RawEntry>) -> Result<FeedOutcome, DatabaseError> {
        let now = Utc::now();
        let mut outcome = FeedOutcome::default();

        for entry in entries {
            let Some(article) = normalize(entry, now, self.tz) else {
                outcome.dropped += 1;
                continue;
            };
            // Most entries of a polled feed are already stored; a read avoids
            // taking the SQLite write lock for them.
            if self.db.article_exists(&article.link).await? {
                continue;
            }
            if self.db.insert_if_absent(&article).await? {
                outcome.inserted += 1;
            }
        }

        Ok(outcome)
    }
}
