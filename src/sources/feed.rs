use std::sync::{Arc, OnceLock};
use std::time::Duration;

use feed_rs::model::Entry;
use feed_rs::parser;
use tracing::{debug, warn};

use crate::domain::{newest_first, FeedUpdate, Update};
use crate::errors::FrontpageResult;
use crate::sources::http::FeedFetcher;
use crate::sources::markup::truncate_html;
use crate::sources::traits::{cutoff, CachedSource, SourceSettings};

/// Full content longer than this many characters gets truncated.
pub const SUMMARY_LENGTH: usize = 1000;

/// Feeds are cheap to fetch and change often.
pub const FEED_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// An RSS, Atom or JSON feed.
pub struct FeedSource {
    settings: SourceSettings,
    feed_url: String,
    poll_interval: Duration,
    fetcher: Arc<dyn FeedFetcher>,
    adopted_title: OnceLock<String>,
}

impl FeedSource {
    pub fn new(settings: SourceSettings, feed_url: &str, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            settings,
            feed_url: feed_url.to_string(),
            poll_interval: FEED_POLL_INTERVAL,
            fetcher,
            adopted_title: OnceLock::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// The configured title, or failing that the one the feed advertised first.
    pub fn title(&self) -> Option<&str> {
        self.settings
            .title
            .as_deref()
            .or_else(|| self.adopted_title.get().map(String::as_str))
    }

    fn to_update(&self, entry: Entry) -> Option<FeedUpdate> {
        let Some(timestamp) = entry.published.or(entry.updated) else {
            debug!(source = self.settings.name(), id = %entry.id, "entry has no date, skipping");
            return None;
        };

        let content = select_content(
            entry.summary.map(|s| s.content),
            entry.content.and_then(|c| c.body),
        );

        Some(FeedUpdate {
            source: self.settings.name().to_string(),
            timestamp,
            title: entry.title.map(|t| t.content),
            link: entry.links.into_iter().next().map(|l| l.href),
            content,
        })
    }
}

/// Pick what to show for an entry: its own summary, else its content cut down to size.
pub fn select_content(summary: Option<String>, body: Option<String>) -> String {
    match (summary, body) {
        (Some(summary), _) => summary,
        (None, Some(body)) => truncate_html(&body, SUMMARY_LENGTH),
        (None, None) => String::new(),
    }
}

impl CachedSource for FeedSource {
    fn kind(&self) -> &'static str {
        "feed"
    }

    fn cache_token(&self) -> &str {
        &self.feed_url
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    fn fetch(&self, limit: usize, max_age: Option<Duration>) -> FrontpageResult<Vec<Update>> {
        // A transport error is a failed fetch: the caller invalidates the cache entry.
        let bytes = self.fetcher.fetch(&self.feed_url)?;

        let parsed = match parser::parse(&bytes[..]) {
            Ok(feed) => feed,
            Err(e) => {
                warn!(source = self.settings.name(), url = %self.feed_url, error = %e, "feed did not parse");
                return Ok(Vec::new());
            }
        };

        if self.settings.title.is_none() {
            if let Some(title) = parsed.title.map(|t| t.content.trim().to_string()) {
                if !title.is_empty() && self.adopted_title.set(title).is_ok() {
                    debug!(source = self.settings.name(), "adopted feed title");
                }
            }
        }

        let oldest = cutoff(max_age);
        let updates: Vec<Update> = parsed
            .entries
            .into_iter()
            .filter_map(|entry| self.to_update(entry))
            .filter(|update| oldest.map_or(true, |oldest| update.timestamp > oldest))
            .map(Update::from)
            .collect();

        debug!(source = self.settings.name(), count = updates.len(), "fetched feed");
        Ok(newest_first(updates, limit))
    }
}
