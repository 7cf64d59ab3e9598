use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{newest_first, Update};
use crate::errors::{FrontpageError, FrontpageResult};
use crate::storage::{CacheBackend, CacheRegion};

/// Cache namespace shared by every front page source.
pub const CACHE_REGION: &str = "frontpage";

/// Settings every source carries regardless of kind.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    name: String,
    limit: usize,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub link: Option<String>,
    pub max_age: Option<Duration>,
}

impl SourceSettings {
    pub fn new(name: &str, limit: usize) -> FrontpageResult<Self> {
        if limit == 0 {
            return Err(FrontpageError::invalid_source(
                name,
                "limit must be a positive integer",
            ));
        }

        Ok(Self {
            name: name.to_string(),
            limit,
            title: None,
            icon: None,
            link: None,
            max_age: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }
}

/// Smallest limit wins.
pub fn effective_limit(own: usize, global: usize) -> usize {
    own.min(global)
}

/// The more permissive age wins; `None` means unconstrained and beats any duration.
pub fn effective_max_age(own: Option<Duration>, global: Option<Duration>) -> Option<Duration> {
    match (own, global) {
        (Some(own), Some(global)) => Some(own.max(global)),
        _ => None,
    }
}

/// Oldest timestamp still allowed through, if any.
pub fn cutoff(max_age: Option<Duration>) -> Option<DateTime<Utc>> {
    max_age
        .and_then(|age| chrono::Duration::from_std(age).ok())
        .and_then(|age| Utc::now().checked_sub_signed(age))
}

/// A source whose fetched updates are kept in a cache region until its poll
/// interval elapses.
pub trait CachedSource {
    /// Prefix distinguishing concrete source kinds in cache keys.
    fn kind(&self) -> &'static str;

    /// Identity of this particular source within its kind.
    fn cache_token(&self) -> &str;

    fn poll_interval(&self) -> Duration;

    fn settings(&self) -> &SourceSettings;

    /// Go to the origin. Any error is treated as a failed fetch and never cached.
    fn fetch(&self, limit: usize, max_age: Option<Duration>) -> FrontpageResult<Vec<Update>>;

    fn cache_key(&self) -> String {
        format!("{}:{}", self.kind(), self.cache_token())
    }

    fn poll_cached(
        &self,
        cache: &dyn CacheBackend,
        global_limit: usize,
        global_max_age: Option<Duration>,
    ) -> Vec<Update> {
        let settings = self.settings();
        let limit = effective_limit(settings.limit(), global_limit);
        let max_age = effective_max_age(settings.max_age, global_max_age);

        let region = CacheRegion::new(cache, CACHE_REGION, self.poll_interval());
        let updates = region.get_or_compute(&self.cache_key(), || {
            match self.fetch(limit, max_age) {
                Ok(updates) => Some(updates),
                Err(e) => {
                    warn!(source = settings.name(), error = %e, "fetch failed");
                    None
                }
            }
        });

        // Cached lists may have been built for a looser limit or have aged since.
        let oldest = cutoff(max_age);
        let fresh = updates
            .into_iter()
            .filter(|update| oldest.map_or(true, |oldest| update.timestamp() >= oldest))
            .collect();
        newest_first(fresh, limit)
    }
}
