use std::time::Duration;

use crate::domain::{SourceType, Update};
use crate::sources::feed::FeedSource;
use crate::sources::git::GitSource;
use crate::sources::traits::{CachedSource, SourceSettings};
use crate::storage::CacheBackend;

/// A configured origin of front page updates.
///
/// Built once at startup and shared read-only by every request.
pub enum Source {
    Feed(FeedSource),
    Git(GitSource),
}

impl Source {
    /// Updates newer than the effective max age, newest first, at most the effective
    /// limit. Unavailable sources produce an empty list rather than an error.
    pub fn poll(
        &self,
        cache: &dyn CacheBackend,
        global_limit: usize,
        global_max_age: Option<Duration>,
    ) -> Vec<Update> {
        match self {
            Source::Feed(source) => source.poll_cached(cache, global_limit, global_max_age),
            Source::Git(source) => source.poll_cached(cache, global_limit, global_max_age),
        }
    }

    pub fn source_type(&self) -> SourceType {
        match self {
            Source::Feed(_) => SourceType::Feed,
            Source::Git(_) => SourceType::Git,
        }
    }

    pub fn settings(&self) -> &SourceSettings {
        match self {
            Source::Feed(source) => source.settings(),
            Source::Git(source) => source.settings(),
        }
    }

    pub fn name(&self) -> &str {
        self.settings().name()
    }

    /// Display title, falling back to the source name.
    pub fn title(&self) -> &str {
        let title = match self {
            Source::Feed(source) => source.title(),
            Source::Git(source) => source.title(),
        };
        title.unwrap_or_else(|| self.name())
    }

    pub fn icon(&self) -> Option<&str> {
        self.settings().icon.as_deref()
    }

    pub fn link(&self) -> Option<&str> {
        self.settings().link.as_deref()
    }

    pub fn cache_key(&self) -> String {
        match self {
            Source::Feed(source) => source.cache_key(),
            Source::Git(source) => source.cache_key(),
        }
    }
}

impl From<FeedSource> for Source {
    fn from(source: FeedSource) -> Self {
        Source::Feed(source)
    }
}

impl From<GitSource> for Source {
    fn from(source: GitSource) -> Self {
        Source::Git(source)
    }
}
