use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::domain::{newest_first, Update};
use crate::errors::FrontpageResult;
use crate::sources::Source;
use crate::storage::CacheBackend;

/// What one source had to say on one poll.
pub struct SourceUpdates<'a> {
    pub source: &'a Source,
    pub updates: Vec<Update>,
}

/// Entry point for rendering a front page: polls each configured source with the
/// process-wide limit and max age.
pub struct FrontpageService {
    sources: Vec<Source>,
    cache: Arc<dyn CacheBackend>,
    limit: usize,
    max_age: Option<Duration>,
}

impl FrontpageService {
    pub fn new(
        sources: Vec<Source>,
        cache: Arc<dyn CacheBackend>,
        limit: usize,
        max_age: Option<Duration>,
    ) -> Self {
        Self {
            sources,
            cache,
            limit,
            max_age,
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn find(&self, name: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.name() == name)
    }

    pub fn poll_source<'a>(&self, source: &'a Source) -> SourceUpdates<'a> {
        let updates = source.poll(self.cache.as_ref(), self.limit, self.max_age);
        debug!(source = source.name(), count = updates.len(), "polled source");
        SourceUpdates { source, updates }
    }

    /// Poll every source, in configuration order.
    pub fn poll_all(&self) -> Vec<SourceUpdates<'_>> {
        self.sources.iter().map(|s| self.poll_source(s)).collect()
    }

    /// Updates from all sources interleaved, newest first, bounded by the global limit.
    pub fn latest(&self) -> Vec<Update> {
        let all = self
            .poll_all()
            .into_iter()
            .flat_map(|polled| polled.updates)
            .collect();
        newest_first(all, self.limit)
    }

    pub fn clear_cache(&self) -> FrontpageResult<()> {
        self.cache.clear()
    }
}
