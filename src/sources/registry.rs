use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::config::{Config, SourceConfig};
use crate::domain::SourceType;
use crate::errors::{FrontpageError, FrontpageResult};
use crate::sources::feed::FeedSource;
use crate::sources::git::{GitSource, LinkTargets, Repository};
use crate::sources::http::{FeedFetcher, HttpFeedFetcher};
use crate::sources::source::Source;
use crate::sources::traits::SourceSettings;
use crate::sources::vcs::{GitCli, GitCommands};

/// Turns configuration into the fixed set of sources served for the life of the process.
pub struct SourceRegistry {
    fetcher: Arc<dyn FeedFetcher>,
    git: Arc<dyn GitCommands>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::with_backends(Arc::new(HttpFeedFetcher::new()), Arc::new(GitCli::new()))
    }

    pub fn with_backends(fetcher: Arc<dyn FeedFetcher>, git: Arc<dyn GitCommands>) -> Self {
        Self { fetcher, git }
    }

    /// Build every configured source. Any bad source fails the whole set.
    pub fn build(&self, config: &Config) -> FrontpageResult<Vec<Source>> {
        let mut sources = Vec::with_capacity(config.sources.len());

        for (name, source_config) in &config.sources {
            let source = self.build_source(name, source_config, config)?;
            info!(source = %name, kind = %source.source_type(), "configured source");
            sources.push(source);
        }

        Ok(sources)
    }

    fn build_source(
        &self,
        name: &str,
        source_config: &SourceConfig,
        config: &Config,
    ) -> FrontpageResult<Source> {
        let settings = SourceSettings::new(name, source_config.limit.unwrap_or(config.limit))?
            .with_title(source_config.title.clone())
            .with_icon(source_config.icon.clone())
            .with_link(source_config.link.clone())
            .with_max_age(source_config.max_age.or(config.max_age).map(std::time::Duration::from_secs));

        match source_config.kind(name)? {
            SourceType::Feed => {
                let feed_url = source_config
                    .feed_url
                    .as_deref()
                    .ok_or_else(|| FrontpageError::invalid_source(name, "feed_url is required"))?;
                validate_url(name, "feed_url", feed_url)?;

                let mut source = FeedSource::new(settings, feed_url, self.fetcher.clone());
                if let Some(interval) = source_config.poll_interval() {
                    source = source.with_poll_interval(interval);
                }
                Ok(source.into())
            }
            SourceType::Git => {
                let labels = source_config.labels(name)?;
                let repositories = source_config
                    .repositories
                    .iter()
                    .zip(&labels)
                    .map(|(path, label)| Repository::new(path, label))
                    .collect();

                for (key, value) in [
                    ("code_host_url", &source_config.code_host_url),
                    ("gitweb_url", &source_config.gitweb_url),
                ] {
                    if let Some(url) = value {
                        validate_url(name, key, url)?;
                    }
                }

                let links = LinkTargets {
                    issue_tracker_url_template: source_config.issue_tracker_url_template.clone(),
                    code_host_url: source_config.code_host_url.clone(),
                    gitweb_url: source_config.gitweb_url.clone(),
                };

                let mut source = GitSource::new(settings, repositories, self.git.clone())?
                    .with_links(links)
                    .with_tag_pattern(source_config.tag_filter_pattern.clone());
                if let Some(interval) = source_config.poll_interval() {
                    source = source.with_poll_interval(interval);
                }
                Ok(source.into())
            }
        }
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_url(name: &str, key: &str, value: &str) -> FrontpageResult<()> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| FrontpageError::invalid_source(name, format!("{} is not a valid URL: {}", key, e)))
}
