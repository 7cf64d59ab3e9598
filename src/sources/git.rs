use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::{Captures, Regex};
use tracing::debug;

use crate::domain::{Commit, RepoUpdate, Update};
use crate::errors::{FrontpageError, FrontpageResult};
use crate::sources::traits::{cutoff, CachedSource, SourceSettings};
use crate::sources::vcs::{GitCommands, RawCommit};

/// Release history only changes when someone tags, so poll rarely.
pub const GIT_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);

fn issue_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#(\d+)").expect("issue reference pattern is valid"))
}

/// Escape the characters that matter inside element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub path: String,
    pub label: String,
}

impl Repository {
    pub fn new(path: &str, label: &str) -> Self {
        Self {
            path: path.to_string(),
            label: label.to_string(),
        }
    }
}

/// Where commit and issue links point.
#[derive(Debug, Clone, Default)]
pub struct LinkTargets {
    /// Format string with `{0}` standing in for the issue number.
    pub issue_tracker_url_template: Option<String>,
    /// Base URL of a GitHub-style host; repositories live at `<base>/<label>`.
    pub code_host_url: Option<String>,
    pub gitweb_url: Option<String>,
}

impl LinkTargets {
    pub fn issue_url(&self, label: &str, number: &str) -> Option<String> {
        if let Some(template) = &self.issue_tracker_url_template {
            return Some(template.replace("{0}", number));
        }
        self.code_host_url.as_ref().map(|base| {
            format!("{}/{}/issues/{}", base.trim_end_matches('/'), label, number)
        })
    }

    pub fn commit_url(&self, label: &str, hash: &str) -> Option<String> {
        if let Some(base) = &self.code_host_url {
            return Some(format!(
                "{}/{}/commit/{}",
                base.trim_end_matches('/'),
                label,
                hash
            ));
        }
        self.gitweb_url
            .as_ref()
            .map(|base| format!("{}?p={}.git;a=commit;h={}", base, label, hash))
    }

    /// Escape `subject` and turn `#123` references into issue links.
    pub fn linkify_subject(&self, subject: &str, label: &str) -> String {
        let escaped = escape_html(subject);
        if self.issue_tracker_url_template.is_none() && self.code_host_url.is_none() {
            return escaped;
        }

        issue_reference()
            .replace_all(&escaped, |caps: &Captures| {
                match self.issue_url(label, &caps[1]) {
                    Some(url) => format!(r#"<a href="{}">{}</a>"#, escape_html(&url), &caps[0]),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// One or more repositories sharing a tag namespace. Every pair of consecutive tags
/// on the primary repository is one update.
pub struct GitSource {
    settings: SourceSettings,
    repositories: Vec<Repository>,
    links: LinkTargets,
    tag_pattern: Option<String>,
    poll_interval: Duration,
    git: Arc<dyn GitCommands>,
}

impl GitSource {
    pub fn new(
        settings: SourceSettings,
        repositories: Vec<Repository>,
        git: Arc<dyn GitCommands>,
    ) -> FrontpageResult<Self> {
        if repositories.is_empty() {
            return Err(FrontpageError::invalid_source(
                settings.name(),
                "at least one repository is required",
            ));
        }

        Ok(Self {
            settings,
            repositories,
            links: LinkTargets::default(),
            tag_pattern: None,
            poll_interval: GIT_POLL_INTERVAL,
            git,
        })
    }

    pub fn with_links(mut self, links: LinkTargets) -> Self {
        self.links = links;
        self
    }

    pub fn with_tag_pattern(mut self, pattern: Option<String>) -> Self {
        self.tag_pattern = pattern;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.settings.title.as_deref()
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    fn primary(&self) -> &Repository {
        &self.repositories[0]
    }

    fn to_commit(&self, repository: &Repository, raw: RawCommit) -> Commit {
        Commit {
            subject: self.links.linkify_subject(&raw.subject, &repository.label),
            url: self.links.commit_url(&repository.label, &raw.hash),
            short_hash: raw.hash,
            author_name: raw.author,
            author_email: raw.email,
            timestamp: raw.time,
            repository: repository.label.clone(),
        }
    }
}

impl CachedSource for GitSource {
    fn kind(&self) -> &'static str {
        "git"
    }

    fn cache_token(&self) -> &str {
        &self.primary().path
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    fn fetch(&self, limit: usize, max_age: Option<Duration>) -> FrontpageResult<Vec<Update>> {
        let pattern = self.tag_pattern.as_deref();
        let primary = self.primary();

        let mut tags = self.git.list_tags(&primary.path, pattern)?;
        tags.reverse();

        // Companions only contribute to windows whose both ends they carry.
        let mut companion_tags = Vec::with_capacity(self.repositories.len() - 1);
        for repository in &self.repositories[1..] {
            let tags: HashSet<String> = self
                .git
                .list_tags(&repository.path, pattern)?
                .into_iter()
                .collect();
            companion_tags.push(tags);
        }

        let oldest = cutoff(max_age);
        let mut updates = Vec::new();

        for (newer, older) in tags.iter().zip(tags.iter().skip(1)).take(limit) {
            let tagged_at = self.git.tag_time(&primary.path, newer)?;
            if oldest.is_some_and(|oldest| tagged_at < oldest) {
                debug!(source = self.settings.name(), tag = %newer, "tag older than max age, stopping");
                break;
            }

            let mut commits = Vec::new();
            for raw in self.git.log_between(&primary.path, older, newer)? {
                commits.push(self.to_commit(primary, raw));
            }

            for (repository, tags) in self.repositories[1..].iter().zip(&companion_tags) {
                if !(tags.contains(newer) && tags.contains(older)) {
                    continue;
                }
                for raw in self.git.log_between(&repository.path, older, newer)? {
                    commits.push(self.to_commit(repository, raw));
                }
            }

            if commits.is_empty() {
                debug!(source = self.settings.name(), tag = %newer, "no commits since {}, dropping window", older);
                continue;
            }

            updates.push(
                RepoUpdate {
                    source: self.settings.name().to_string(),
                    timestamp: tagged_at,
                    tag_label: newer.clone(),
                    commits,
                }
                .into(),
            );
        }

        Ok(updates)
    }
}
