use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::domain::SourceType;
use crate::errors::{FrontpageError, FrontpageResult};

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_CONFIG_PATH: &str = "frontpage.toml";
/// Longest accepted `poll_interval`, in minutes (one week).
pub const MAX_POLL_INTERVAL: u64 = 7 * 24 * 60;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Accepts either a TOML array of strings or one whitespace-separated string.
fn deserialize_string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrListVisitor;

    impl<'de> Visitor<'de> for StringOrListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a list of strings or a whitespace-separated string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Vec<String>, E>
        where
            E: de::Error,
        {
            Ok(v.split_whitespace().map(str::to_string).collect())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Vec<String>, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut items = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                items.push(item);
            }
            Ok(items)
        }
    }

    deserializer.deserialize_any(StringOrListVisitor)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// SQLite file for the cache. Without one, the cache lives in memory.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One `[sources.<name>]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub source_type: String,

    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Seconds.
    #[serde(default)]
    pub max_age: Option<u64>,
    /// Minutes between refreshes; each source type has its own default.
    #[serde(default)]
    pub poll_interval: Option<u64>,

    // feed
    #[serde(default)]
    pub feed_url: Option<String>,

    // git
    #[serde(default, deserialize_with = "deserialize_string_or_list")]
    pub repositories: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_list")]
    pub repository_labels: Vec<String>,
    #[serde(default)]
    pub code_host_url: Option<String>,
    #[serde(default)]
    pub gitweb_url: Option<String>,
    #[serde(default)]
    pub issue_tracker_url_template: Option<String>,
    #[serde(default)]
    pub tag_filter_pattern: Option<String>,
}

impl SourceConfig {
    pub fn kind(&self, name: &str) -> FrontpageResult<SourceType> {
        self.source_type
            .parse()
            .map_err(|e: String| FrontpageError::invalid_source(name, e))
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
            .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Labels for each repository, derived from the path when not configured.
    pub fn labels(&self, name: &str) -> FrontpageResult<Vec<String>> {
        if self.repository_labels.is_empty() {
            return Ok(self.repositories.iter().map(|p| label_from_path(p)).collect());
        }

        if self.repository_labels.len() != self.repositories.len() {
            return Err(FrontpageError::invalid_source(
                name,
                format!(
                    "{} repositories but {} repository labels",
                    self.repositories.len(),
                    self.repository_labels.len()
                ),
            ));
        }

        Ok(self.repository_labels.clone())
    }
}

/// `/srv/git/pokedex.git` becomes `pokedex`.
pub fn label_from_path(path: &str) -> String {
    let last = Path::new(path.trim_end_matches('/'))
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    last.strip_suffix(".git").map(str::to_string).unwrap_or(last)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Items shown per source at most.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Seconds; items older than this are hidden. Unset means no age limit.
    #[serde(default)]
    pub max_age: Option<u64>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            max_age: None,
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            sources: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Load `.env` from the executable's directory, then the current directory.
    pub fn load_dotenv() {
        if let Some(dir) = Self::exe_dir() {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        dotenvy::dotenv().ok();
    }

    pub fn load<P: AsRef<Path>>(path: P) -> FrontpageResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FrontpageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Load from a file, then apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> FrontpageResult<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(s: &str) -> FrontpageResult<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| FrontpageError::Config(format!("config parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Supported environment variables:
    /// - `FRONTPAGE_CACHE_PATH`: SQLite cache file
    /// - `FRONTPAGE_LOG`: log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FRONTPAGE_CACHE_PATH") {
            if !path.is_empty() {
                self.cache.path = Some(path);
            }
        }
        if let Ok(level) = std::env::var("FRONTPAGE_LOG") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Reject anything that would leave a source half-configured.
    pub fn validate(&self) -> FrontpageResult<()> {
        if self.limit == 0 {
            return Err(FrontpageError::Config(
                "limit must be a positive integer".to_string(),
            ));
        }

        for (name, source) in &self.sources {
            if source.limit == Some(0) {
                return Err(FrontpageError::invalid_source(
                    name,
                    "limit must be a positive integer",
                ));
            }

            if source.poll_interval.is_some_and(|m| m == 0 || m > MAX_POLL_INTERVAL) {
                return Err(FrontpageError::invalid_source(
                    name,
                    format!("poll_interval must be between 1 and {} minutes", MAX_POLL_INTERVAL),
                ));
            }

            match source.kind(name)? {
                SourceType::Feed => {
                    if source.feed_url.as_deref().map_or(true, str::is_empty) {
                        return Err(FrontpageError::invalid_source(name, "feed_url is required"));
                    }
                }
                SourceType::Git => {
                    if source.repositories.is_empty() {
                        return Err(FrontpageError::invalid_source(
                            name,
                            "repositories is required",
                        ));
                    }
                    source.labels(name)?;
                }
            }
        }

        Ok(())
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
limit = 5
max_age = 604800

[cache]
path = "/tmp/frontpage-cache.db"

[sources.news]
type = "feed"
feed_url = "https://bulbanews.example.com/feed"
title = "Bulbanews"
icon = "newspaper"
link = "https://bulbanews.example.com/"

[sources.code]
type = "git"
repositories = "/srv/git/spline.git /srv/git/pokedex.git"
repository_labels = ["spline", "pokedex"]
code_host_url = "https://github.com/veekun"
issue_tracker_url_template = "https://bugs.example.com/{0}"
tag_filter_pattern = "veekun-promotions/*"
limit = 3
poll_interval = 120
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();

        assert_eq!(config.limit, 5);
        assert_eq!(config.max_age(), Some(Duration::from_secs(604800)));
        assert_eq!(config.cache.path.as_deref(), Some("/tmp/frontpage-cache.db"));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.sources.len(), 2);

        let news = &config.sources["news"];
        assert_eq!(news.kind("news").unwrap(), SourceType::Feed);
        assert_eq!(news.title.as_deref(), Some("Bulbanews"));

        let code = &config.sources["code"];
        assert_eq!(code.kind("code").unwrap(), SourceType::Git);
        assert_eq!(
            code.repositories,
            vec!["/srv/git/spline.git", "/srv/git/pokedex.git"]
        );
        assert_eq!(code.labels("code").unwrap(), vec!["spline", "pokedex"]);
        assert_eq!(code.limit, Some(3));
        assert_eq!(code.poll_interval(), Some(Duration::from_secs(7200)));
    }

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.limit, DEFAULT_LIMIT);
        assert!(config.max_age().is_none());
        assert!(config.cache.path.is_none());
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_unknown_source_type_is_fatal() {
        let err = Config::parse("[sources.wiki]\ntype = \"svn\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown source type: svn"));
    }

    #[test]
    fn test_missing_type_is_fatal() {
        let err = Config::parse("[sources.wiki]\nfeed_url = \"https://x/\"\n").unwrap_err();
        assert!(matches!(err, FrontpageError::Config(_)));
    }

    #[test]
    fn test_zero_limits_rejected() {
        assert!(Config::parse("limit = 0").is_err());

        let err = Config::parse("[sources.a]\ntype = \"feed\"\nfeed_url = \"https://x/\"\nlimit = 0\n")
            .unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_poll_interval_is_bounded() {
        let source = "[sources.a]\ntype = \"feed\"\nfeed_url = \"https://x/\"\n";

        let err = Config::parse(&format!("{source}poll_interval = 300000000000000000\n"))
            .unwrap_err();
        assert!(err.to_string().contains("poll_interval must be between"));
        assert!(Config::parse(&format!("{source}poll_interval = 0\n")).is_err());

        let week = Config::parse(&format!("{source}poll_interval = {MAX_POLL_INTERVAL}\n")).unwrap();
        assert_eq!(
            week.sources["a"].poll_interval(),
            Some(Duration::from_secs(MAX_POLL_INTERVAL * 60))
        );
    }

    #[test]
    fn test_feed_requires_url() {
        let err = Config::parse("[sources.a]\ntype = \"rss\"\n").unwrap_err();
        assert!(err.to_string().contains("feed_url"));
    }

    #[test]
    fn test_label_count_must_match() {
        let err = Config::parse(
            "[sources.a]\ntype = \"git\"\nrepositories = [\"/a.git\", \"/b.git\"]\nrepository_labels = \"a\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("2 repositories but 1 repository labels"));
    }

    #[test]
    fn test_labels_derived_from_paths() {
        let config =
            Config::parse("[sources.a]\ntype = \"git\"\nrepositories = [\"/srv/git/pokedex.git/\", \"/srv/spline\"]\n")
                .unwrap();
        assert_eq!(
            config.sources["a"].labels("a").unwrap(),
            vec!["pokedex", "spline"]
        );
    }

    #[test]
    fn test_label_from_path() {
        assert_eq!(label_from_path("/srv/git/veekun.git"), "veekun");
        assert_eq!(label_from_path("relative/repo"), "repo");
        assert_eq!(label_from_path("plain"), "plain");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frontpage.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sources.len(), 2);

        let missing = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(missing.to_string().contains("cannot read"));
    }
}
