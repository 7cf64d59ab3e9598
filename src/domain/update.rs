use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a syndication feed, with display-ready markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedUpdate {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub content: String,
}

/// All commits made between two consecutive release tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoUpdate {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub tag_label: String,
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub short_hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    /// Escaped markup; `#<n>` references may be wrapped in links.
    pub subject: String,
    pub repository: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Update {
    Feed(FeedUpdate),
    Repo(RepoUpdate),
}

impl Update {
    pub fn source(&self) -> &str {
        match self {
            Update::Feed(u) => &u.source,
            Update::Repo(u) => &u.source,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Update::Feed(u) => u.timestamp,
            Update::Repo(u) => u.timestamp,
        }
    }
}

impl From<FeedUpdate> for Update {
    fn from(update: FeedUpdate) -> Self {
        Update::Feed(update)
    }
}

impl From<RepoUpdate> for Update {
    fn from(update: RepoUpdate) -> Self {
        Update::Repo(update)
    }
}

/// Sort newest first and keep at most `limit` updates.
pub fn newest_first(mut updates: Vec<Update>, limit: usize) -> Vec<Update> {
    updates.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    updates.truncate(limit);
    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn feed_update(source: &str, day: u32) -> Update {
        FeedUpdate {
            source: source.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            title: None,
            link: None,
            content: format!("day {}", day),
        }
        .into()
    }

    #[test]
    fn test_newest_first_sorts_and_bounds() {
        let updates = vec![
            feed_update("a", 3),
            feed_update("b", 10),
            feed_update("a", 7),
        ];

        let sorted = newest_first(updates, 2);

        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].source(), "b");
        assert_eq!(sorted[1].timestamp().format("%d").to_string(), "07");
    }

    #[test]
    fn test_serialized_update_is_tagged_by_kind() {
        let json = serde_json::to_value(feed_update("blog", 1)).unwrap();
        assert_eq!(json["kind"], "feed");
        assert_eq!(json["source"], "blog");

        let back: Update = serde_json::from_value(json).unwrap();
        assert!(matches!(back, Update::Feed(ref feed) if feed.source == "blog"));
    }
}
