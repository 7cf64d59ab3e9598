use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Feed,
    Git,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Feed => "feed",
            SourceType::Git => "git",
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feed" | "rss" | "atom" => Ok(SourceType::Feed),
            "git" => Ok(SourceType::Git),
            _ => Err(format!("Unknown source type: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
