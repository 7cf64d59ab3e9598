use std::time::Duration;

use reqwest::blocking::Client;

use crate::errors::{FrontpageError, FrontpageResult};

const USER_AGENT: &str = concat!("frontpage/", env!("CARGO_PKG_VERSION"));

/// Retrieves raw feed documents. Errors mean the endpoint could not be reached.
#[cfg_attr(test, mockall::automock)]
pub trait FeedFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> FrontpageResult<Vec<u8>>;
}

pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedFetcher for HttpFeedFetcher {
    fn fetch(&self, url: &str) -> FrontpageResult<Vec<u8>> {
        let response = self.client.get(url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FrontpageError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}
