use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: Url },
}

/// The page as seen at one instant: where it is and what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: Url,
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    /// Cheap identity used to skip re-scanning an unchanged page.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.url.as_str().hash(&mut hasher);
        self.html.hash(&mut hasher);
        hasher.finish()
    }
}

/// Anything that can report the current page.
#[async_trait]
pub trait PageSource: Send {
    async fn snapshot(&mut self) -> Result<PageSnapshot, PageError>;
}

/// Fetches one URL over HTTP on every snapshot. Redirects change the reported
/// URL, which the monitor treats as navigation.
pub struct HttpPageSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpPageSource {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, PageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("skillport-watch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn snapshot(&mut self) -> Result<PageSnapshot, PageError> {
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(PageError::Status {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let html = response.text().await?;
        Ok(PageSnapshot::new(final_url, html))
    }
}
