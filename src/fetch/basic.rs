use super::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

/// Yearly extracts run to hundreds of megabytes.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Plain `reqwest` client for public downloads.
#[derive(Default)]
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }

    /// Client with a request timeout and this tool's user agent.
    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
