use async_trait::async_trait;
use reqwest::{Method, Request, Response, Url};

/// Executes HTTP requests for remote yearly sources.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;

    /// GET `url`, turning non-success statuses into errors.
    async fn get(&self, url: Url) -> reqwest::Result<Response> {
        self.execute(Request::new(Method::GET, url))
            .await?
            .error_for_status()
    }
}
