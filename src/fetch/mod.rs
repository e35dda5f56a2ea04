//! Source retrieval: local files or http(s) downloads.

mod basic;
mod client;

pub use basic::{BasicClient, DOWNLOAD_TIMEOUT};
pub use client::HttpClient;

use anyhow::Result;
use bytes::Bytes;
use tracing::debug;

use crate::error::InputError;

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let resp = client.get(url.parse()?).await?;
    Ok(resp.bytes().await?)
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Loads a source from an http(s) URL or a local path.
#[tracing::instrument(skip(client))]
pub async fn read_source<C: HttpClient>(client: &C, source: &str) -> Result<Bytes, InputError> {
    let unreadable = |message: String| InputError::Unreadable {
        source_name: source.to_string(),
        message,
    };

    let bytes = if is_remote(source) {
        fetch_bytes(client, source)
            .await
            .map_err(|e| unreadable(e.to_string()))?
    } else {
        tokio::fs::read(source)
            .await
            .map(Bytes::from)
            .map_err(|e| unreadable(e.to_string()))?
    };

    debug!(bytes = bytes.len(), "Source read");
    Ok(bytes)
}
