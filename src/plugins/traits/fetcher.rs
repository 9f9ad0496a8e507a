use async_trait::async_trait;
use std::time::Duration;

use crate::models::TrackedUrl;
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: TrackedUrl,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves the raw document for a product page.
///
/// Network, DNS and timeout problems are `AppError::Transport`; any HTTP
/// status (including errors) is returned as a response for the caller to judge.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}
