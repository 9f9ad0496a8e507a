use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Instant;

use crate::plugins::traits::{FetchRequest, FetchResponse, Fetcher};
use crate::utils::error::{AppError, Result};

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (compatible; UatuPricewatch/0.1)";

/// Headers presented to a store for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_agent: String,
    pub accept_language: String,
}

impl RequestIdentity {
    /// Pick a user agent at random so consecutive requests don't share a fingerprint.
    pub fn random(user_agents: &[String], accept_language: &str) -> Self {
        let user_agent = user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string());

        Self {
            user_agent,
            accept_language: accept_language.to_string(),
        }
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("Accept-Language".to_string(), self.accept_language.clone()),
        ]
    }
}

/// Plain HTTP page fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::Transport(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::Transport(format!("Invalid header value for '{}': {}", name, e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let start_time = Instant::now();

        let response = self
            .client
            .get(request.url.as_str())
            .headers(Self::header_map(&request.headers)?)
            .timeout(request.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(
            url = %request.url,
            status,
            bytes = body.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Fetched page"
        );

        Ok(FetchResponse { status, body })
    }
}
