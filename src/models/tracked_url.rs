use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::utils::error::{AppError, Result};

/// Absolute product URL with query string and fragment removed.
///
/// Two listings of the same product that differ only in tracking parameters
/// share one history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackedUrl(Url);

impl TrackedUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| AppError::Validation(format!("Invalid URL '{}': {}", raw.trim(), e)))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(AppError::Validation(format!("URL '{}' is not absolute", raw.trim())));
        }
        Ok(Self::normalize(url))
    }

    pub fn normalize(mut url: Url) -> Self {
        url.set_query(None);
        url.set_fragment(None);
        TrackedUrl(url)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for TrackedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl TryFrom<String> for TrackedUrl {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        TrackedUrl::parse(&value)
    }
}

impl From<TrackedUrl> for String {
    fn from(url: TrackedUrl) -> Self {
        url.0.into()
    }
}
