use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::ChangeEvent;
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub delivered: bool,
    pub channel: String,
    pub message_id: Option<String>,
}

impl NotificationResult {
    pub fn delivered(channel: &str, message_id: Option<String>) -> Self {
        Self {
            delivered: true,
            channel: channel.to_string(),
            message_id,
        }
    }

    pub fn skipped(channel: &str) -> Self {
        Self {
            delivered: false,
            channel: channel.to_string(),
            message_id: None,
        }
    }
}

/// Trait for implementing notification methods (email, Discord, etc.)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;

    async fn notify(&self, event: &ChangeEvent) -> Result<NotificationResult>;
}
