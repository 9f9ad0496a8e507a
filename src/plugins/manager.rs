use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::notifiers::{DiscordNotifier, EmailNotifier};
use super::traits::{NotificationResult, Notifier};
use crate::config::NotificationsConfig;
use crate::models::ChangeEvent;
use crate::utils::error::{AppError, Result};

const CHANNEL: &str = "notifications";

pub type NotifierBox = Arc<dyn Notifier>;

/// Fans a change event out to every registered channel.
///
/// With the master switch off, `notify` is a no-op reporting `delivered = false`.
#[derive(Clone)]
pub struct NotifierManager {
    enabled: bool,
    notifiers: Arc<RwLock<HashMap<&'static str, NotifierBox>>>,
}

impl NotifierManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            notifiers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register every channel enabled in `config`.
    pub async fn from_config(config: &NotificationsConfig) -> Result<Self> {
        let manager = Self::new(config.enabled);
        if !config.enabled {
            tracing::info!("Notifications disabled");
            return Ok(manager);
        }

        if config.email.enabled {
            manager
                .register_notifier(Arc::new(EmailNotifier::from_config(&config.email)?))
                .await;
        }
        if config.discord.enabled {
            manager
                .register_notifier(Arc::new(DiscordNotifier::from_config(&config.discord)?))
                .await;
        }

        let channels = manager.list_notifier_types().await;
        if channels.is_empty() {
            tracing::warn!("Notifications enabled but no channel is configured");
        } else {
            tracing::info!(channels = ?channels, "Notification channels ready");
        }
        Ok(manager)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn register_notifier(&self, notifier: NotifierBox) {
        let mut notifiers = self.notifiers.write().await;
        notifiers.insert(notifier.channel(), notifier);
    }

    pub async fn has_notifier(&self, channel: &str) -> bool {
        self.notifiers.read().await.contains_key(channel)
    }

    pub async fn list_notifier_types(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.notifiers.read().await.keys().map(|c| c.to_string()).collect();
        channels.sort();
        channels
    }
}

#[async_trait]
impl Notifier for NotifierManager {
    fn channel(&self) -> &'static str {
        CHANNEL
    }

    async fn notify(&self, event: &ChangeEvent) -> Result<NotificationResult> {
        if !self.enabled {
            tracing::debug!(url = %event.url, "Notifications disabled, not sending");
            return Ok(NotificationResult::skipped(CHANNEL));
        }

        let notifiers = self.notifiers.read().await;
        if notifiers.is_empty() {
            return Ok(NotificationResult::skipped(CHANNEL));
        }

        let results = join_all(notifiers.values().map(|notifier| notifier.notify(event))).await;

        let mut delivered = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(result) if result.delivered => delivered.push(result),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(url = %event.url, "Notification channel failed: {}", e);
                    errors.push(e.to_string());
                }
            }
        }

        if !delivered.is_empty() {
            let channels = delivered.iter().map(|r| r.channel.as_str()).collect::<Vec<_>>().join(",");
            let message_id = delivered.into_iter().find_map(|r| r.message_id);
            return Ok(NotificationResult {
                delivered: true,
                channel: channels,
                message_id,
            });
        }

        if errors.len() == notifiers.len() {
            return Err(AppError::delivery(CHANNEL, errors.join("; ")));
        }

        Ok(NotificationResult::skipped(CHANNEL))
    }
}
