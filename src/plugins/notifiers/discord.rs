use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::DiscordConfig;
use crate::models::{ChangeEvent, ChangeKind};
use crate::plugins::traits::{NotificationResult, Notifier};
use crate::utils::error::{AppError, Result};

const CHANNEL: &str = "discord";
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    username: String,
}

impl DiscordNotifier {
    pub fn from_config(config: &DiscordConfig) -> Result<Self> {
        let webhook_url = config
            .webhook_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| AppError::Configuration("Discord notifier requires webhook_url".into()))?;

        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            webhook_url,
            username: config.username.clone(),
        })
    }

    fn embed_color(kind: ChangeKind) -> u32 {
        match kind {
            ChangeKind::Decreased => 0x00ff00,
            _ => 0xff9900,
        }
    }

    fn create_embed(event: &ChangeEvent) -> serde_json::Value {
        let (emoji, heading) = match event.kind {
            ChangeKind::Decreased => ("📉", "💰 Price Drop!"),
            _ => ("📈", "⚠️ Price Increase"),
        };

        json!({
            "title": format!("{} {}", emoji, event.title),
            "url": event.url.as_str(),
            "color": Self::embed_color(event.kind),
            "timestamp": Utc::now().to_rfc3339(),
            "fields": [
                {
                    "name": heading,
                    "value": format!(
                        "**Old:** {}\n**New:** {}\n**Change:** {}",
                        event.old_price,
                        event.new_price,
                        event.formatted_difference()
                    ),
                    "inline": false
                }
            ],
            "footer": { "text": "Uatu Pricewatch" }
        })
    }

    fn create_webhook_payload(&self, event: &ChangeEvent) -> serde_json::Value {
        json!({
            "username": self.username,
            "embeds": [Self::create_embed(event)]
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn channel(&self) -> &'static str {
        CHANNEL
    }

    async fn notify(&self, event: &ChangeEvent) -> Result<NotificationResult> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&self.create_webhook_payload(event))
            .send()
            .await
            .map_err(|e| AppError::delivery(CHANNEL, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::delivery(CHANNEL, format!("webhook returned {}", status)));
        }

        Ok(NotificationResult::delivered(
            CHANNEL,
            Some(format!("discord-{}", Utc::now().timestamp())),
        ))
    }
}
