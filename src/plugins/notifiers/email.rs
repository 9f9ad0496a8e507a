use async_trait::async_trait;
use chrono::Utc;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::models::{ChangeEvent, ChangeKind};
use crate::plugins::traits::{NotificationResult, Notifier};
use crate::utils::error::{AppError, Result};

const CHANNEL: &str = "email";

/// SMTP alerts, implicit TLS when `use_tls` is set, plain otherwise.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let required = |value: &Option<String>, field: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Configuration(format!("Email notifier requires {}", field)))
        };

        let username = required(&config.username, "username")?;
        let password = required(&config.password, "password")?;
        let from_address = required(&config.from_address, "from_address")?;
        let to_address = required(&config.to_address, "to_address")?;

        let from = format!("{} <{}>", config.from_name, from_address)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Configuration(format!("Invalid from_address '{}': {}", from_address, e)))?;
        let to = to_address
            .parse::<Mailbox>()
            .map_err(|e| AppError::Configuration(format!("Invalid to_address '{}': {}", to_address, e)))?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
                .map_err(|e| AppError::Configuration(format!("Invalid SMTP server '{}': {}", config.smtp_server, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_server)
        };

        let mailer = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self { mailer, from, to })
    }

    fn build_message(&self, event: &ChangeEvent) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format_subject(event))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(format_text_body(event)),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(format_html_body(event)),
                    ),
            )
            .map_err(|e| AppError::delivery(CHANNEL, format!("Failed to build message: {}", e)))
    }
}

pub fn format_subject(event: &ChangeEvent) -> String {
    let label = match event.kind {
        ChangeKind::Decreased => "Price Drop",
        _ => "Price Increase",
    };
    format!("{}: {} - {}", label, event.title, event.new_price)
}

pub fn format_text_body(event: &ChangeEvent) -> String {
    let mut text = String::new();
    text.push_str(&format!("Product: {}\n", event.title));
    text.push_str(&format!("Change: {} → {}\n", event.old_price, event.new_price));
    text.push_str(&format!("Difference: {}\n\n", event.formatted_difference()));
    text.push_str(&format!("URL: {}\n", event.url));
    text
}

pub fn format_html_body(event: &ChangeEvent) -> String {
    let change_class = match event.kind {
        ChangeKind::Decreased => "price-drop",
        _ => "price-increase",
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 20px; }}
        .product {{ font-size: 18px; font-weight: bold; }}
        .change {{ margin: 15px 0; padding: 10px; border-radius: 5px; }}
        .price-drop {{ background: #e8f5e8; border-left: 4px solid #4CAF50; }}
        .price-increase {{ background: #fff3cd; border-left: 4px solid #ff9800; }}
    </style>
</head>
<body>
    <div class="product">{title}</div>
    <div class="change {class}">
        <strong>Change:</strong> {old} → {new}<br>
        <strong>Difference:</strong> {diff}
    </div>
    <p><a href="{url}">{url}</a></p>
</body>
</html>
"#,
        title = escape_html(&event.title),
        class = change_class,
        old = event.old_price,
        new = event.new_price,
        diff = event.formatted_difference(),
        url = escape_html(event.url.as_str()),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn channel(&self) -> &'static str {
        CHANNEL
    }

    async fn notify(&self, event: &ChangeEvent) -> Result<NotificationResult> {
        let message = self.build_message(event)?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::delivery(CHANNEL, e.to_string()))?;

        tracing::debug!(to = %self.to, url = %event.url, "Email alert sent");
        Ok(NotificationResult::delivered(
            CHANNEL,
            Some(format!("email-{}", Utc::now().timestamp())),
        ))
    }
}
