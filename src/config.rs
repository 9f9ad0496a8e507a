use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub tracker: TrackerConfig,
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationsConfig,
    pub instance: InstanceConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub data_dir: PathBuf,
    pub urls_file: PathBuf,
    pub history_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub request_timeout: u64,
    pub accept_language: String,
    pub user_agents: Vec<String>,
    pub challenge_markers: Vec<String>,
    pub title_selectors: Vec<String>,
    pub price_selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub hour: u32,
    pub minute: u32,
    pub timezone: String,
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
    pub approved_schemes: Vec<String>,
    pub run_on_startup: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub email: EmailConfig,
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub to_address: Option<String>,
    pub use_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub lock_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            urls_file: PathBuf::from("urls.txt"),
            history_file: "price_history.csv".to_string(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_timeout: 30,
            accept_language: "en-US,en;q=0.9".to_string(),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
            ],
            challenge_markers: vec![
                "captcha".to_string(),
                "robot check".to_string(),
                "enter the characters you see below".to_string(),
            ],
            title_selectors: vec![
                "#productTitle".to_string(),
                "h1#title".to_string(),
                "meta[property='og:title']@content".to_string(),
                "h1".to_string(),
            ],
            price_selectors: vec![
                "#corePrice_feature_div span.a-offscreen".to_string(),
                "span.a-price span.a-offscreen".to_string(),
                "#priceblock_ourprice".to_string(),
                "#priceblock_dealprice".to_string(),
                "meta[itemprop='price']@content".to_string(),
                ".price".to_string(),
            ],
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            hour: 3,
            minute: 0,
            timezone: "America/New_York".to_string(),
            min_delay_secs: 15,
            max_delay_secs: 45,
            approved_schemes: vec!["http".to_string(), "https".to_string()],
            run_on_startup: true,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: 465,
            username: None,
            password: None,
            from_address: None,
            from_name: "Uatu Pricewatch".to_string(),
            to_address: None,
            use_tls: true,
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            username: "Uatu Pricewatch".to_string(),
        }
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self { lock_port: 65432 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: "price_tracker.log".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9001,
        }
    }
}

impl TrackerConfig {
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }
}

impl ScraperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl SchedulerConfig {
    pub fn tz(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|e| {
            ConfigError::Message(format!("Unknown scheduler timezone '{}': {}", self.timezone, e))
        })
    }

    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_secs(self.min_delay_secs),
            Duration::from_secs(self.max_delay_secs),
        )
    }
}

impl AppConfig {
    /// Load defaults, then the config file, then `UATU`-prefixed environment variables.
    ///
    /// An explicitly passed file must exist; otherwise `config/default` is
    /// picked up when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name("config/default").required(false),
        };

        let s = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("UATU")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("scraper.challenge_markers")
                    .with_list_parse_key("scheduler.approved_schemes")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.hour >= 24 {
            return Err(ConfigError::Message("Scheduler hour must be between 0 and 23".into()));
        }

        if self.scheduler.minute >= 60 {
            return Err(ConfigError::Message("Scheduler minute must be between 0 and 59".into()));
        }

        self.scheduler.tz()?;

        if self.scheduler.min_delay_secs > self.scheduler.max_delay_secs {
            return Err(ConfigError::Message(
                "Scheduler min_delay_secs cannot exceed max_delay_secs".into(),
            ));
        }

        if self.scheduler.approved_schemes.is_empty() {
            return Err(ConfigError::Message("At least one approved URL scheme is required".into()));
        }

        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message("Scraper request_timeout must be greater than 0".into()));
        }

        if self.scraper.user_agents.is_empty() {
            return Err(ConfigError::Message("Scraper user_agents cannot be empty".into()));
        }

        if self.tracker.history_file.trim().is_empty() {
            return Err(ConfigError::Message("Tracker history_file cannot be empty".into()));
        }

        let email = &self.notifications.email;
        if email.enabled {
            if email.smtp_server.trim().is_empty() {
                return Err(ConfigError::Message("Email notifications require smtp_server".into()));
            }
            if email.smtp_port == 0 {
                return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
            }
            if email.username.is_none() || email.password.is_none() {
                return Err(ConfigError::Message("Email notifications require username and password".into()));
            }
            if email.from_address.is_none() || email.to_address.is_none() {
                return Err(ConfigError::Message(
                    "Email notifications require from_address and to_address".into(),
                ));
            }
        }

        let discord = &self.notifications.discord;
        if discord.enabled {
            match &discord.webhook_url {
                Some(webhook) if Url::parse(webhook).is_ok() => {}
                Some(_) => return Err(ConfigError::Message("Invalid Discord webhook URL format".into())),
                None => return Err(ConfigError::Message("Discord notifications require webhook_url".into())),
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
