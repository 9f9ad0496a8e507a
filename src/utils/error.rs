use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status: {status}")]
    HttpStatus { status: u16 },

    #[error("Bot challenge detected (marker: {marker})")]
    ChallengeDetected { marker: String },

    #[error("Extraction failed: {0}")]
    ExtractionMissing(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Delivery error: {channel}: {message}")]
    Delivery { channel: String, message: String },

    #[error("Another instance is already running (port {port} is held)")]
    InstanceLocked { port: u16 },
}

impl AppError {
    /// Process exit code for an error that reaches `main`.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::InstanceLocked { .. } => 1,
            AppError::Config(_) | AppError::Configuration(_) => 2,
            _ => 1,
        }
    }

    pub fn delivery(channel: &str, message: impl Into<String>) -> Self {
        AppError::Delivery {
            channel: channel.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Transport(format!("request timed out: {}", err))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
