pub mod config;
pub mod element_finder;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod url_list;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::{AppError, Result};
