use uuid::Uuid;

pub mod observation;
pub mod price;
pub mod price_history;
pub mod tracked_url;

// Re-exports for convenience
pub use observation::*;
pub use price::*;
pub use price_history::*;
pub use tracked_url::*;

// Utility functions
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
