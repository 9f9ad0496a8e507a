pub mod manager;
pub mod notifiers;
pub mod trackers;
pub mod traits;

pub use manager::NotifierManager;
pub use traits::{Extractor, Fetcher, Notifier};
