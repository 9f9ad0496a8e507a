pub mod extractor;
pub mod fetcher;
pub mod notifier;

pub use extractor::{ExtractedFields, Extractor};
pub use fetcher::{FetchRequest, FetchResponse, Fetcher};
pub use notifier::{NotificationResult, Notifier};
