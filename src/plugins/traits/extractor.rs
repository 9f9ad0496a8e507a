use crate::utils::error::Result;

/// Fields pulled out of a product page. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub raw_price: Option<String>,
}

/// Turns a fetched document into title and raw price text.
///
/// Missing fields are `None`, not errors; `Err` is reserved for documents
/// that cannot be read at all.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &str) -> Result<ExtractedFields>;
}
