use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel used on pages, in the history log and in summaries when no price is known.
pub const NOT_AVAILABLE: &str = "N/A";

/// A scraped price after validation: a non-negative decimal, or explicitly unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatedPrice {
    Available(Decimal),
    Unavailable,
}

impl ValidatedPrice {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            ValidatedPrice::Available(amount) => Some(*amount),
            ValidatedPrice::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ValidatedPrice::Available(_))
    }
}

impl fmt::Display for ValidatedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatedPrice::Available(amount) => write!(f, "{}", amount),
            ValidatedPrice::Unavailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// What the history log knows about a URL before the current observation.
///
/// `NotFound` means the URL has never been recorded. `Recorded(Unavailable)`
/// means it has, but the last scrape yielded no usable price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviousPrice {
    NotFound,
    Recorded(ValidatedPrice),
}

impl PreviousPrice {
    pub fn price(&self) -> Option<ValidatedPrice> {
        match self {
            PreviousPrice::NotFound => None,
            PreviousPrice::Recorded(price) => Some(*price),
        }
    }
}

impl fmt::Display for PreviousPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviousPrice::NotFound => f.write_str(NOT_AVAILABLE),
            PreviousPrice::Recorded(price) => price.fmt(f),
        }
    }
}
