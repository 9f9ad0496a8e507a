//! Price parsing and change classification.
//!
//! Both halves are pure: no I/O, no hidden state.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::{ChangeKind, PreviousPrice, ValidatedPrice, NOT_AVAILABLE};

/// Smallest movement (in currency units) that counts as a change.
pub const MIN_DELTA: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Parse scraped price text such as `"$1,299.99"` or `"EUR 50"`.
///
/// Everything except ASCII digits and `.` is discarded first. The sentinel,
/// an empty remainder, or more than one decimal point yield `Unavailable`.
pub fn validate(raw: &str) -> ValidatedPrice {
    if raw.trim() == NOT_AVAILABLE {
        return ValidatedPrice::Unavailable;
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) || cleaned.matches('.').count() > 1 {
        return ValidatedPrice::Unavailable;
    }

    match Decimal::from_str(&cleaned) {
        Ok(amount) if !amount.is_sign_negative() => ValidatedPrice::Available(amount),
        _ => ValidatedPrice::Unavailable,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    min_delta: Decimal,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::with_min_delta(MIN_DELTA)
    }

    pub fn with_min_delta(min_delta: Decimal) -> Self {
        Self { min_delta: min_delta.abs() }
    }

    pub fn detect(&self, previous: &PreviousPrice, current: &ValidatedPrice) -> ChangeKind {
        let previous = match previous {
            PreviousPrice::NotFound => return ChangeKind::NewlyTracked,
            PreviousPrice::Recorded(price) => price,
        };

        // a transient scrape failure on either side must not look like a price move
        let (Some(old), Some(new)) = (previous.amount(), current.amount()) else {
            return ChangeKind::NoChange;
        };

        if (new - old).abs() < self.min_delta {
            ChangeKind::NoChange
        } else if new > old {
            ChangeKind::Increased
        } else {
            ChangeKind::Decreased
        }
    }
}

/// Classify with the default 0.01 threshold.
pub fn detect(previous: &PreviousPrice, current: &ValidatedPrice) -> ChangeKind {
    ChangeDetector::new().detect(previous, current)
}
