use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::price::{PreviousPrice, ValidatedPrice};
use super::tracked_url::TrackedUrl;

/// One scrape of one URL. Built once per pipeline run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub url: TrackedUrl,
    pub title: String,
    pub price: ValidatedPrice,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    pub fn new(url: TrackedUrl, title: String, price: ValidatedPrice) -> Self {
        Self {
            url,
            title,
            price,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    NewlyTracked,
    NoChange,
    Increased,
    Decreased,
}

impl ChangeKind {
    pub fn is_change(&self) -> bool {
        matches!(self, ChangeKind::Increased | ChangeKind::Decreased)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::NewlyTracked => "newly tracked",
            ChangeKind::NoChange => "no change",
            ChangeKind::Increased => "increased",
            ChangeKind::Decreased => "decreased",
        };
        f.write_str(label)
    }
}

/// A meaningful price movement, handed to the notifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub url: TrackedUrl,
    pub title: String,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Only increases and decreases between two known prices become events.
    pub fn from_observation(
        observation: &Observation,
        previous: &PreviousPrice,
        kind: ChangeKind,
    ) -> Option<Self> {
        if !kind.is_change() {
            return None;
        }
        let old_price = previous.price()?.amount()?;
        let new_price = observation.price.amount()?;
        Some(Self {
            url: observation.url.clone(),
            title: observation.title.clone(),
            old_price,
            new_price,
            kind,
        })
    }

    pub fn difference(&self) -> Decimal {
        self.new_price - self.old_price
    }

    /// Signed change, e.g. `+5.00 (+25.0%)`.
    pub fn formatted_difference(&self) -> String {
        let diff = self.difference();
        let sign = if diff.is_sign_negative() { "-" } else { "+" };
        if self.old_price.is_zero() {
            return format!("{}{}", sign, diff.abs());
        }
        let pct = (diff / self.old_price * Decimal::ONE_HUNDRED).round_dp(1);
        format!("{}{} ({}{}%)", sign, diff.abs(), sign, pct.abs())
    }
}
