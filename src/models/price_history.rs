use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::observation::{ChangeKind, Observation};
use super::price::{PreviousPrice, ValidatedPrice};
use super::tracked_url::TrackedUrl;

pub const NO_CHANGE: &str = "No Change";

/// One persisted observation plus what it was compared against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub title: String,
    pub price: ValidatedPrice,
    pub previous_price: PreviousPrice,
    pub change_summary: String,
    pub url: TrackedUrl,
    pub timestamp: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(observation: Observation, previous_price: PreviousPrice, kind: ChangeKind) -> Self {
        let change_summary = summarize_change(&previous_price, &observation.price, kind);
        Self {
            title: observation.title,
            price: observation.price,
            previous_price,
            change_summary,
            url: observation.url,
            timestamp: observation.timestamp,
        }
    }

    pub fn to_row(&self) -> HistoryRow {
        HistoryRow {
            title: self.title.clone(),
            price: self.price.to_string(),
            previous_price: self.previous_price.to_string(),
            price_change: self.change_summary.clone(),
            url: self.url.to_string(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// `"No Change"` unless the price actually moved, then `"old → new"`.
pub fn summarize_change(previous: &PreviousPrice, current: &ValidatedPrice, kind: ChangeKind) -> String {
    if kind.is_change() {
        format!("{} → {}", previous, current)
    } else {
        NO_CHANGE.to_string()
    }
}

/// On-disk row of the history log. Column names are part of the file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "Previous_Price")]
    pub previous_price: String,
    #[serde(rename = "Price_Change")]
    pub price_change: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

impl HistoryRow {
    pub const HEADERS: [&'static str; 6] = [
        "Title",
        "Price",
        "Previous_Price",
        "Price_Change",
        "URL",
        "Timestamp",
    ];
}
