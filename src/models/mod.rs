use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Timestamp format the auction site expects for window bounds
pub const SITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// One auction listing found for one search term
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuctionRecord {
    pub title: String,
    /// Absolute http(s) URL of the listing, when one could be recovered
    pub url: Option<String>,
    pub current_bid: String,
    pub end_time: String,
    pub location: String,
    pub condition: String,
    pub image_url: Option<String>,
    /// Local copy of the image, attached by the image downloader
    pub image_path: Option<PathBuf>,
    pub search_term: String,
}

/// Result ordering requested from the site
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortOrder {
    #[serde(rename = "DATE_ASC")]
    DateAsc,
}

/// Closed `[start, end]` reporting window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateWindow {
    /// Bounds are stored in ascending order whatever order they are given in.
    pub fn new(a: DateTime<Utc>, b: DateTime<Utc>) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// One query against the auction site
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub term: String,
    pub locations: Vec<String>,
    pub conditions: Vec<String>,
    pub sort: SortOrder,
    pub newer_than: DateTime<Utc>,
    pub older_than: DateTime<Utc>,
    pub active_only: bool,
}

impl SearchRequest {
    /// Build an active-only, oldest-first request covering `window`
    pub fn new(
        term: &str,
        window: &DateWindow,
        locations: &[String],
        conditions: &[String],
    ) -> Self {
        Self {
            term: term.to_string(),
            locations: locations.to_vec(),
            conditions: conditions.to_vec(),
            sort: SortOrder::DateAsc,
            newer_than: window.start(),
            older_than: window.end(),
            active_only: true,
        }
    }
}
