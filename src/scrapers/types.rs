use serde::{Deserialize, Serialize};

/// Allow-lists used both in the query and when re-checking extracted records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterCriteria {
    /// Branch locations, matched as case-insensitive substrings
    pub locations: Vec<String>,
    /// Item conditions, matched as case-insensitive substrings
    pub conditions: Vec<String>,
}

/// Where the auction site lives and how its links look
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    /// Origin every relative link is resolved against
    pub base_url: String,
    /// Path of the search endpoint
    pub search_path: String,
    /// Bare host prefixes that only need a scheme to become absolute
    pub known_hosts: Vec<String>,
}

impl SiteConfig {
    /// Origin without a trailing slash
    pub fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.bidft.auction".to_string(),
            search_path: "/archive".to_string(),
            known_hosts: vec!["www.bidft.auction".to_string(), "www.bidfta.com".to_string()],
        }
    }
}

/// Day that closes a weekly window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WeekEnd {
    /// Sunday through the following Saturday
    Saturday,
    /// Sunday through the following Sunday, so Saturday-evening closes are kept
    Sunday,
}

/// How the search window is chosen
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WindowMode {
    /// The week containing "now", starting on Sunday
    Week(WeekEnd),
    /// `now - days_back` through `now + days_ahead`, for diagnostics
    Override { days_back: i64, days_ahead: i64 },
}

impl WindowMode {
    /// Wide window used when date filtering should be bypassed
    pub fn all_dates() -> Self {
        WindowMode::Override {
            days_back: 30,
            days_ahead: 30,
        }
    }
}

impl Default for WindowMode {
    fn default() -> Self {
        WindowMode::Week(WeekEnd::Sunday)
    }
}
