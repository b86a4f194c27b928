use crate::models::AuctionRecord;
use crate::scrapers::types::FilterCriteria;
use tracing::debug;

/// Re-check a record against the allow-lists the query already asked for.
/// The site sometimes ignores its filters or returns near matches.
pub fn matches(record: &AuctionRecord, criteria: &FilterCriteria) -> bool {
    if record.title.trim().is_empty() || record.location.trim().is_empty() {
        return false;
    }

    if !contains_any(&record.location, &criteria.locations) {
        debug!("Location filter failed for: {}", record.location);
        return false;
    }

    if !contains_any(&record.condition, &criteria.conditions) {
        debug!("Condition filter failed for: {}", record.condition);
        return false;
    }

    true
}

/// Case-insensitive: does `value` contain any entry of `allowed`?
pub fn contains_any(value: &str, allowed: &[String]) -> bool {
    let value = value.to_lowercase();
    allowed
        .iter()
        .any(|entry| value.contains(&entry.to_lowercase()))
}
