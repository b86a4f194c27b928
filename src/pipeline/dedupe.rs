use crate::models::AuctionRecord;
use std::collections::HashSet;
use tracing::debug;

/// Drop repeated listings, keeping the first occurrence.
///
/// Records are keyed by URL when they have one, otherwise by trimmed,
/// lower-cased title. A listing surfaced by two search terms stays with the
/// term that was processed first.
pub fn dedupe(records: Vec<AuctionRecord>) -> Vec<AuctionRecord> {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        let url = record.url.as_deref().map(str::trim).unwrap_or_default();

        let fresh = if !url.is_empty() {
            seen_urls.insert(url.to_string())
        } else {
            let title = record.title.trim().to_lowercase();
            !title.is_empty() && seen_titles.insert(title)
        };

        if fresh {
            unique.push(record);
        } else {
            debug!(
                term = %record.search_term,
                "Duplicate filtered: {}",
                record.url.as_deref().unwrap_or(&record.title)
            );
        }
    }

    unique
}
