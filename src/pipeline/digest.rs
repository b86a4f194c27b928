use crate::models::{AuctionRecord, DateWindow};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// End-time keywords in sort order; anything unmatched sorts last
const END_TIME_ORDER: &[&str] = &[
    "today",
    "tomorrow",
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Records found for one search term, soonest-ending first
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TermGroup {
    pub term: String,
    pub records: Vec<AuctionRecord>,
}

/// Deduplicated results grouped by search term, ready for reporting
#[derive(Debug, Clone, Serialize)]
pub struct Digest {
    pub generated_at: DateTime<Utc>,
    pub window: DateWindow,
    pub groups: Vec<TermGroup>,
}

impl Digest {
    /// Group `records` under `terms` in term order. Every term gets a group,
    /// even an empty one.
    pub fn build(terms: &[String], records: Vec<AuctionRecord>, window: DateWindow) -> Self {
        let mut groups: Vec<TermGroup> = terms
            .iter()
            .map(|term| TermGroup {
                term: term.clone(),
                records: Vec::new(),
            })
            .collect();

        for record in records {
            match groups.iter_mut().find(|g| g.term == record.search_term) {
                Some(group) => group.records.push(record),
                None => groups.push(TermGroup {
                    term: record.search_term.clone(),
                    records: vec![record],
                }),
            }
        }

        for group in &mut groups {
            group.records.sort_by_key(|r| end_time_rank(&r.end_time));
        }

        Self {
            generated_at: Utc::now(),
            window,
            groups,
        }
    }

    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// today=0, tomorrow=1, Sunday..Saturday=2..8, anything else=9
pub fn end_time_rank(end_time: &str) -> usize {
    let lower = end_time.to_lowercase();
    END_TIME_ORDER
        .iter()
        .position(|keyword| lower.contains(keyword))
        .unwrap_or(END_TIME_ORDER.len())
}
