use crate::config::Config;
use crate::models::{AuctionRecord, DateWindow};
use crate::pipeline::{dedupe, matches, Digest};
use crate::scrapers::extract::RecordExtractor;
use crate::scrapers::query::build_search_url;
use crate::scrapers::row::{enumerate_rows, parse_selector, visible_text, ROW_SELECTORS};
use crate::scrapers::traits::{BrowserError, ImageDownloader, PageSource};
use anyhow::{Context, Result};
use scraper::Html;
use std::thread;
use tracing::{info, warn};

const PAGE_PREVIEW_CHARS: usize = 1000;

/// Runs every search term through one browser session and merges the results
pub struct SearchOrchestrator<'a> {
    config: &'a Config,
    window: DateWindow,
    images: &'a dyn ImageDownloader,
}

impl<'a> SearchOrchestrator<'a> {
    pub fn new(config: &'a Config, window: DateWindow, images: &'a dyn ImageDownloader) -> Self {
        Self { config, window, images }
    }

    /// Search `terms` in order and build the digest.
    ///
    /// Only a failure to start the browser is returned as an error. The
    /// session is owned here and dropped before this returns.
    pub fn run<P, F>(&self, terms: &[String], launch: F) -> Result<Digest>
    where
        P: PageSource,
        F: FnOnce() -> Result<P, BrowserError>,
    {
        let mut session = launch().context("Browser session could not be started")?;
        let mut all_records = Vec::new();

        for (idx, term) in terms.iter().enumerate() {
            info!("Starting search for: {}", term);
            let records = self.search_term(&mut session, term);
            info!(term = %term, count = records.len(), "Found auctions");
            all_records.extend(records);

            if idx + 1 < terms.len() && !self.config.scraping.delay_between_searches.is_zero() {
                thread::sleep(self.config.scraping.delay_between_searches);
            }
        }
        drop(session);

        let unique = dedupe(all_records);
        info!("Total unique auctions found: {}", unique.len());

        Ok(Digest::build(terms, unique, self.window))
    }

    /// All matching records for one term. Failures here only empty the term.
    fn search_term<P: PageSource>(&self, session: &mut P, term: &str) -> Vec<AuctionRecord> {
        let criteria = &self.config.criteria;
        let url = match build_search_url(term, &self.window, criteria, &self.config.site) {
            Ok(url) => url,
            Err(e) => {
                warn!(term = %term, error = %e, "Could not encode search settings");
                return Vec::new();
            }
        };

        info!("Loading search URL for '{}'...", term);
        if let Err(e) = session.load(&url) {
            warn!(term = %term, error = %e, "Search page failed to load");
            return Vec::new();
        }

        let ready: Vec<&str> = ROW_SELECTORS.iter().map(|(selector, _)| *selector).collect();
        if !session.wait_for_any(&ready, self.config.scraping.wait_timeout) {
            warn!("Timeout waiting for results for search term: {}", term);
            return Vec::new();
        }

        let html = match session.content() {
            Ok(html) => html,
            Err(e) => {
                warn!(term = %term, error = %e, "Could not read results page");
                return Vec::new();
            }
        };

        let document = Html::parse_document(&html);
        let Some((selector, rows)) = enumerate_rows(&document) else {
            info!("No auction rows found for search term: {}", term);
            if self.config.scraping.show_page {
                let (preview, total) = body_preview(&document, PAGE_PREVIEW_CHARS);
                info!(term = %term, chars = total, "Page content preview:\n{}", preview);
            }
            return Vec::new();
        };
        info!("Found {} auction rows with selector: {}", rows.len(), selector);

        let limit = self.config.scraping.max_rows_per_term.unwrap_or(usize::MAX);
        let extractor = RecordExtractor::new(&self.config.site, self.images);

        let records: Vec<AuctionRecord> = rows
            .iter()
            .take(limit)
            .filter_map(|row| extractor.extract(row, term))
            .filter(|record| matches(record, &self.config.criteria))
            .collect();

        info!("Extracted {} valid auctions for '{}'", records.len(), term);
        records
    }
}

/// Visible body text cut to `limit` characters, with the full length
fn body_preview(document: &Html, limit: usize) -> (String, usize) {
    let text = parse_selector("body")
        .ok()
        .and_then(|body| document.select(&body).next().map(visible_text))
        .unwrap_or_default();
    let total = text.chars().count();
    (text.chars().take(limit).collect(), total)
}
