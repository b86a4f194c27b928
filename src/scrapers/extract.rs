//! Turns one rendered result row into an [`AuctionRecord`].
//!
//! Title and URL are discovered by an ordered chain of strategies. Each
//! strategy may contribute a title, a URL, both or neither. The first
//! strategy to contribute a value wins that value, so a row can take its
//! title from one strategy and its URL from a later one.
//!
//! Column layout of the results table:
//! `PHOTO | DESCRIPTION | AMAZON | CONDITION | LOCATION | ENDS AT | PRICE`

use crate::models::AuctionRecord;
use crate::scrapers::row::{RowError, RowHandle};
use crate::scrapers::traits::ImageDownloader;
use crate::scrapers::types::SiteConfig;
use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use url::Url;

const MIN_CELLS: usize = 7;

const IMAGE_CELL: usize = 0;
const DESCRIPTION_CELL: usize = 1;
const CONDITION_CELL: usize = 3;
const LOCATION_CELL: usize = 4;
const END_TIME_CELL: usize = 5;
const BID_CELL: usize = 6;

const CLICKABLE_SELECTOR: &str =
    r#"[onclick], [data-href], [data-url], [class*="link"], [class*="clickable"]"#;

/// Substrings that mark a link as pointing at an item detail page
const DETAIL_MARKERS: &[&str] = &["itemDetails", "auction"];

/// Which strategy produced a title or URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// Anchor inside the description cell
    DirectLink,
    /// Element with a click handler or link-like attribute in the description cell
    Clickable,
    /// Anchor anywhere in the row pointing at an item page
    DetailLink,
    /// First anchor anywhere in the row
    FirstLink,
    /// Plain description text
    CellText,
}

impl LinkSource {
    pub fn is_low_confidence(self) -> bool {
        matches!(self, LinkSource::FirstLink)
    }
}

/// Title and URL found for a row, with where each came from
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LinkResolution {
    pub title: Option<(String, LinkSource)>,
    pub url: Option<(String, LinkSource)>,
}

/// Raw URL value before normalization
#[derive(Debug)]
struct Candidate {
    raw: String,
    /// Taken from an inline event handler
    scripted: bool,
}

impl Candidate {
    fn plain(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            scripted: false,
        }
    }
}

#[derive(Debug, Default)]
struct Found {
    title: Option<(String, LinkSource)>,
    url: Option<(Candidate, LinkSource)>,
}

type Strategy = fn(&dyn RowHandle) -> Result<Found, RowError>;

const STRATEGIES: &[Strategy] = &[direct_link, clickable_element, row_link, description_text];

/// Extracts auction records from result rows
pub struct RecordExtractor<'a> {
    site: &'a SiteConfig,
    images: &'a dyn ImageDownloader,
}

impl<'a> RecordExtractor<'a> {
    pub fn new(site: &'a SiteConfig, images: &'a dyn ImageDownloader) -> Self {
        Self { site, images }
    }

    /// Extract one record. Malformed rows and rows without a title give `None`.
    pub fn extract(&self, row: &dyn RowHandle, search_term: &str) -> Option<AuctionRecord> {
        match self.try_extract(row, search_term) {
            Ok(record) => record,
            Err(e) => {
                warn!("Error extracting auction data from row: {}", e);
                None
            }
        }
    }

    fn try_extract(
        &self,
        row: &dyn RowHandle,
        search_term: &str,
    ) -> Result<Option<AuctionRecord>, RowError> {
        if row.cell_count() < MIN_CELLS {
            debug!("Skipping row with {} cells", row.cell_count());
            return Ok(None);
        }

        let links = resolve_link(row, self.site)?;

        let title = match links.title {
            Some((title, source)) => {
                debug!("Title from {:?}: {}", source, preview(&title));
                title
            }
            None => {
                debug!("Skipping row without a title");
                return Ok(None);
            }
        };

        let url = links.url.map(|(url, source)| {
            if source.is_low_confidence() {
                debug!("Low confidence URL (first link in row) for '{}': {}", preview(&title), url);
            } else {
                debug!("URL from {:?}: {}", source, url);
            }
            url
        });

        let image_url = self.image_url(row)?;
        let image_path = image_url.as_deref().and_then(|src| {
            let filename = image_filename(url.as_deref().unwrap_or(&title));
            self.images.download(src, &filename)
        });

        let record = AuctionRecord {
            title,
            url,
            current_bid: row.cell_text(BID_CELL)?,
            end_time: row.cell_text(END_TIME_CELL)?,
            location: row.cell_text(LOCATION_CELL)?,
            condition: row.cell_text(CONDITION_CELL)?,
            image_url,
            image_path,
            search_term: search_term.to_string(),
        };

        debug!(
            "Extracted auction: {} - {} - {}",
            preview(&record.title),
            record.current_bid,
            record.location
        );
        Ok(Some(record))
    }

    fn image_url(&self, row: &dyn RowHandle) -> Result<Option<String>, RowError> {
        let images = row.find_in_cell(IMAGE_CELL, "img")?;
        let src = match images.first().and_then(|img| img.attr("src")) {
            Some(src) => src,
            None => return Ok(None),
        };

        let resolved = Url::parse(self.site.origin())
            .and_then(|base| base.join(src))
            .map(|u| u.to_string())
            .ok();
        Ok(resolved)
    }
}

/// Run the strategy chain, keeping the first title and first usable URL
pub fn resolve_link(row: &dyn RowHandle, site: &SiteConfig) -> Result<LinkResolution, RowError> {
    let mut resolution = LinkResolution::default();

    for strategy in STRATEGIES {
        if resolution.title.is_some() && resolution.url.is_some() {
            break;
        }

        let found = strategy(row)?;

        if resolution.title.is_none() {
            resolution.title = found.title.filter(|(title, _)| !title.is_empty());
        }
        if resolution.url.is_none() {
            resolution.url = found.url.and_then(|(candidate, source)| {
                normalize_url(&candidate, site).map(|url| (url, source))
            });
        }
    }

    Ok(resolution)
}

fn direct_link(row: &dyn RowHandle) -> Result<Found, RowError> {
    let anchors = row.find_in_cell(DESCRIPTION_CELL, "a")?;
    let Some(anchor) = anchors.first() else {
        return Ok(Found::default());
    };

    Ok(Found {
        title: non_empty(&anchor.text).map(|t| (t, LinkSource::DirectLink)),
        url: anchor
            .attr("href")
            .map(|href| (Candidate::plain(href), LinkSource::DirectLink)),
    })
}

fn clickable_element(row: &dyn RowHandle) -> Result<Found, RowError> {
    let clickable = row.find_in_cell(DESCRIPTION_CELL, CLICKABLE_SELECTOR)?;
    let Some(element) = clickable.first() else {
        return Ok(Found::default());
    };

    let candidate = match element.attr("onclick") {
        Some(handler) => Some(Candidate { raw: handler.to_string(), scripted: true }),
        None => ["data-href", "data-url", "href"]
            .iter()
            .find_map(|name| element.attr(name))
            .map(Candidate::plain),
    };

    Ok(Found {
        title: non_empty(&row.cell_text(DESCRIPTION_CELL)?).map(|t| (t, LinkSource::Clickable)),
        url: candidate.map(|c| (c, LinkSource::Clickable)),
    })
}

fn row_link(row: &dyn RowHandle) -> Result<Found, RowError> {
    let anchors = row.find_in_row("a[href]")?;

    if let Some((anchor, href)) = anchors
        .iter()
        .filter_map(|a| a.attr("href").map(|href| (a, href)))
        .find(|(_, href)| DETAIL_MARKERS.iter().any(|m| href.contains(m)))
    {
        let title = match non_empty(&anchor.text) {
            Some(text) => Some(text),
            None => non_empty(&row.cell_text(DESCRIPTION_CELL)?),
        };
        return Ok(Found {
            title: title.map(|t| (t, LinkSource::DetailLink)),
            url: Some((Candidate::plain(href), LinkSource::DetailLink)),
        });
    }

    Ok(Found {
        title: None,
        url: anchors
            .iter()
            .find_map(|a| a.attr("href"))
            .map(|href| (Candidate::plain(href), LinkSource::FirstLink)),
    })
}

fn description_text(row: &dyn RowHandle) -> Result<Found, RowError> {
    Ok(Found {
        title: non_empty(&row.cell_text(DESCRIPTION_CELL)?).map(|t| (t, LinkSource::CellText)),
        url: None,
    })
}

/// Turn a raw link value into an absolute http(s) URL, or `None` if it
/// cannot be made into one.
fn normalize_url(candidate: &Candidate, site: &SiteConfig) -> Option<String> {
    let raw = candidate.raw.trim();
    if raw.is_empty() {
        return None;
    }

    let scripted = candidate.scripted || raw.contains("javascript:") || raw.contains("onclick");
    let target = if scripted {
        match script_target(raw) {
            Some(target) => {
                debug!("Extracted URL from script: {}", target);
                target
            }
            None => return None,
        }
    } else {
        raw.to_string()
    };

    let absolute = absolutize(&target, site);
    match Url::parse(&absolute) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Some(parsed.to_string()),
        _ => None,
    }
}

/// Absolute URL embedded in script text, else a quoted site-relative path
fn script_target(script: &str) -> Option<String> {
    static ABSOLUTE: OnceLock<Regex> = OnceLock::new();
    static QUOTED_PATH: OnceLock<Regex> = OnceLock::new();

    let absolute =
        ABSOLUTE.get_or_init(|| Regex::new(r#"(?i)https?://[^\s'"]+"#).expect("static pattern"));
    if let Some(m) = absolute.find(script) {
        return Some(m.as_str().to_string());
    }

    let quoted =
        QUOTED_PATH.get_or_init(|| Regex::new(r#"['"](/[^'"\s]*)['"]"#).expect("static pattern"));
    quoted.captures(script).map(|caps| caps[1].to_string())
}

fn absolutize(url: &str, site: &SiteConfig) -> String {
    if has_http_scheme(url) {
        url.to_string()
    } else if url.starts_with("//") {
        format!("https:{}", url)
    } else if url.starts_with('/') {
        format!("{}{}", site.origin(), url)
    } else if site.known_hosts.iter().any(|host| url.starts_with(host.as_str())) {
        format!("https://{}", url)
    } else {
        format!("{}/{}", site.origin(), url)
    }
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn image_filename(key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{:x}_{}.jpg", hasher.finish(), stamp)
}

fn preview(text: &str) -> String {
    text.chars().take(30).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::criteria::matches;
    use crate::scrapers::row::HtmlRow;
    use crate::scrapers::traits::SkipImages;
    use crate::scrapers::types::FilterCriteria;
    use scraper::{Html, Selector};
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Records every request and pretends each download succeeded
    #[derive(Default)]
    struct RecordingDownloader {
        requests: RefCell<Vec<(String, String)>>,
    }

    impl ImageDownloader for RecordingDownloader {
        fn download(&self, url: &str, filename: &str) -> Option<PathBuf> {
            self.requests.borrow_mut().push((url.to_string(), filename.to_string()));
            Some(PathBuf::from("images").join(filename))
        }
    }

    struct FailingDownloader;

    impl ImageDownloader for FailingDownloader {
        fn download(&self, _url: &str, _filename: &str) -> Option<PathBuf> {
            None
        }
    }

    fn with_row<T>(cells: &[&str], f: impl FnOnce(&HtmlRow) -> T) -> T {
        let cells: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
        let html = format!("<table><tbody><tr>{}</tr></tbody></table>", cells);
        let doc = Html::parse_document(&html);
        let selector = Selector::parse("tr").unwrap();
        let row = HtmlRow::new(doc.select(&selector).next().unwrap()).unwrap();
        f(&row)
    }

    fn standard_cells<'a>(photo: &'a str, description: &'a str, amazon: &'a str) -> [&'a str; 7] {
        [
            photo,
            description,
            amazon,
            "Brand New",
            "Cincinnati - School Road",
            "Sunday 5PM",
            "$12.00",
        ]
    }

    fn extract(cells: &[&str]) -> Option<AuctionRecord> {
        let site = SiteConfig::default();
        let extractor = RecordExtractor::new(&site, &SkipImages);
        with_row(cells, |row| extractor.extract(row, "Cat"))
    }

    #[test]
    fn short_rows_are_rejected() {
        for n in 0..MIN_CELLS {
            let cells = vec!["x"; n];
            assert_eq!(extract(&cells), None, "{} cells", n);
        }
    }

    #[test]
    fn direct_link_row_extracts_every_field() {
        let cells = standard_cells("", r#"<a href="/item/55">Cat Tower</a>"#, "");
        let record = extract(&cells).unwrap();

        assert_eq!(
            record,
            AuctionRecord {
                title: "Cat Tower".to_string(),
                url: Some("https://www.bidft.auction/item/55".to_string()),
                current_bid: "$12.00".to_string(),
                end_time: "Sunday 5PM".to_string(),
                location: "Cincinnati - School Road".to_string(),
                condition: "Brand New".to_string(),
                image_url: None,
                image_path: None,
                search_term: "Cat".to_string(),
            }
        );

        let criteria = FilterCriteria {
            locations: vec!["Cincinnati - School Road".to_string()],
            conditions: vec!["Brand New".to_string()],
        };
        assert!(matches(&record, &criteria));
    }

    #[test]
    fn row_without_any_link_keeps_its_title() {
        let record = extract(&standard_cells("", "Woven Rug 5x7", "")).unwrap();

        assert_eq!(record.title, "Woven Rug 5x7");
        assert_eq!(record.url, None);
    }

    #[test]
    fn row_without_title_text_is_dropped() {
        assert_eq!(extract(&standard_cells("", "   ", "")), None);
    }

    #[test]
    fn onclick_handler_yields_embedded_url() {
        let cell = concat!(
            r#"<span onclick="window.open('https://www.bidft.auction/itemDetails/9', '_blank')">"#,
            "Litter Box</span>"
        );
        let site = SiteConfig::default();

        let resolution =
            with_row(&standard_cells("", cell, ""), |row| resolve_link(row, &site)).unwrap();
        assert_eq!(resolution.title, Some(("Litter Box".to_string(), LinkSource::Clickable)));
        assert_eq!(
            resolution.url,
            Some(("https://www.bidft.auction/itemDetails/9".to_string(), LinkSource::Clickable))
        );
    }

    #[test]
    fn onclick_with_relative_path_is_resolved() {
        let cell = r#"<div onclick="location.href='/item/77'">Trash Can</div>"#;
        let record = extract(&standard_cells("", cell, "")).unwrap();
        assert_eq!(record.url.as_deref(), Some("https://www.bidft.auction/item/77"));
    }

    #[test]
    fn script_without_a_target_never_becomes_a_url() {
        let cell = r#"<div onclick="openItem(42)">Trash Can</div>"#;
        let record = extract(&standard_cells("", cell, "")).unwrap();

        assert_eq!(record.title, "Trash Can");
        assert_eq!(record.url, None);
    }

    #[test]
    fn data_attributes_are_used_when_there_is_no_handler() {
        let cell = r#"<div class="item-clickable" data-url="www.bidfta.com/item/3">Rug</div>"#;
        let record = extract(&standard_cells("", cell, "")).unwrap();
        assert_eq!(record.url.as_deref(), Some("https://www.bidfta.com/item/3"));

        let cell = r#"<div data-href="item/4">Rug</div>"#;
        let record = extract(&standard_cells("", cell, "")).unwrap();
        assert_eq!(record.url.as_deref(), Some("https://www.bidft.auction/item/4"));
    }

    #[test]
    fn detail_link_elsewhere_in_row_beats_first_link() {
        let site = SiteConfig::default();
        let cells = standard_cells(
            r#"<a href="/photos/1"><img src="/img/1.jpg"></a>"#,
            "Cat Bed",
            r#"<a href="/itemDetails/5">View item</a>"#,
        );

        let resolution = with_row(&cells, |row| resolve_link(row, &site)).unwrap();
        assert_eq!(resolution.title, Some(("View item".to_string(), LinkSource::DetailLink)));
        assert_eq!(
            resolution.url,
            Some(("https://www.bidft.auction/itemDetails/5".to_string(), LinkSource::DetailLink))
        );
    }

    #[test]
    fn empty_detail_link_takes_description_as_title() {
        let site = SiteConfig::default();
        let detail = r#"<a href="/itemDetails/5"><img src="/i.jpg"></a>"#;
        let cells = standard_cells("", "Cat Bed", detail);

        let resolution = with_row(&cells, |row| resolve_link(row, &site)).unwrap();
        assert_eq!(resolution.title, Some(("Cat Bed".to_string(), LinkSource::DetailLink)));
    }

    #[test]
    fn first_link_is_a_low_confidence_fallback() {
        let site = SiteConfig::default();
        let cells = standard_cells(r#"<a href="/photos/1">photo</a>"#, "Cat Bed", "");

        let resolution = with_row(&cells, |row| resolve_link(row, &site)).unwrap();
        let (url, source) = resolution.url.unwrap();
        assert_eq!(url, "https://www.bidft.auction/photos/1");
        assert!(source.is_low_confidence());
        assert_eq!(resolution.title, Some(("Cat Bed".to_string(), LinkSource::CellText)));
    }

    #[test]
    fn title_and_url_can_come_from_different_strategies() {
        let site = SiteConfig::default();
        let detail = r#"<a href="https://www.bidft.auction/auction/8">go</a>"#;
        let cells = standard_cells("", r#"<a>Cat Tree</a>"#, detail);

        let resolution = with_row(&cells, |row| resolve_link(row, &site)).unwrap();
        assert_eq!(resolution.title, Some(("Cat Tree".to_string(), LinkSource::DirectLink)));
        assert_eq!(
            resolution.url,
            Some(("https://www.bidft.auction/auction/8".to_string(), LinkSource::DetailLink))
        );
    }

    #[test]
    fn extracted_urls_are_always_absolute() {
        let descriptions = [
            r#"<a href="/item/1">A</a>"#,
            r#"<a href="item/2">B</a>"#,
            r#"<a href="//cdn.bidft.auction/item/3">C</a>"#,
            r#"<a href="javascript:void(0)">D</a>"#,
            r#"<span onclick="go('https://www.bidft.auction/item/5')">E</span>"#,
            r#"<span data-url="www.bidft.auction/item/6">F</span>"#,
            r#"<a href="HTTPS://www.bidft.auction/item/7">H</a>"#,
            r#"<span onclick="go('HTTP://www.bidft.auction/item/8')">I</span>"#,
            "G",
        ];

        for description in descriptions {
            let record = extract(&standard_cells("", description, "")).unwrap();
            if let Some(url) = &record.url {
                assert!(
                    url.starts_with("http://") || url.starts_with("https://"),
                    "{} gave {}",
                    description,
                    url
                );
            }
        }
    }

    #[test]
    fn upper_case_scheme_is_normalized() {
        let record = extract(&standard_cells(
            r#"<img src="HTTPS://cdn.bidft.auction/55.jpg">"#,
            r#"<a href="HTTPS://www.bidft.auction/item/1">X</a>"#,
            "",
        ))
        .unwrap();

        assert_eq!(record.url.as_deref(), Some("https://www.bidft.auction/item/1"));
        assert_eq!(record.image_url.as_deref(), Some("https://cdn.bidft.auction/55.jpg"));
    }

    #[test]
    fn relative_image_is_resolved_and_downloaded() {
        let site = SiteConfig::default();
        let downloader = RecordingDownloader::default();
        let extractor = RecordExtractor::new(&site, &downloader);
        let cells = standard_cells(
            r#"<img src="/images/55.jpg">"#,
            r#"<a href="/item/55">Cat Tower</a>"#,
            "",
        );

        let record = with_row(&cells, |row| extractor.extract(row, "Cat")).unwrap();

        assert_eq!(record.image_url.as_deref(), Some("https://www.bidft.auction/images/55.jpg"));
        let requests = downloader.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "https://www.bidft.auction/images/55.jpg");
        assert!(requests[0].1.ends_with(".jpg"));
        assert_eq!(record.image_path, Some(PathBuf::from("images").join(&requests[0].1)));
    }

    #[test]
    fn failed_image_download_keeps_the_record() {
        let site = SiteConfig::default();
        let extractor = RecordExtractor::new(&site, &FailingDownloader);
        let photo = r#"<img src="https://cdn.example.com/55.jpg">"#;
        let cells = standard_cells(photo, "Cat Tower", "");

        let record = with_row(&cells, |row| extractor.extract(row, "Cat")).unwrap();
        assert_eq!(record.image_url.as_deref(), Some("https://cdn.example.com/55.jpg"));
        assert_eq!(record.image_path, None);
    }

    #[test]
    fn rows_without_images_skip_the_downloader() {
        let site = SiteConfig::default();
        let downloader = RecordingDownloader::default();
        let extractor = RecordExtractor::new(&site, &downloader);

        with_row(&standard_cells("", "Cat Tower", ""), |row| {
            extractor.extract(row, "Cat")
        })
        .unwrap();
        assert!(downloader.requests.borrow().is_empty());
    }
}
