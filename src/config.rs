use crate::scrapers::types::{FilterCriteria, SiteConfig, WeekEnd, WindowMode};
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TERMS: &[&str] = &["Cat", "Trash", "Rug"];

const DEFAULT_LOCATIONS: &[&str] = &[
    "Cincinnati - West Seymour Ave",
    "Cincinnati - West Seymour Ave.",
    "Springdale - Commons Drive",
    "Cincinnati - School Road",
    "Cincinnati - Colerain Ave",
    "Cincinnati - Colerain Ave.",
    "Cincinnati - Waycross Rd CWY",
];

const DEFAULT_CONDITIONS: &[&str] = &["Appears New", "Brand New"];

const DEFAULT_PRIORITY_2: &[&str] = &["Cincinnati - West Seymour Ave"];

const DEFAULT_PRIORITY_1: &[&str] = &["Springdale - Commons Drive", "Cincinnati - School Road"];

/// Browser pacing and limits
#[derive(Debug, Clone)]
pub struct ScrapingConfig {
    pub headless: bool,
    /// Fixed settle time after navigation
    pub page_load_delay: Duration,
    /// Upper bound on waiting for result rows
    pub wait_timeout: Duration,
    pub delay_between_searches: Duration,
    pub max_rows_per_term: Option<usize>,
    /// Log a preview of the page body when a search finds no rows
    pub show_page: bool,
}

/// Branches highlighted in the report
#[derive(Debug, Clone, Default)]
pub struct PriorityConfig {
    pub highest: Vec<String>,
    pub preferred: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub images_dir: PathBuf,
    pub log_file: PathBuf,
}

/// Startup configuration, assembled once and read-only afterwards
#[derive(Debug, Clone)]
pub struct Config {
    pub search_terms: Vec<String>,
    pub criteria: FilterCriteria,
    pub site: SiteConfig,
    pub window: WindowMode,
    pub scraping: ScrapingConfig,
    pub priority: PriorityConfig,
    pub output: OutputConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let list = |key: &str, default: &[&str]| -> Vec<String> {
            match lookup(key) {
                Some(raw) => split_list(&raw),
                None => default.iter().map(|s| s.to_string()).collect(),
            }
        };

        let search_terms = list("SEARCH_TERMS", DEFAULT_TERMS);
        if search_terms.is_empty() {
            bail!("SEARCH_TERMS must name at least one term");
        }

        let criteria = FilterCriteria {
            locations: list("ALLOWED_LOCATIONS", DEFAULT_LOCATIONS),
            conditions: list("ALLOWED_CONDITIONS", DEFAULT_CONDITIONS),
        };
        if criteria.locations.is_empty() {
            bail!("ALLOWED_LOCATIONS must name at least one location");
        }
        if criteria.conditions.is_empty() {
            bail!("ALLOWED_CONDITIONS must name at least one condition");
        }

        let defaults = SiteConfig::default();
        let site = SiteConfig {
            base_url: lookup("BASE_URL").unwrap_or(defaults.base_url),
            search_path: lookup("SEARCH_PATH").unwrap_or(defaults.search_path),
            known_hosts: match lookup("KNOWN_HOSTS") {
                Some(raw) => split_list(&raw),
                None => defaults.known_hosts,
            },
        };
        url::Url::parse(&site.base_url)
            .with_context(|| format!("BASE_URL is not a valid URL: {}", site.base_url))?;

        let window = match lookup("WEEK_END").as_deref().map(str::to_ascii_lowercase) {
            None => WindowMode::default(),
            Some(v) if v == "sunday" => WindowMode::Week(WeekEnd::Sunday),
            Some(v) if v == "saturday" => WindowMode::Week(WeekEnd::Saturday),
            Some(other) => bail!("WEEK_END must be 'saturday' or 'sunday', got '{}'", other),
        };

        let secs = |key: &str, default: u64| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a whole number of seconds", key)),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let flag = |key: &str, default: bool| -> Result<bool> {
            match lookup(key) {
                Some(raw) => parse_bool(&raw)
                    .with_context(|| format!("{} is not a boolean: {}", key, raw)),
                None => Ok(default),
            }
        };

        let max_rows_per_term = lookup("MAX_ROWS_PER_TERM")
            .map(|raw| raw.trim().parse::<usize>())
            .transpose()
            .context("MAX_ROWS_PER_TERM must be a positive integer")?;

        let scraping = ScrapingConfig {
            headless: flag("HEADLESS", true)?,
            page_load_delay: secs("PAGE_LOAD_DELAY_SECS", 8)?,
            wait_timeout: secs("WAIT_TIMEOUT_SECS", 10)?,
            delay_between_searches: secs("DELAY_BETWEEN_SEARCHES_SECS", 2)?,
            max_rows_per_term,
            show_page: flag("SHOW_PAGE", false)?,
        };

        let output_dir =
            PathBuf::from(lookup("OUTPUT_DIR").unwrap_or_else(|| "scraper_output".to_string()));
        let images_dir = lookup("IMAGES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.join("images"));
        let log_file = lookup("LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.join("auction_scraper.log"));

        Ok(Self {
            search_terms,
            criteria,
            site,
            window,
            scraping,
            priority: PriorityConfig {
                highest: list("PRIORITY_2_LOCATIONS", DEFAULT_PRIORITY_2),
                preferred: list("PRIORITY_1_LOCATIONS", DEFAULT_PRIORITY_1),
            },
            output: OutputConfig {
                output_dir,
                images_dir,
                log_file,
            },
        })
    }
}

/// Comma-separated list, trimmed, empties and repeats dropped, order kept
fn split_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
