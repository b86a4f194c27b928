use crate::config::PriorityConfig;
use crate::models::{AuctionRecord, DateWindow};
use crate::pipeline::criteria::contains_any;
use crate::pipeline::Digest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Receives the finished digest, or the reason there is none
#[async_trait]
pub trait DigestSink: Send + Sync {
    async fn deliver(&self, digest: &Digest) -> Result<()>;

    /// Tell the operator the run failed
    async fn notify_failure(&self, error: &str) -> Result<()>;

    fn sink_name(&self) -> &'static str;
}

/// Writes text and JSON reports into the output directory
pub struct FileSink {
    output_dir: PathBuf,
    priority: PriorityConfig,
}

impl FileSink {
    pub fn new(output_dir: &Path, priority: PriorityConfig) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            priority,
        }
    }

    async fn write(&self, filename: &str, contents: String) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;

        let path = self.output_dir.join(filename);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[async_trait]
impl DigestSink for FileSink {
    async fn deliver(&self, digest: &Digest) -> Result<()> {
        let stamp = file_stamp(&digest.generated_at.with_timezone(&Local));

        let text = render_text(digest, &self.priority);
        let text_path = self.write(&format!("auctions_{}.txt", stamp), text).await?;
        info!("Results saved to: {}", text_path.display());

        let json = serde_json::to_string_pretty(digest)?;
        let json_path = self.write(&format!("auctions_{}.json", stamp), json).await?;
        info!("Saved digest JSON to {}", json_path.display());

        Ok(())
    }

    async fn notify_failure(&self, message: &str) -> Result<()> {
        let now = Local::now();
        error!("Auction scrape failed: {}", message);

        let body = format!(
            "Auction Scraper Failed\n{}\n\nError Details:\n{}\n",
            now.format("%B %d, %Y at %I:%M %p"),
            message
        );
        let path = self.write(&format!("failure_{}.txt", file_stamp(&now)), body).await?;
        info!("Failure report saved to: {}", path.display());
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "file"
    }
}

/// 2 for the most preferred branches, 1 for preferred ones, else 0
pub fn location_priority(location: &str, priority: &PriorityConfig) -> u8 {
    if contains_any(location, &priority.highest) {
        2
    } else if contains_any(location, &priority.preferred) {
        1
    } else {
        0
    }
}

/// Plain-text report, one section per search term
pub fn render_text(digest: &Digest, priority: &PriorityConfig) -> String {
    let mut out = String::new();
    let generated = digest.generated_at.with_timezone(&Local);

    let _ = writeln!(out, "Auction Report");
    let _ = writeln!(out, "Generated: {}", generated.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(
        out,
        "Window: {} to {}",
        digest.window.start().format("%Y-%m-%d"),
        digest.window.end().format("%Y-%m-%d")
    );
    let _ = writeln!(out, "Total auctions found: {}", digest.total());
    let _ = writeln!(out, "{}\n", "=".repeat(50));

    if digest.is_empty() {
        let terms: Vec<&str> = digest.groups.iter().map(|g| g.term.as_str()).collect();
        let _ = writeln!(out, "No auctions found matching your criteria.");
        let _ = writeln!(out, "Search terms: {}", terms.join(", "));
        return out;
    }

    let summary: Vec<String> = digest
        .groups
        .iter()
        .map(|g| format!("{}: {}", g.term, g.records.len()))
        .collect();
    let _ = writeln!(out, "{}\n", summary.join(" | "));

    for group in &digest.groups {
        let _ = writeln!(out, "[{}] {} items", group.term, group.records.len());

        for (i, record) in group.records.iter().enumerate() {
            let badge = match location_priority(&record.location, priority) {
                2 => " **",
                1 => " *",
                _ => "",
            };
            let _ = writeln!(out, "{}. {}", i + 1, record.title);
            let _ = writeln!(out, "   URL: {}", record.url.as_deref().unwrap_or("N/A"));
            let _ = writeln!(out, "   Current Bid: {}", record.current_bid);
            let _ = writeln!(out, "   End Time: {}", record.end_time);
            let _ = writeln!(out, "   Location: {}{}", record.location, badge);
            let _ = writeln!(out, "   Condition: {}", record.condition);
            let _ = writeln!(out, "   Image URL: {}", record.image_url.as_deref().unwrap_or("N/A"));
            let _ = writeln!(out, "{}", "-".repeat(30));
        }
        out.push('\n');
    }

    out
}

/// Fixed two-listing digest for checking delivery without scraping
pub fn sample_digest(window: DateWindow) -> Digest {
    let listings = [
        (
            "Cat",
            "Brand New Cat Litter Box with Lid",
            123456,
            "$25.50",
            "Ends Sunday 8:00 PM",
            "Cincinnati - West Seymour Ave",
            "Brand New",
        ),
        (
            "Trash",
            "Heavy Duty Trash Can 32 Gallon",
            789012,
            "$15.00",
            "Ends Saturday 6:30 PM",
            "Springdale - Commons Drive",
            "Appears New",
        ),
    ];

    let records = listings
        .iter()
        .enumerate()
        .map(|(i, (term, title, id, bid, end, location, condition))| AuctionRecord {
            title: title.to_string(),
            url: Some(format!("https://www.bidft.auction/auction/{}", id)),
            current_bid: bid.to_string(),
            end_time: end.to_string(),
            location: location.to_string(),
            condition: condition.to_string(),
            image_url: Some(format!("https://example.com/image{}.jpg", i + 1)),
            image_path: None,
            search_term: term.to_string(),
        })
        .collect();
    let terms: Vec<String> = listings.iter().map(|l| l.0.to_string()).collect();

    Digest::build(&terms, records, window)
}

fn file_stamp(at: &DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
