mod config;
mod models;
mod pipeline;
mod report;
mod scrapers;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use config::Config;
use pipeline::Digest;
use report::{sample_digest, DigestSink, FileSink};
use scrapers::types::WindowMode;
use scrapers::{
    compute_window, ChromeSession, HttpImageDownloader, ImageDownloader, SearchOrchestrator,
    SkipImages,
};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Weekly auction search digest", long_about = None)]
struct Cli {
    /// Search only this term instead of the configured list
    #[arg(long)]
    term: Option<String>,

    /// Ignore the weekly window (30 days back to 30 days ahead)
    #[arg(long)]
    all_dates: bool,

    /// Process at most this many rows per term
    #[arg(long)]
    max_rows: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    no_headless: bool,

    /// Skip image downloads
    #[arg(long)]
    no_images: bool,

    /// Print a summary instead of writing the digest
    #[arg(long)]
    dry_run: bool,

    /// Log the start of the page text when a search finds no rows
    #[arg(long)]
    show_page: bool,

    /// Deliver a fixed sample digest without scraping
    #[arg(long)]
    email_only: bool,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Invalid configuration")?;
    init_logging(cli.verbose, &config.output.log_file)?;

    info!("🏷️ Auction Scout");
    info!("==========================================");

    if cli.all_dates {
        config.window = WindowMode::all_dates();
    }
    if cli.max_rows.is_some() {
        config.scraping.max_rows_per_term = cli.max_rows;
    }
    if cli.no_headless {
        config.scraping.headless = false;
    }
    if cli.show_page {
        config.scraping.show_page = true;
    }

    let terms = match &cli.term {
        Some(term) => vec![term.clone()],
        None => config.search_terms.clone(),
    };
    info!("Search terms: {}", terms.join(", "));

    let sink = FileSink::new(&config.output.output_dir, config.priority.clone());

    if cli.email_only {
        info!("Delivering sample digest via {}", sink.sink_name());
        let window = compute_window(&Local::now(), config.window);
        return sink
            .deliver(&sample_digest(window))
            .await
            .context("Failed to deliver sample digest");
    }

    let outcome = match scrape(config, terms, cli.no_images).await {
        Ok(digest) if cli.dry_run => {
            print_summary(&digest);
            Ok(())
        }
        Ok(digest) => sink.deliver(&digest).await.context("Failed to deliver digest"),
        Err(e) => Err(e),
    };

    if let Err(e) = &outcome {
        let message = format!("{:#}", e);
        if let Err(notify_err) = sink.notify_failure(&message).await {
            error!(
                "Failed to send failure notification via {}: {:#}",
                sink.sink_name(),
                notify_err
            );
        }
    } else {
        info!("✅ Run completed");
    }

    outcome
}

/// Console output plus a plain-text copy appended to `log_file`
fn init_logging(verbose: bool, log_file: &Path) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let file = open_log_file(log_file)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Run the browser pipeline off the async runtime; Chrome and the image
/// client both block.
async fn scrape(config: Config, terms: Vec<String>, no_images: bool) -> Result<Digest> {
    let digest = tokio::task::spawn_blocking(move || -> Result<Digest> {
        let window = compute_window(&Local::now(), config.window);

        let images: Box<dyn ImageDownloader> = if no_images {
            Box::new(SkipImages)
        } else {
            Box::new(HttpImageDownloader::new(&config.output.images_dir)?)
        };

        let orchestrator = SearchOrchestrator::new(&config, window, images.as_ref());
        orchestrator.run(&terms, || {
            ChromeSession::launch(config.scraping.headless, config.scraping.page_load_delay)
        })
    })
    .await
    .context("Scrape task panicked")??;

    info!("Scraping completed. Found {} auctions.", digest.total());
    Ok(digest)
}

fn print_summary(digest: &Digest) {
    println!("\n==============================");
    println!("TOTAL AUCTIONS FOUND: {}", digest.total());
    println!("==============================\n");

    for group in &digest.groups {
        println!("🔍 {} ({} items)", group.term, group.records.len());
        for (i, record) in group.records.iter().enumerate() {
            println!("{}. {}", i + 1, record.title);
            println!(
                "   Bid: {} | Ends: {} | {}",
                record.current_bid, record.end_time, record.location
            );
            println!("   URL: {}", record.url.as_deref().unwrap_or("No URL"));
        }
        println!();
    }

    println!("No digest was written (dry run)");
}
