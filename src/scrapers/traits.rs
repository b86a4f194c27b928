use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },
    #[error("failed to capture page content: {0}")]
    Content(String),
}

/// A rendered page the pipeline can drive.
/// One session is reused serially for every search term.
pub trait PageSource {
    /// Navigate to `url` and wait for the navigation to settle
    fn load(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Wait until any selector matches, or `timeout` passes. `false` on timeout.
    fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> bool;

    /// Current document HTML
    fn content(&self) -> Result<String, BrowserError>;
}

/// Fetches listing images. Failures are absorbed and reported as `None`.
pub trait ImageDownloader {
    fn download(&self, url: &str, filename: &str) -> Option<PathBuf>;
}

/// Downloader that never fetches anything
pub struct SkipImages;

impl ImageDownloader for SkipImages {
    fn download(&self, _url: &str, _filename: &str) -> Option<PathBuf> {
        None
    }
}
