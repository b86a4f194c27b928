use crate::scrapers::traits::ImageDownloader;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Saves listing images into a local directory
pub struct HttpImageDownloader {
    client: Client,
    dir: PathBuf,
}

impl HttpImageDownloader {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create image directory {}", dir.display()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            dir: dir.to_path_buf(),
        })
    }

    fn fetch(&self, url: &str, filename: &str) -> Result<PathBuf> {
        let response = self.client.get(url).send()?.error_for_status()?;
        let bytes = response.bytes()?;

        let path = self.dir.join(filename);
        fs::write(&path, &bytes)?;
        debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

impl ImageDownloader for HttpImageDownloader {
    fn download(&self, url: &str, filename: &str) -> Option<PathBuf> {
        if url.is_empty() || url.starts_with("data:") {
            return None;
        }

        match self.fetch(url, filename) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to download image {}: {}", url, e);
                None
            }
        }
    }
}
