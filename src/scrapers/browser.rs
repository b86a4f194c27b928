use crate::scrapers::traits::{BrowserError, PageSource};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless Chrome session with a single tab.
///
/// Dropping the session closes the tab and then the browser process, so the
/// session is released on every exit path of whoever owns it.
pub struct ChromeSession {
    tab: Arc<Tab>,
    page_load_delay: Duration,
    // Kept last so the tab closes before the process goes away
    _browser: Browser,
}

impl ChromeSession {
    /// Launch Chrome and open the tab every search will reuse
    pub fn launch(headless: bool, page_load_delay: Duration) -> Result<Self, BrowserError> {
        info!("Launching headless Chrome (headless={})...", headless);

        let args: Vec<&OsStr> = vec![
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-gpu"),
        ];

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .sandbox(false)
            .window_size(Some((1920, 1080)))
            .args(args)
            .build()
            .map_err(|e| BrowserError::Launch(format!("invalid launch options: {}", e)))?;

        let browser = Browser::new(options).map_err(|e| BrowserError::Launch(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::Launch(format!("could not open tab: {}", e)))?;

        tab.set_user_agent(USER_AGENT, None, None)
            .map_err(|e| BrowserError::Launch(format!("could not set user agent: {}", e)))?;

        Ok(Self {
            tab,
            page_load_delay,
            _browser: browser,
        })
    }
}

impl PageSource for ChromeSession {
    fn load(&mut self, url: &str) -> Result<(), BrowserError> {
        let nav_err = |e: anyhow::Error| BrowserError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };

        self.tab.navigate_to(url).map_err(nav_err)?;
        self.tab.wait_until_navigated().map_err(nav_err)?;

        // Results render client-side after navigation completes
        debug!("Waiting {:?} for page to render...", self.page_load_delay);
        thread::sleep(self.page_load_delay);

        Ok(())
    }

    fn wait_for_any(&self, selectors: &[&str], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(found) = selectors.iter().find(|s| self.tab.find_element(s).is_ok()) {
                debug!("Page ready, matched '{}'", found);
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn content(&self) -> Result<String, BrowserError> {
        let result = self
            .tab
            .evaluate("document.documentElement.outerHTML", false)
            .map_err(|e| BrowserError::Content(e.to_string()))?;

        match result.value.as_ref().and_then(|v| v.as_str()) {
            Some(html) => {
                debug!("Captured {} bytes of HTML", html.len());
                Ok(html.to_string())
            }
            None => Err(BrowserError::Content("page returned no HTML".to_string())),
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        info!("Closing browser session");
        if let Err(e) = self.tab.close(true) {
            warn!("Failed to close tab cleanly: {}", e);
        }
    }
}
