//! Browser lifecycle management using Chrome DevTools Protocol

use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use skiff_core::config::BrowserSettings;
use skiff_core::{ImageEncoding, Result, SkiffError};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// JPEG quality for screenshot capture
const JPEG_QUALITY: u32 = 75;

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Bound on page-load waiting; exceeding it is a partial load, not an error
    pub navigation_timeout_secs: u64,
    /// Screenshot encoding
    pub image_format: ImageEncoding,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 800,
            navigation_timeout_secs: 30,
            image_format: ImageEncoding::Jpeg,
        }
    }
}

impl From<&BrowserSettings> for BrowserConfig {
    fn from(settings: &BrowserSettings) -> Self {
        Self {
            headless: settings.headless,
            window_width: settings.window_width,
            window_height: settings.window_height,
            navigation_timeout_secs: settings.navigation_timeout_secs,
            image_format: settings.image_format,
        }
    }
}

/// Scroll direction for the `scroll` tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Pixel delta applied by one scroll step
    pub fn delta(&self) -> i32 {
        match self {
            ScrollDirection::Up => -600,
            ScrollDirection::Down => 600,
        }
    }
}

impl FromStr for ScrollDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(ScrollDirection::Up),
            "down" => Ok(ScrollDirection::Down),
            other => Err(format!("Invalid scroll direction: {}. Use up or down.", other)),
        }
    }
}

impl std::fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrollDirection::Up => write!(f, "up"),
            ScrollDirection::Down => write!(f, "down"),
        }
    }
}

/// Reject URLs the browser should never be pointed at
pub fn validate_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url)
        .map_err(|e| SkiffError::Navigation(format!("Malformed URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(SkiffError::Navigation(format!(
            "Unsupported URL scheme '{}' in '{}'",
            scheme, url
        ))),
    }
}

/// Active browser session with Chrome DevTools Protocol
///
/// One of these exists per server process; every connected client
/// observes the same page.
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
    /// Configuration
    config: BrowserConfig,
    /// Whether any navigation has landed on a page yet
    has_page: bool,
    /// URL of the last navigation
    current_url: Option<String>,
}

impl BrowserSession {
    /// Launch a new browser instance with default configuration
    pub fn launch() -> Result<Self> {
        Self::launch_with_config(BrowserConfig::default())
    }

    /// Launch browser with custom configuration
    pub fn launch_with_config(config: BrowserConfig) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            config.headless, config.window_width, config.window_height
        );

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .build()
            .map_err(|e| SkiffError::Browser(format!("Failed to launch browser: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| SkiffError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| SkiffError::Browser(format!("Failed to create tab: {}", e)))?;

        tab.set_default_timeout(Duration::from_secs(config.navigation_timeout_secs));

        info!("Browser launched successfully");

        Ok(Self {
            browser,
            tab,
            config,
            has_page: false,
            current_url: None,
        })
    }

    /// Navigate to a URL
    ///
    /// Fails with a navigation error on a malformed URL or when the host
    /// is unreachable after one retry. A page that is still loading when
    /// the bounded wait expires is tolerated as a partial load.
    pub fn navigate(&mut self, url: &str) -> Result<()> {
        let parsed = validate_url(url)?;
        debug!("Navigating to {}", parsed);

        if let Err(first) = self.tab.navigate_to(parsed.as_str()) {
            warn!("Navigation to {} failed ({}), retrying once", url, first);
            self.tab.navigate_to(parsed.as_str()).map_err(|e| {
                SkiffError::Navigation(format!("Failed to navigate to {}: {}", url, e))
            })?;
        }

        // Bounded load wait; a timeout here means partial content, which
        // the agent can still observe
        if let Err(e) = self.tab.wait_until_navigated() {
            warn!("Load wait for {} expired: {} (continuing with partial page)", url, e);
        }

        self.has_page = true;
        self.current_url = Some(parsed.to_string());
        info!("Navigated to {}", url);
        Ok(())
    }

    /// Scroll the viewport; best-effort, no-ops when no page is loaded
    pub fn scroll(&self, direction: ScrollDirection) {
        if !self.has_page {
            debug!("Scroll {} ignored, no page loaded", direction);
            return;
        }

        let script = format!("window.scrollBy(0, {})", direction.delta());
        if let Err(e) = self.tab.evaluate(&script, false) {
            warn!("Scroll {} failed: {}", direction, e);
        }
    }

    /// Visible text content of the current page; empty when no page is loaded
    pub fn extract_text(&self) -> Result<String> {
        if !self.has_page {
            return Ok(String::new());
        }

        let result = self
            .tab
            .evaluate("document.body ? document.body.innerText : ''", false)
            .map_err(|e| SkiffError::Browser(format!("Text extraction failed: {}", e)))?;

        Ok(result
            .value
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default())
    }

    /// Capture the current viewport as encoded image bytes
    pub fn screenshot(&self) -> Result<Vec<u8>> {
        if !self.has_page {
            return Err(SkiffError::Capture("No page loaded".to_string()));
        }

        let (format, quality) = match self.config.image_format {
            ImageEncoding::Jpeg => (CaptureScreenshotFormatOption::Jpeg, Some(JPEG_QUALITY)),
            ImageEncoding::Png => (CaptureScreenshotFormatOption::Png, None),
        };

        let data = self
            .tab
            .capture_screenshot(format, quality, None, true)
            .map_err(|e| SkiffError::Capture(format!("CDP capture failed: {}", e)))?;

        debug!("Captured screenshot ({} bytes)", data.len());
        Ok(data)
    }

    /// Whether any navigation has completed in this session
    pub fn has_page(&self) -> bool {
        self.has_page
    }

    /// URL of the last successful navigation
    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Screenshot encoding this session captures with
    pub fn image_format(&self) -> ImageEncoding {
        self.config.image_format
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}
