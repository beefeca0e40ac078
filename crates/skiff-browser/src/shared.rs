//! Process-wide shared browser session
//!
//! Single-operator model: one live browser per server process, shared by
//! every channel. [`SharedBrowser`] is the explicit single-owner wrapper;
//! callers serialize turns above it, the internal mutex guards the
//! session itself.
//!
//! The browser is launched lazily by the first `navigate`. Until then the
//! other operations report their documented no-page behavior instead of
//! dragging a Chrome process up for nothing.
//!
//! The underlying CDP calls are synchronous and can block for the whole
//! navigation timeout, so every session operation runs on the blocking
//! thread pool. Status reads (`is_launched`, `current_url`) come from
//! separate state and never wait on an in-flight browser call.

use crate::browser::{BrowserConfig, BrowserSession, ScrollDirection};
use skiff_core::{BrowserState, Result, SkiffError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Seam between the agent loop and the browser automation library
///
/// Production uses [`SharedBrowser`]; tests substitute a scripted fake.
#[async_trait::async_trait]
pub trait BrowserControl: Send + Sync + 'static {
    /// Navigate to a URL, tolerating partial loads
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Best-effort viewport scroll; never fails a turn
    async fn scroll(&self, direction: ScrollDirection) -> Result<()>;

    /// Visible text of the current page, empty when no page is loaded
    async fn extract_text(&self) -> Result<String>;

    /// Current viewport as an encoded image
    async fn screenshot(&self) -> Result<BrowserState>;
}

/// The one browser session the whole process shares
pub struct SharedBrowser {
    config: BrowserConfig,
    session: Mutex<Option<BrowserSession>>,
    launched: AtomicBool,
    current_url: RwLock<Option<String>>,
}

impl SharedBrowser {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
            launched: AtomicBool::new(false),
            current_url: RwLock::new(None),
        }
    }

    /// Whether the underlying browser has been launched yet
    pub async fn is_launched(&self) -> bool {
        self.launched.load(Ordering::SeqCst)
    }

    /// URL of the page all channels currently observe
    pub async fn current_url(&self) -> Option<String> {
        self.current_url.read().await.clone()
    }

    /// Run one synchronous session operation on the blocking pool
    ///
    /// Returns `None` when no session exists. The session mutex stays held
    /// for the duration, which is the serialization the single browser
    /// needs; the runtime workers themselves are free to make progress.
    async fn with_session<R, F>(&self, f: F) -> Result<Option<R>>
    where
        F: FnOnce(&mut BrowserSession) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut guard = self.session.lock().await;
        let Some(mut session) = guard.take() else {
            return Ok(None);
        };

        let (session, out) = tokio::task::spawn_blocking(move || {
            let out = f(&mut session);
            (session, out)
        })
        .await
        .map_err(|e| SkiffError::Browser(format!("Browser task failed: {}", e)))?;

        *guard = Some(session);
        Ok(Some(out))
    }
}

#[async_trait::async_trait]
impl BrowserControl for SharedBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut guard = self.session.lock().await;

        if guard.is_none() {
            info!("First navigation, launching shared browser");
            let config = self.config.clone();
            let session = tokio::task::spawn_blocking(move || {
                BrowserSession::launch_with_config(config)
            })
            .await
            .map_err(|e| SkiffError::Browser(format!("Browser task failed: {}", e)))??;
            *guard = Some(session);
            self.launched.store(true, Ordering::SeqCst);
        }

        let mut session = guard.take().ok_or_else(|| {
            SkiffError::Browser("Browser session unavailable".to_string())
        })?;

        let target = url.to_string();
        let (session, result) = tokio::task::spawn_blocking(move || {
            let result = session.navigate(&target);
            (session, result)
        })
        .await
        .map_err(|e| SkiffError::Browser(format!("Browser task failed: {}", e)))?;

        *self.current_url.write().await = session.current_url().map(String::from);
        *guard = Some(session);
        result
    }

    async fn scroll(&self, direction: ScrollDirection) -> Result<()> {
        // No session means no page; scrolling is defined as a no-op then
        self.with_session(move |session| session.scroll(direction))
            .await?;
        Ok(())
    }

    async fn extract_text(&self) -> Result<String> {
        match self.with_session(|session| session.extract_text()).await? {
            Some(result) => result,
            None => Ok(String::new()),
        }
    }

    async fn screenshot(&self) -> Result<BrowserState> {
        match self
            .with_session(|session| {
                let format = session.image_format();
                session.screenshot().map(|image| (image, format))
            })
            .await?
        {
            Some(Ok((image, format))) => Ok(BrowserState::new(image, format)),
            Some(Err(e)) => Err(e),
            None => Err(SkiffError::Capture("No page loaded".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // These exercise the no-page paths, which never touch Chrome.

    #[tokio::test]
    async fn test_unlaunched_scroll_is_noop() {
        let browser = SharedBrowser::new(BrowserConfig::default());
        assert!(browser.scroll(ScrollDirection::Down).await.is_ok());
        assert!(!browser.is_launched().await);
    }

    #[tokio::test]
    async fn test_unlaunched_extract_text_is_empty() {
        let browser = SharedBrowser::new(BrowserConfig::default());
        assert_eq!(browser.extract_text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_unlaunched_screenshot_is_capture_error() {
        let browser = SharedBrowser::new(BrowserConfig::default());
        let err = browser.screenshot().await.unwrap_err();
        assert!(matches!(err, SkiffError::Capture(_)));
    }

    #[tokio::test]
    async fn test_unlaunched_has_no_url() {
        let browser = SharedBrowser::new(BrowserConfig::default());
        assert_eq!(browser.current_url().await, None);
    }

    #[tokio::test]
    async fn test_status_reads_bypass_session_lock() {
        // Status must answer while a browser operation holds the session,
        // e.g. a navigation waiting out its load timeout
        let browser = SharedBrowser::new(BrowserConfig::default());
        let _held = browser.session.lock().await;

        let launched = tokio::time::timeout(Duration::from_millis(100), browser.is_launched())
            .await
            .expect("is_launched blocked on the session lock");
        assert!(!launched);

        let url = tokio::time::timeout(Duration::from_millis(100), browser.current_url())
            .await
            .expect("current_url blocked on the session lock");
        assert_eq!(url, None);
    }
}
