use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page as CrPage;
use chromiumoxide::page::ScreenshotParams;

use crate::error::{Error, Result};
use crate::session::Session;

/// Wrapper around a chromiumoxide Page exposing the coordinate-level input
/// a vision-driven agent needs.
pub struct Page {
    inner: CrPage,
    default_timeout: Duration,
}

impl Page {
    pub(crate) fn new(inner: CrPage, default_timeout: Duration) -> Self {
        Self { inner, default_timeout }
    }

    /// Returns a reference to the underlying chromiumoxide Page.
    pub fn inner(&self) -> &CrPage {
        &self.inner
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Navigate to the given URL and wait for the page to load, bounded by
    /// the configured default timeout.
    pub async fn goto(&self, url: &str) -> Result<()> {
        match tokio::time::timeout(self.default_timeout, self.inner.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(Error::NavigationError(e.to_string())),
            Err(_) => Err(Error::NavigationError(format!(
                "Timed out after {:?} loading {url}",
                self.default_timeout
            ))),
        }
    }

    /// Get the current page URL.
    pub async fn url(&self) -> Result<String> {
        self.inner
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    /// Get the current page title.
    pub async fn title(&self) -> Result<String> {
        let result = self
            .inner
            .evaluate("document.title")
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(result.into_value::<String>().unwrap_or_default())
    }

    // ── Input ───────────────────────────────────────────────────────

    /// Dispatch a left mouse click at viewport coordinates.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        self.inner
            .click(Point { x, y })
            .await
            .map_err(|e| Error::InputError(format!("click at ({x}, {y}): {e}")))?;
        Ok(())
    }

    /// Scroll the window by the given offsets in pixels.
    pub async fn scroll_by(&self, dx: i64, dy: i64) -> Result<()> {
        let js = format!("window.scrollBy({dx}, {dy})");
        self.inner
            .evaluate(js)
            .await
            .map_err(|e| Error::InputError(format!("scroll by ({dx}, {dy}): {e}")))?;
        Ok(())
    }

    /// Insert text into whatever element currently has focus.
    pub async fn insert_text(&self, text: &str) -> Result<()> {
        self.inner
            .execute(InsertTextParams::new(text))
            .await
            .map_err(|e| Error::InputError(format!("insert text: {e}")))?;
        Ok(())
    }

    // ── Observations ────────────────────────────────────────────────

    /// Take a screenshot of the visible viewport (PNG format).
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.inner
            .screenshot(params)
            .await
            .map_err(|e| Error::ScreenshotError(e.to_string()))
    }

    /// Close this page (tab).
    pub async fn close(&self) -> Result<()> {
        self.inner
            .clone()
            .close()
            .await
            .map_err(Error::CdpError)
    }
}

#[async_trait]
impl Session for Page {
    async fn open(&mut self, url: &str) -> Result<()> {
        self.goto(url).await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Page::screenshot(self).await
    }

    async fn current_url(&mut self) -> Result<String> {
        self.url().await
    }

    async fn dispatch_click(&mut self, x: f64, y: f64) -> Result<()> {
        self.click_at(x, y).await
    }

    async fn dispatch_scroll(&mut self, dx: i64, dy: i64) -> Result<()> {
        self.scroll_by(dx, dy).await
    }

    async fn insert_text(&mut self, text: &str) -> Result<()> {
        Page::insert_text(self, text).await
    }

    async fn close(&mut self) -> Result<()> {
        Page::close(self).await
    }
}
