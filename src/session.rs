use async_trait::async_trait;

use crate::error::Result;

/// A live, single-owner browser page.
///
/// The navigation loop borrows the session mutably for the length of a run,
/// so no two runs can drive the same page at once. [`crate::Page`] is the
/// chromiumoxide-backed implementation.
#[async_trait]
pub trait Session: Send {
    /// Navigate to `url` and wait for it to load.
    async fn open(&mut self, url: &str) -> Result<()>;

    /// PNG bytes of the visible viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    async fn current_url(&mut self) -> Result<String>;

    /// Left click at viewport coordinates.
    async fn dispatch_click(&mut self, x: f64, y: f64) -> Result<()>;

    async fn dispatch_scroll(&mut self, dx: i64, dy: i64) -> Result<()>;

    /// Insert text into the focused element.
    async fn insert_text(&mut self, text: &str) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}
