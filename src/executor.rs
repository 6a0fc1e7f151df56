use std::time::Duration;

use crate::config::NavigatorConfig;
use crate::element::{ActionVerb, DetectedElement};
use crate::error::Result;
use crate::session::Session;

/// Turns a chosen element into input events on the session.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    click_settle: Duration,
    type_settle: Duration,
    scroll_settle: Duration,
    scroll_delta: i64,
}

impl ActionExecutor {
    pub fn new(config: &NavigatorConfig) -> Self {
        Self {
            click_settle: config.click_settle,
            type_settle: config.type_settle,
            scroll_settle: config.scroll_settle,
            scroll_delta: config.scroll_delta,
        }
    }

    /// Dispatch the element's suggested action, then wait for the page to
    /// settle. Errors are returned as-is; the loop decides they are not fatal.
    ///
    /// `type` clicks the element to focus it and enters `text` when given.
    pub async fn execute<S>(&self, session: &mut S, element: &DetectedElement, text: Option<&str>) -> Result<()>
    where
        S: Session + ?Sized,
    {
        let (x, y) = element.center();
        match element.action {
            ActionVerb::Click => {
                session.dispatch_click(f64::from(x), f64::from(y)).await?;
                settle(self.click_settle).await;
            }
            ActionVerb::Type => {
                session.dispatch_click(f64::from(x), f64::from(y)).await?;
                settle(self.type_settle).await;
                if let Some(text) = text {
                    session.insert_text(text).await?;
                }
            }
            ActionVerb::Scroll => {
                session.dispatch_scroll(0, self.scroll_delta).await?;
                settle(self.scroll_settle).await;
            }
        }
        tracing::debug!(action = element.action.as_str(), x, y, "action dispatched");
        Ok(())
    }
}

async fn settle(interval: Duration) {
    if !interval.is_zero() {
        tokio::time::sleep(interval).await;
    }
}
