//! Page driver seam.
//!
//! The survey script is written against this trait so its step logic can
//! run against a scripted fake in tests. [`CdpPage`] is the real
//! implementation over an attached CDP session.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::cdp::{CdpError, PageSession};

/// The minimal page surface the vote flow needs.
#[async_trait]
pub trait PageDriver: Send {
    /// Navigate and wait for the document to become usable.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), CdpError>;

    /// Wait until a selector matches. `Ok(false)` means the deadline
    /// passed without a match.
    async fn await_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, CdpError>;

    /// Click the first element matching the selector.
    async fn click_selector(&mut self, selector: &str) -> Result<(), CdpError>;

    /// Click at page coordinates.
    async fn click_at(&mut self, x: f64, y: f64) -> Result<(), CdpError>;

    /// Run a JavaScript expression and return its value.
    async fn evaluate(&mut self, expression: &str) -> Result<Value, CdpError>;
}

/// [`PageDriver`] over a live CDP page session.
pub struct CdpPage {
    session: PageSession,
}

impl CdpPage {
    pub fn new(session: PageSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), CdpError> {
        self.session.navigate(url, timeout).await
    }

    async fn await_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, CdpError> {
        match self.session.wait_for_selector(selector, timeout).await {
            Ok(()) => Ok(true),
            Err(CdpError::Timeout(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn click_selector(&mut self, selector: &str) -> Result<(), CdpError> {
        self.session.click_selector(selector).await
    }

    async fn click_at(&mut self, x: f64, y: f64) -> Result<(), CdpError> {
        self.session.click(x, y).await
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Value, CdpError> {
        self.session.evaluate(expression).await
    }
}
