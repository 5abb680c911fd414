//! Browser-side error type.

use std::time::Duration;

use thiserror::Error;

use crate::cdp::CdpError;

/// Errors from launching or driving the browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("No Chrome or Chromium binary found")]
    BrowserNotFound,

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Browser did not accept connections within {0:?}")]
    NotReady(Duration),

    #[error(transparent)]
    Cdp(#[from] CdpError),
}
