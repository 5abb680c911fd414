//! Headless browser lifecycle.
//!
//! Every vote attempt gets a fresh browser with a throwaway profile;
//! cookies or cached consent from one exit must not leak into the next.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::BrowserError;

const READY_ATTEMPTS: u32 = 30;
const READY_INTERVAL: Duration = Duration::from_millis(200);

fn find_browser() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    const CANDIDATES: &[&str] = &[
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];

    #[cfg(not(target_os = "macos"))]
    const CANDIDATES: &[&str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ];

    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}

/// A running browser bound to one debugging port.
///
/// Holds the process (kill-on-drop) and its temporary profile directory;
/// both disappear with the value.
pub struct BrowserProcess {
    child: Child,
    endpoint: String,
    _profile: TempDir,
}

impl BrowserProcess {
    /// Launch a browser and wait until its debug endpoint answers.
    pub async fn launch(debug_port: u16, headless: bool) -> Result<Self, BrowserError> {
        let binary = find_browser().ok_or(BrowserError::BrowserNotFound)?;
        let profile = tempfile::Builder::new()
            .prefix("surveyhop-profile-")
            .tempdir()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let mut command = Command::new(&binary);
        command
            .arg(format!("--remote-debugging-port={}", debug_port))
            .arg(format!("--user-data-dir={}", profile.path().display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if headless {
            command.arg("--headless=new");
        }

        info!("Launching {} on port {}", binary.display(), debug_port);
        let child = command
            .spawn()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let process = Self {
            child,
            endpoint: format!("http://localhost:{}", debug_port),
            _profile: profile,
        };
        process.wait_until_ready().await?;
        Ok(process)
    }

    /// Poll the version endpoint until the browser answers.
    async fn wait_until_ready(&self) -> Result<(), BrowserError> {
        for attempt in 0..READY_ATTEMPTS {
            tokio::time::sleep(READY_INTERVAL).await;
            if reqwest::get(format!("{}/json/version", self.endpoint))
                .await
                .is_ok()
            {
                debug!("Browser ready after {} probes", attempt + 1);
                return Ok(());
            }
        }
        Err(BrowserError::NotReady(READY_INTERVAL * READY_ATTEMPTS))
    }

    /// The HTTP debugging endpoint, e.g. `http://localhost:9222`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Kill the browser. The profile directory goes with the value.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill browser: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_browser_does_not_panic() {
        // May or may not find one depending on the machine.
        let _ = find_browser();
    }
}
