//! The scripted survey vote.
//!
//! One [`SurveyScript`] run is one vote attempt: navigate, dismiss the
//! consent dialog if it shows up, find the answer section for the anchor
//! text, read the count, click, read the count again. The step logic is
//! written against [`PageDriver`]; [`VoteExecutor`] wires it to a real
//! browser.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use surveyhop_core::{ActionFailure, ActionOutcome, PageAction, Settings};

use crate::cdp::{CdpClient, CdpError};
use crate::error::BrowserError;
use crate::launcher::BrowserProcess;
use crate::page::{CdpPage, PageDriver};

/// The survey page and its markup. The selectors are the stable class
/// names of the survey widget.
pub const PAGE_URL: &str = "https://nachodsky.denik.cz/zpravy_region/anketa-nejpopularnejsi-dobrovolni-hasici-na-nachodsku-2025.html";
pub const TARGET_TEXT: &str = "SDH Bukovice";
pub const CONSENT_SELECTOR: &str = "button#didomi-notice-agree-button";
pub const PROGRESS_SELECTOR: &str = ".survey__progress-text";
pub const BUTTON_SELECTOR: &str = "button.survey__answer-btn";
pub const VOTES_SELECTOR: &str = ".survey__progress-text-result";

/// Levels from the progress label up to the answer section root.
pub const ANCESTOR_LEVELS: usize = 4;

/// How often the section locator re-probes the page.
const PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// What the section probe found.
struct SectionProbe {
    votes: String,
    x: f64,
    y: f64,
}

/// One vote attempt, step by step.
pub struct SurveyScript {
    url: String,
    anchor_text: String,
    action_timeout: Duration,
    consent_settle: Duration,
    click_settle: Duration,
}

impl SurveyScript {
    pub fn new(settings: &Settings) -> Self {
        Self {
            url: PAGE_URL.to_string(),
            anchor_text: TARGET_TEXT.to_string(),
            action_timeout: settings.action_timeout,
            consent_settle: settings.consent_settle,
            click_settle: settings.click_settle,
        }
    }

    /// Run the vote flow on an open page.
    ///
    /// Only the consent step is allowed to fail quietly; everything else
    /// stops the attempt with the failure it hit.
    pub async fn run(&self, driver: &mut dyn PageDriver) -> ActionOutcome {
        if let Err(e) = driver.goto(&self.url, self.action_timeout).await {
            debug!("Navigation failed: {}", e);
            return ActionOutcome::Failure(ActionFailure::NavigationTimeout);
        }

        if let Err(reason) = self.accept_consent(driver).await {
            debug!("Proceeding without consent dialog: {}", reason);
        }

        let before = match self.locate(driver).await {
            Ok(Some(probe)) => probe,
            Ok(None) => return ActionOutcome::Failure(ActionFailure::TargetNotFound),
            Err(e) => {
                debug!("Section probe failed: {}", e);
                return ActionOutcome::Failure(ActionFailure::TargetNotFound);
            }
        };
        debug!(
            "Answer section located, current count {:?}, button at ({:.0}, {:.0})",
            before.votes, before.x, before.y
        );

        if let Err(e) = driver.click_at(before.x, before.y).await {
            debug!("Vote click failed: {}", e);
            return ActionOutcome::Failure(ActionFailure::ClickTimeout);
        }

        tokio::time::sleep(self.click_settle).await;

        // Same locator as the before-read, so both counts are guaranteed
        // to come from the same answer section.
        let after = match self.locate(driver).await {
            Ok(Some(probe)) => probe.votes,
            _ => return ActionOutcome::Failure(ActionFailure::TargetNotFound),
        };

        ActionOutcome::Success {
            votes_before: before.votes,
            votes_after: after,
        }
    }

    /// Best effort: the dialog only exists for fresh profiles in some
    /// regions, so a miss is expected and the flow continues without it.
    /// A dismissed dialog gets a settle pause before the page is read.
    async fn accept_consent(&self, driver: &mut dyn PageDriver) -> Result<(), ActionFailure> {
        let appeared = driver
            .await_selector(CONSENT_SELECTOR, self.action_timeout)
            .await
            .map_err(|_| ActionFailure::ConsentTimeout)?;
        if !appeared {
            return Err(ActionFailure::ConsentTimeout);
        }
        driver
            .click_selector(CONSENT_SELECTOR)
            .await
            .map_err(|_| ActionFailure::ConsentTimeout)?;
        debug!("Consent dialog dismissed");
        tokio::time::sleep(self.consent_settle).await;
        Ok(())
    }

    /// Resolve the answer section for the anchor text, polling until the
    /// action deadline. `Ok(None)` means the section never appeared.
    async fn locate(
        &self,
        driver: &mut dyn PageDriver,
    ) -> Result<Option<SectionProbe>, CdpError> {
        let expression = section_probe(&self.anchor_text);
        let deadline = Instant::now() + self.action_timeout;
        loop {
            let value = driver.evaluate(&expression).await?;
            if value.get("found").and_then(|v| v.as_bool()) == Some(true) {
                let votes = value
                    .get("votes")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                let x = value.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let y = value.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0);
                return Ok(Some(SectionProbe { votes, x, y }));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(PROBE_INTERVAL).await;
        }
    }
}

/// Build the probe expression for one anchor text.
///
/// The probe finds the progress label containing the anchor, climbs to
/// the section root, and reports the vote count plus the center of the
/// answer button. Every read and the click target come from this one
/// resolver, so they can never disagree about which section is meant.
fn section_probe(anchor: &str) -> String {
    let anchor = serde_json::to_string(anchor).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
    const anchor = {anchor};
    const labels = Array.from(document.querySelectorAll('{progress}'));
    const label = labels.find(el => (el.textContent || '').includes(anchor));
    if (!label) return {{ found: false }};
    let section = label;
    for (let i = 0; i < {levels}; i++) {{
        if (!section.parentElement) return {{ found: false }};
        section = section.parentElement;
    }}
    const button = section.querySelector('{button}');
    const votes = section.querySelector('{votes}');
    if (!button || !votes) return {{ found: false }};
    button.scrollIntoView({{ block: 'center' }});
    const box = button.getBoundingClientRect();
    return {{
        found: true,
        votes: votes.textContent || '',
        x: box.x + box.width / 2,
        y: box.y + box.height / 2,
    }};
}})()"#,
        anchor = anchor,
        progress = PROGRESS_SELECTOR,
        levels = ANCESTOR_LEVELS,
        button = BUTTON_SELECTOR,
        votes = VOTES_SELECTOR,
    )
}

/// Performs one vote attempt through a freshly launched browser.
///
/// Every cycle gets its own browser and throwaway profile: cookies or a
/// remembered consent from a previous exit would change what the next
/// exit sees.
pub struct VoteExecutor {
    settings: Settings,
}

impl VoteExecutor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    async fn vote_once(&self) -> Result<ActionOutcome, BrowserError> {
        let browser =
            BrowserProcess::launch(self.settings.debug_port, self.settings.headless).await?;

        let outcome = async {
            let client = CdpClient::connect(browser.endpoint()).await?;
            let session = client.new_page(None).await?;
            let mut page = CdpPage::new(session);
            let outcome = SurveyScript::new(&self.settings).run(&mut page).await;
            let _ = client.close_page(page.session().target_id()).await;
            Ok::<_, BrowserError>(outcome)
        }
        .await;

        browser.shutdown().await;
        outcome
    }
}

#[async_trait]
impl PageAction for VoteExecutor {
    async fn execute(&self) -> ActionOutcome {
        match self.vote_once().await {
            Ok(outcome) => outcome,
            // The browser never became drivable; for the cycle record that
            // reads the same as a page that never loaded.
            Err(e) => {
                warn!("Browser-side failure: {}", e);
                ActionOutcome::Failure(ActionFailure::NavigationTimeout)
            }
        }
    }
}

#[cfg(test)]
#[path = "survey_tests.rs"]
mod tests;
