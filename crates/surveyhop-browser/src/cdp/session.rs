//! One attached page target.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::debug;

use super::client::{PendingMap, WsSink, send_command};
use super::error::CdpError;
use super::protocol::BoxModel;

/// How often selector and readiness polls re-check the page.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A command channel to one page, scoped by CDP session id.
///
/// The session shares the client's socket and pending map; it only adds
/// the `sessionId` routing field to every command.
pub struct PageSession {
    target_id: String,
    session_id: String,
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pending: Arc<PendingMap>,
    request_id: Arc<AtomicU64>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<PendingMap>,
        request_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        send_command(
            &self.ws_tx,
            &self.pending,
            &self.request_id,
            method,
            params,
            Some(&self.session_id),
        )
        .await
    }

    /// Enable the domains the vote flow relies on.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        Ok(())
    }

    /// Navigate and wait for the document to become usable.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), CdpError> {
        let result = self
            .call("Page.navigate", Some(json!({ "url": url })))
            .await?;
        if let Some(error) = result.get("errorText").and_then(|v| v.as_str()) {
            if !error.is_empty() {
                return Err(CdpError::NavigationFailed(error.to_string()));
            }
        }
        self.wait_for_load(timeout).await
    }

    /// Poll `document.readyState` until the page is at least interactive.
    async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.evaluate("document.readyState").await?;
            if let Some(state) = state.as_str() {
                if state == "complete" || state == "interactive" {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(CdpError::Timeout(format!(
                    "page did not finish loading within {:?}",
                    timeout
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Run an expression and return its value. Promises are awaited.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception
                .pointer("/exception/description")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown JavaScript error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Find a node by CSS selector. `Ok(None)` when nothing matches.
    pub async fn query_selector(&self, selector: &str) -> Result<Option<i64>, CdpError> {
        let doc = self
            .call(
                "DOM.getDocument",
                Some(json!({ "depth": -1, "pierce": true })),
            )
            .await?;
        let root_id = doc
            .pointer("/root/nodeId")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| CdpError::InvalidResponse("document has no root".to_string()))?;

        let found = self
            .call(
                "DOM.querySelector",
                Some(json!({ "nodeId": root_id, "selector": selector })),
            )
            .await?;
        let node_id = found.get("nodeId").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok((node_id != 0).then_some(node_id))
    }

    /// Box model for a node. `Ok(None)` for nodes without layout.
    pub async fn get_box_model(&self, node_id: i64) -> Result<Option<BoxModel>, CdpError> {
        let result = self
            .call("DOM.getBoxModel", Some(json!({ "nodeId": node_id })))
            .await;
        match result {
            Ok(value) => {
                let model = value
                    .get("model")
                    .cloned()
                    .ok_or_else(|| CdpError::InvalidResponse("missing box model".to_string()))?;
                Ok(Some(serde_json::from_value(model)?))
            }
            // Code -32000 is how the browser says the node exists but is
            // not rendered.
            Err(CdpError::Protocol { code: -32000, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Synthesize a primary-button click at page coordinates.
    pub async fn click(&self, x: f64, y: f64) -> Result<(), CdpError> {
        for event_type in ["mousePressed", "mouseReleased"] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event_type,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                })),
            )
            .await?;
        }
        Ok(())
    }

    /// Click the center of the first node matching `selector`.
    pub async fn click_selector(&self, selector: &str) -> Result<(), CdpError> {
        let node_id = self
            .query_selector(selector)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(selector.to_string()))?;
        let model = self
            .get_box_model(node_id)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(format!("{} has no layout", selector)))?;
        let (x, y) = quad_center(&model.content);
        debug!("Clicking {} at ({:.0}, {:.0})", selector, x, y);
        self.click(x, y).await
    }

    /// Poll until `selector` matches, or fail at the deadline.
    pub async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), CdpError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.query_selector(selector).await?.is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CdpError::Timeout(format!(
                    "selector {} did not appear within {:?}",
                    selector, timeout
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// Center of a CDP quad (four corner x/y pairs).
fn quad_center(quad: &[f64]) -> (f64, f64) {
    if quad.len() < 8 {
        return (0.0, 0.0);
    }
    let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
    let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_center() {
        let quad = [10.0, 20.0, 110.0, 20.0, 110.0, 60.0, 10.0, 60.0];
        assert_eq!(quad_center(&quad), (60.0, 40.0));
    }

    #[test]
    fn test_quad_center_rejects_short_quads() {
        assert_eq!(quad_center(&[1.0, 2.0]), (0.0, 0.0));
        assert_eq!(quad_center(&[]), (0.0, 0.0));
    }
}
