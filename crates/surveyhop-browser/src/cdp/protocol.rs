//! CDP wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One outgoing command.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// An incoming frame. Frames without an id are events and are dropped;
/// serde ignores their extra fields.
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
}

/// Error payload inside a response frame.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Reply of the `/json/new` endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub url: String,
}

/// Reply of the `/json/version` endpoint.
#[derive(Debug, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// `DOM.getBoxModel` content quad and dimensions.
#[derive(Debug, Deserialize)]
pub struct BoxModel {
    pub content: Vec<f64>,
    pub width: f64,
    pub height: f64,
}
