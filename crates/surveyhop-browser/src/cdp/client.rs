//! CDP browser connection.
//!
//! One WebSocket to the browser endpoint carries every command, for every
//! attached page. Responses are matched back to callers by id through a
//! shared pending map; the receive loop runs on its own task for the life
//! of the connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::SinkExt;
use futures::stream::{SplitSink, SplitStream, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
pub(crate) type PendingMap = parking_lot::Mutex<HashMap<u64, PendingRequest>>;

/// How long one command may take before its caller gets a timeout.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// A caller waiting for the response to one command id.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// Connection to one browser instance.
pub struct CdpClient {
    http_endpoint: String,
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    request_id: Arc<AtomicU64>,
    pending: Arc<PendingMap>,
    recv_task: JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a browser over its debugging endpoint, e.g.
    /// `http://localhost:9222`.
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let version: BrowserVersion = reqwest::get(format!("{}/json/version", endpoint))
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| CdpError::InvalidResponse(e.to_string()))?;

        debug!("Connecting to {}", version.browser);

        let (ws, _) = connect_async(&version.web_socket_debugger_url).await?;
        let (ws_tx, ws_rx) = ws.split();

        let pending: Arc<PendingMap> = Arc::new(parking_lot::Mutex::new(HashMap::new()));
        let recv_task = tokio::spawn(receive_loop(ws_rx, pending.clone()));

        Ok(Self {
            http_endpoint: endpoint.to_string(),
            ws_tx: Arc::new(tokio::sync::Mutex::new(ws_tx)),
            request_id: Arc::new(AtomicU64::new(1)),
            pending,
            recv_task,
        })
    }

    /// Send one browser-level command and await its response.
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        send_command(
            &self.ws_tx,
            &self.pending,
            &self.request_id,
            method,
            params,
            None,
        )
        .await
    }

    /// Open a new tab and attach to it.
    pub async fn new_page(&self, url: Option<&str>) -> Result<PageSession, CdpError> {
        let mut endpoint = format!("{}/json/new", self.http_endpoint);
        if let Some(url) = url {
            endpoint.push_str(&format!("?{}", url));
        }
        let page: PageInfo = reqwest::Client::new()
            .put(&endpoint)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CdpError::InvalidResponse(e.to_string()))?;

        debug!("Opened page {} ({})", page.id, page.url);

        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({ "targetId": page.id, "flatten": true })),
            )
            .await?;
        let session_id = result
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                CdpError::InvalidResponse("attachToTarget returned no sessionId".to_string())
            })?
            .to_string();

        let session = PageSession::new(
            page.id,
            session_id,
            self.ws_tx.clone(),
            self.pending.clone(),
            self.request_id.clone(),
        );
        session.enable_domains().await?;
        Ok(session)
    }

    /// Close a tab.
    pub async fn close_page(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({ "targetId": target_id })))
            .await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

/// Route incoming frames to their waiting callers until the socket closes.
async fn receive_loop(mut ws_rx: SplitStream<WsStream>, pending: Arc<PendingMap>) {
    while let Some(message) = ws_rx.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let response: CdpResponse = match serde_json::from_str(&text) {
            Ok(response) => response,
            Err(e) => {
                warn!("Unparseable CDP frame: {}", e);
                continue;
            }
        };

        // Frames without an id are events; nothing here subscribes to any.
        let Some(id) = response.id else { continue };
        let Some(request) = pending.lock().remove(&id) else {
            continue;
        };

        let result = match response.error {
            Some(error) => Err(CdpError::Protocol {
                code: error.code,
                message: error.message,
            }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };
        let _ = request.tx.send(result);
    }

    // Socket gone: wake every waiter instead of letting them time out.
    for (_, request) in pending.lock().drain() {
        let _ = request.tx.send(Err(CdpError::SessionClosed));
    }
}

/// Shared send path for the client and its page sessions.
pub(crate) async fn send_command(
    ws_tx: &tokio::sync::Mutex<WsSink>,
    pending: &PendingMap,
    request_id: &AtomicU64,
    method: &str,
    params: Option<Value>,
    session_id: Option<&str>,
) -> Result<Value, CdpError> {
    let id = request_id.fetch_add(1, Ordering::SeqCst);
    let request = CdpRequest {
        id,
        method: method.to_string(),
        params,
        session_id: session_id.map(|s| s.to_string()),
    };
    let payload = serde_json::to_string(&request)?;

    let (tx, rx) = oneshot::channel();
    pending.lock().insert(id, PendingRequest { tx });

    {
        let mut ws = ws_tx.lock().await;
        if let Err(e) = ws.send(Message::Text(payload.into())).await {
            pending.lock().remove(&id);
            return Err(e.into());
        }
    }

    match tokio::time::timeout(CALL_TIMEOUT, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(CdpError::SessionClosed),
        Err(_) => {
            pending.lock().remove(&id);
            Err(CdpError::Timeout(format!(
                "{} took longer than {:?}",
                method, CALL_TIMEOUT
            )))
        }
    }
}
