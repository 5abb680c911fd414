//! Errors produced while bringing a tunnel up or tearing it down.

use thiserror::Error;

/// Tunnel lifecycle errors.
///
/// Every variant here ends the cycle for the current configuration only;
/// the runner records it and moves on to the next one.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// The run was misconfigured. Detected before any process is spawned.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No usable tunnel binary was found.
    #[error("Tunnel binary not found: {0}")]
    BinaryNotFound(String),

    /// The process asked for credentials but none were configured.
    #[error("Tunnel requires authentication but no credentials were configured")]
    AuthRequired,

    /// The process exited before reaching the connected state.
    #[error("Tunnel process exited before connecting (exit code: {code:?})")]
    Exited { code: Option<i32> },

    /// No connected signature appeared within the deadline.
    #[error("Tunnel did not connect within {0} seconds")]
    ConnectTimeout(u64),

    /// I/O failure while spawning or supervising the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
