//! Tunnel process supervision for surveyhop.
//!
//! Wraps an OpenVPN-compatible binary: resolves it, materializes
//! credentials, spawns the process, classifies its output until the
//! connection is up, and tears everything down afterwards.

pub mod classify;
pub mod credentials;
pub mod resolve;
pub mod supervisor;

pub use classify::{LineClass, classify};
pub use credentials::{CredentialFile, CredentialSource, provision};
pub use resolve::resolve_binary;
pub use supervisor::{Launch, TunnelSession, TunnelState, TunnelSupervisor};
