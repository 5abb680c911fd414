//! Chrome DevTools Protocol plumbing.
//!
//! A thin client over one WebSocket: commands go out with an id, the
//! receive loop routes responses back by id. Only the handful of domains
//! the vote flow needs are wired up.

mod client;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use session::PageSession;
