//! Core types for surveyhop.
//!
//! This crate defines the pieces shared by the tunnel and browser layers:
//! run settings, tunnel configuration handles, cycle outcomes, and the
//! [`Runner`] that walks a set of configurations and performs one vote
//! attempt per tunnel exit.

pub mod config;
pub mod discovery;
pub mod error;
pub mod outcome;
pub mod runner;

pub use config::{Settings, TunnelConfig};
pub use discovery::discover_configs;
pub use error::TunnelError;
pub use outcome::{ActionFailure, ActionOutcome, CycleRecord, RunReport};
pub use runner::{PageAction, Runner, TunnelGuard, TunnelProvider};
