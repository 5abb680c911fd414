//! Browser automation for surveyhop.
//!
//! Launches a throwaway Chrome, drives it over the DevTools protocol, and
//! runs the scripted survey vote against it.

pub mod cdp;
pub mod error;
pub mod launcher;
pub mod page;
pub mod survey;

pub use error::BrowserError;
pub use launcher::BrowserProcess;
pub use page::{CdpPage, PageDriver};
pub use survey::{SurveyScript, VoteExecutor};
