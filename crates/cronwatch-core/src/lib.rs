//! `cronwatch-core` — configuration, error taxonomy and the shared job view.
//!
//! Kept free of any runtime so the dashboard and scheduler crates can both
//! depend on it.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, Location};
pub use error::{CronwatchError, Result};
pub use types::{EntryId, EntrySource, JobSnapshot, StatusCode};
