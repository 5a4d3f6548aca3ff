//! `cronwatch-dashboard` — read-only HTTP view over registered jobs.
//!
//! | Route       | Response                                   |
//! |-------------|--------------------------------------------|
//! | `/`         | Embedded HTML table polling `/api/jobs`    |
//! | `/api/jobs` | JSON array of [`JobSnapshot`]s             |
//! | `/health`   | Liveness check with job count              |
//!
//! [`JobSnapshot`]: cronwatch_core::JobSnapshot

pub mod app;
pub mod http;

pub use app::{build_router, serve, DashboardState};
