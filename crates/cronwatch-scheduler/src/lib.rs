//! `cronwatch-scheduler` — job execution and observability over a trigger engine.
//!
//! # Overview
//!
//! A [`Controller`] wraps user logic ([`Task`]) in a [`Job`], hands the
//! trigger engine a callback for it and keeps the job in its registry. Each
//! firing runs through the controller's interceptor [`Chain`] while holding
//! the job's run lock, so firings of one entry never overlap.
//!
//! # Job states
//!
//! | Status    | Meaning                                  |
//! |-----------|------------------------------------------|
//! | `Up`      | Registered, never run                    |
//! | `Running` | A firing is executing                    |
//! | `Idle`    | Last run succeeded                       |
//! | `Error`   | Last run failed; see `error`             |
//! | `Down`    | Removed, or the controller was stopped   |

pub mod context;
pub mod controller;
pub mod global;
pub mod interceptor;
pub mod job;
pub mod metadata;
pub mod schedule;
pub mod sink;
pub mod task;
pub mod trigger;

mod sync;

pub use context::Context;
pub use controller::{Controller, ControllerBuilder};
pub use global::{default, global, init};
pub use interceptor::{
    request_id, AssignRequestId, Chain, ChainBuilder, Interceptor, Logger, Next, Recover,
    RequestId, WorkerPool,
};
pub use job::Job;
pub use metadata::{job_metadata, with_job_metadata, JobMetadata};
pub use schedule::Schedule;
pub use sink::{ErrorSink, TracingSink};
pub use task::{func, task_name, Func, Task, NAMELESS};
pub use trigger::{CronTrigger, EntryTimes, ManualTrigger, Trigger};

pub use cronwatch_core::{
    Config, CronwatchError, EntryId, JobSnapshot, Location, Result, StatusCode,
};
