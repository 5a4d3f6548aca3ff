use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Opaque identifier assigned by the trigger engine to one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntryId {
    fn from(id: u64) -> Self {
        EntryId(id)
    }
}

/// Lifecycle state of a registered job.
///
/// `Up` → `Running` → `Idle` | `Error` → `Running` … `Down` is only reached
/// through removal or controller shutdown, never through a run outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// Registered, never run.
    #[default]
    Up,
    Running,
    /// Last run succeeded.
    Idle,
    Down,
    /// Last run failed.
    Error,
}

impl StatusCode {
    /// Compact representation used for lock-free storage.
    pub const fn as_u8(self) -> u8 {
        match self {
            StatusCode::Up => 0,
            StatusCode::Running => 1,
            StatusCode::Idle => 2,
            StatusCode::Down => 3,
            StatusCode::Error => 4,
        }
    }

    /// Unknown values decode as `Up`.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => StatusCode::Running,
            2 => StatusCode::Idle,
            3 => StatusCode::Down,
            4 => StatusCode::Error,
            _ => StatusCode::Up,
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatusCode::Up => "UP",
            StatusCode::Running => "RUNNING",
            StatusCode::Idle => "IDLE",
            StatusCode::Down => "DOWN",
            StatusCode::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StatusCode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "UP" => Ok(StatusCode::Up),
            "RUNNING" => Ok(StatusCode::Running),
            "IDLE" => Ok(StatusCode::Idle),
            "DOWN" => Ok(StatusCode::Down),
            "ERROR" => Ok(StatusCode::Error),
            other => Err(format!("unknown status code: {other}")),
        }
    }
}

/// Point-in-time copy of a registered job, as shown in listings and the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub entry_id: EntryId,
    /// Display name; not unique across entries.
    pub name: String,
    pub spec: String,
    pub status: StatusCode,
    /// Wall-clock duration of the most recent run.
    #[serde(serialize_with = "serialize_latency")]
    pub latency: Duration,
    /// Message of the most recent failure, empty if the last run succeeded.
    pub error: String,
    /// Start of the most recent run.
    pub prev_run: Option<DateTime<Utc>>,
    /// Next planned firing as reported by the trigger engine.
    pub next_run: Option<DateTime<Utc>>,
}

fn serialize_latency<S: Serializer>(latency: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{latency:?}"))
}

/// Anything that can list its registered jobs. `None` means the source is
/// not initialized.
pub trait EntrySource: Send + Sync {
    fn entries(&self) -> Option<Vec<JobSnapshot>>;
}
