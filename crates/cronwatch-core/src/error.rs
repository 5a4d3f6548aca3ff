use thiserror::Error;

#[derive(Debug, Error)]
pub enum CronwatchError {
    /// An operation reached a controller that was never built or has been stopped.
    #[error("Controller is not initialized (operation: {operation})")]
    Uninitialized { operation: &'static str },

    /// The trigger engine rejected the schedule expression.
    #[error("Invalid schedule {spec:?}: {reason}")]
    InvalidSchedule { spec: String, reason: String },

    /// The wrapped job logic returned a failure.
    #[error("Job {name} failed: {message}")]
    JobExecution { name: String, message: String },

    /// A panic inside the job body or a downstream interceptor was caught.
    #[error("Panic recovered: {message}")]
    PanicRecovered { message: String },

    /// An interceptor aborted the run before the job body executed.
    #[error("Run interrupted: {reason}")]
    Interrupted { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dashboard error: {0}")]
    Dashboard(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CronwatchError {
    /// Short, stable error code used in logs and by error sinks.
    pub fn code(&self) -> &'static str {
        match self {
            CronwatchError::Uninitialized { .. } => "UNINITIALIZED_CONTROLLER",
            CronwatchError::InvalidSchedule { .. } => "INVALID_SCHEDULE",
            CronwatchError::JobExecution { .. } => "JOB_EXECUTION_ERROR",
            CronwatchError::PanicRecovered { .. } => "PANIC_RECOVERED",
            CronwatchError::Interrupted { .. } => "RUN_INTERRUPTED",
            CronwatchError::Config(_) => "CONFIG_ERROR",
            CronwatchError::Dashboard(_) => "DASHBOARD_ERROR",
            CronwatchError::Io(_) => "IO_ERROR",
        }
    }

    pub fn invalid_schedule(spec: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        CronwatchError::InvalidSchedule {
            spec: spec.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CronwatchError>;
