use strum_macros::{AsRefStr, Display, EnumString};

/// Error code attached to a failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    MatrixMasterError,
    CropError,
}

/// Receives the outcome of every task, exactly once per task token.
pub trait TaskReporter: Send + Sync {
    fn send_success(&self, token: &str);
    fn send_failure(&self, token: &str, code: FailureCode, message: &str);
}

/// Reports outcomes to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl TaskReporter for LogReporter {
    fn send_success(&self, token: &str) {
        tracing::info!(token, "task succeeded");
    }

    fn send_failure(&self, token: &str, code: FailureCode, message: &str) {
        tracing::error!(token, %code, message, "task failed");
    }
}
