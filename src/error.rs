use thiserror::Error;

pub type Result<T> = std::result::Result<T, PuzzleError>;

#[derive(Debug, Error)]
pub enum PuzzleError {
    /// A board that cannot describe a valid puzzle configuration.
    #[error("invalid puzzle state: {reason}")]
    InvalidState { reason: String },

    #[error("planner exited with code {exit_code:?}")]
    PlannerProcess {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("planner produced no solution artifact")]
    PlannerOutputMissing { tail: String },

    #[error("planner timed out after {seconds}s")]
    PlannerTimedOut { seconds: u64, tail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PuzzleError {
    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }
}
