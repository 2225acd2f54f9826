use serde::{Deserialize, Serialize};
use validator::Validate;

pub mod report;
pub mod session;
pub mod timer;

pub use session::SessionView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    /// Last section ran out; waiting for the auto-submit countdown.
    TimeUp,
    AutoSubmitted,
    ManuallySubmitted,
}

impl SessionStatus {
    pub fn is_submitted(self) -> bool {
        matches!(self, SessionStatus::AutoSubmitted | SessionStatus::ManuallySubmitted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::TimeUp => "time_up",
            SessionStatus::AutoSubmitted => "auto_submitted",
            SessionStatus::ManuallySubmitted => "manually_submitted",
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 100, message = "Test name must be 1-100 characters"))]
    pub test_name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub session: SessionView,
}
