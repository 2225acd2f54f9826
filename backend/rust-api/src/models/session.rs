use serde::{Deserialize, Serialize};

use crate::models::test::{OptionLetter, QuestionId};
use crate::models::SessionStatus;

/// Colour of a cell in the question grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionStatus {
    Current,
    Flagged,
    Answered,
    Saved,
    Visited,
    NotViewed,
}

/// Everything a client needs to render the test window.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub test_name: String,
    pub status: SessionStatus,
    pub section_index: usize,
    pub question_index: usize,
    pub section_name: String,
    pub section_time_remaining: u64,
    /// Seconds until auto-submit, only while the session is in time-up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_up_countdown: Option<u64>,
    pub calculator_enabled: bool,
    pub is_last_question: bool,
    pub current_question: QuestionView,
    pub sections: Vec<SectionProgressView>,
    pub counts: SessionCounts,
}

/// The current question without its correct answer or explanation.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub number: usize,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub options: Vec<OptionView>,
    pub selected_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<OptionLetter>,
    pub saved: bool,
    pub flagged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub letter: OptionLetter,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionProgressView {
    pub name: String,
    pub duration_seconds: u64,
    pub active: bool,
    pub questions: Vec<QuestionCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionCell {
    pub id: QuestionId,
    pub status: QuestionStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionCounts {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub flagged: usize,
    pub attempted: usize,
}

#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub option: OptionLetter,
}

#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub question_index: usize,
}

#[derive(Debug, Serialize)]
pub struct FlagResponse {
    pub flagged: bool,
    pub session: SessionView,
}
