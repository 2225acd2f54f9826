use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::test::{OptionLetter, QuestionId, Test};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionReason {
    Manual,
    Auto,
}

impl SubmissionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionReason::Manual => "manual",
            SubmissionReason::Auto => "auto",
        }
    }
}

/// Frozen copy of the session handed to scoring.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub test: Arc<Test>,
    pub answers: BTreeMap<QuestionId, String>,
    /// Saved flags per section, in test order.
    pub progress: Vec<SectionSaves>,
    pub attempted: usize,
    pub total: usize,
    pub auto_submitted: bool,
}

impl Submission {
    pub fn answer(&self, question_id: &QuestionId) -> &str {
        self.answers
            .get(question_id)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn is_saved(&self, section_name: &str, question_index: usize) -> bool {
        self.progress
            .iter()
            .find(|section| section.section == section_name)
            .and_then(|section| section.saved.get(question_index))
            .copied()
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSaves {
    pub section: String,
    pub saved: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl PerformanceRating {
    pub fn from_accuracy(accuracy: i64) -> Self {
        match accuracy {
            a if a >= 85 => PerformanceRating::Excellent,
            a if a >= 70 => PerformanceRating::Good,
            a if a >= 50 => PerformanceRating::Average,
            _ => PerformanceRating::NeedsImprovement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Correct,
    Incorrect,
    /// Saved without an answer.
    Skipped,
    NotAttempted,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionReview {
    pub question_id: QuestionId,
    pub prompt: String,
    pub selected_answer: String,
    pub correct_option: OptionLetter,
    pub correct_answer: String,
    pub outcome: ReviewOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub section_name: String,
    pub total: usize,
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unanswered: usize,
    pub accuracy: i64,
    pub performance: i64,
    pub questions: Vec<QuestionReview>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub test_name: String,
    pub auto_submitted: bool,
    pub total: usize,
    pub attempted: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unanswered: usize,
    pub total_score: f64,
    pub max_score: f64,
    pub accuracy: i64,
    pub performance: i64,
    pub rating: PerformanceRating,
    pub sections: Vec<SectionReport>,
}
