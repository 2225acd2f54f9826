use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::test::QuestionId;

/// Events pushed to SSE subscribers of a session.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerEvent {
    TimerTick(TimerTick),
    QuestionSaved(QuestionSaved),
    SectionAdvanced(SectionAdvanced),
    TimeUp(TimeUp),
    Submitted(Submitted),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimerTick {
    pub session_id: String,
    pub section_index: usize,
    pub section_name: String,
    pub remaining_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_up_countdown: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuestionSaved {
    pub session_id: String,
    pub question_id: QuestionId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SectionAdvanced {
    pub session_id: String,
    pub from_section: usize,
    pub to_section: usize,
    pub section_name: String,
    pub remaining_seconds: u64,
    /// `timer` or `navigation`.
    pub cause: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeUp {
    pub session_id: String,
    pub countdown_seconds: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Submitted {
    pub session_id: String,
    pub auto_submitted: bool,
    pub attempted: usize,
    pub total: usize,
    pub timestamp: DateTime<Utc>,
}

impl TimerEvent {
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            TimerEvent::TimerTick(_) => "timer-tick",
            TimerEvent::QuestionSaved(_) => "question-saved",
            TimerEvent::SectionAdvanced(_) => "section-advanced",
            TimerEvent::TimeUp(_) => "time-up",
            TimerEvent::Submitted(_) => "submitted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_event_names() {
        let event = TimerEvent::TimeUp(TimeUp {
            session_id: "s-1".to_string(),
            countdown_seconds: 5,
            timestamp: Utc::now(),
            message: "Time is up".to_string(),
        });

        let data: serde_json::Value = serde_json::from_str(&event.to_sse_data()).unwrap();

        assert_eq!(data["type"], event.event_name());
        assert_eq!(data["countdown_seconds"], 5);
    }
}
