use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::engine::answer_store::AnswerStore;
use crate::engine::clock::Clock;
use crate::engine::navigation::{Movement, Navigator};
use crate::engine::progress::ProgressTracker;
use crate::engine::section_timer::{SectionTimer, TimerSignal};
use crate::models::report::{Submission, SubmissionReason};
use crate::models::test::{OptionLetter, QuestionId, Test};
use crate::models::SessionStatus;

pub const DEFAULT_TIME_UP_COUNTDOWN: Duration = Duration::from_secs(5);
pub const MAX_TIME_UP_COUNTDOWN: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Running { section: usize },
    TimeUpPending { deadline: Instant },
    AutoSubmitted,
    ManuallySubmitted,
}

impl SessionPhase {
    pub fn status(self) -> SessionStatus {
        match self {
            SessionPhase::Running { .. } => SessionStatus::Running,
            SessionPhase::TimeUpPending { .. } => SessionStatus::TimeUp,
            SessionPhase::AutoSubmitted => SessionStatus::AutoSubmitted,
            SessionPhase::ManuallySubmitted => SessionStatus::ManuallySubmitted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionChangeCause {
    TimerExpired,
    Navigation,
}

impl SectionChangeCause {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionChangeCause::TimerExpired => "timer",
            SectionChangeCause::Navigation => "navigation",
        }
    }
}

/// Observable changes, drained by the host with [`TestSession::take_events`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    QuestionSaved {
        question_id: QuestionId,
    },
    SectionAdvanced {
        from: usize,
        to: usize,
        cause: SectionChangeCause,
    },
    TimeUp {
        countdown: Duration,
    },
    Submitted(Arc<Submission>),
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session is no longer accepting changes")]
    Closed,
    #[error("Please save your answer before moving to the next question")]
    UnsavedAnswer,
}

/// One candidate's run through a test.
pub struct TestSession {
    test: Arc<Test>,
    clock: Arc<dyn Clock>,
    answers: AnswerStore,
    progress: ProgressTracker,
    navigator: Navigator,
    timer: SectionTimer,
    phase: SessionPhase,
    countdown: Duration,
    submission: Option<Arc<Submission>>,
    events: Vec<SessionEvent>,
}

impl TestSession {
    pub fn new(test: Arc<Test>, clock: Arc<dyn Clock>) -> Self {
        Self::with_countdown(test, clock, DEFAULT_TIME_UP_COUNTDOWN)
    }

    /// Opens section 0, question 0 and starts its timer.
    pub fn with_countdown(test: Arc<Test>, clock: Arc<dyn Clock>, countdown: Duration) -> Self {
        let now = clock.now();
        let timer = SectionTimer::start(section_duration(&test, 0), now);
        debug!(test = %test.name(), sections = test.sections().len(), "Session started");

        Self {
            answers: AnswerStore::for_test(&test),
            progress: ProgressTracker::new(&test),
            navigator: Navigator::new(),
            timer,
            phase: SessionPhase::Running { section: 0 },
            countdown: countdown.min(MAX_TIME_UP_COUNTDOWN),
            submission: None,
            events: Vec::new(),
            test,
            clock,
        }
    }

    pub fn test(&self) -> &Arc<Test> {
        &self.test
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn status(&self) -> SessionStatus {
        self.phase.status()
    }

    pub fn submission(&self) -> Option<&Arc<Submission>> {
        self.submission.as_ref()
    }

    pub fn section_time_remaining(&self) -> u64 {
        match self.phase {
            SessionPhase::Running { .. } => self.timer.remaining_seconds(self.clock.now()),
            _ => 0,
        }
    }

    pub fn time_up_countdown_remaining(&self) -> Option<u64> {
        match self.phase {
            SessionPhase::TimeUpPending { deadline } => {
                let left = deadline.saturating_duration_since(self.clock.now());
                Some(left.as_secs() + u64::from(left.subsec_nanos() > 0))
            }
            _ => None,
        }
    }

    /// Current answer is non-empty but not saved yet.
    pub fn has_unsaved_answer(&self) -> bool {
        let section = self.navigator.current_section(&self.test);
        let question = self.navigator.current_question(&self.test);
        self.answers.has_answer(question.id())
            && !self.progress.is_saved(section.name(), self.navigator.question_index())
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Timer
    // ========================================================================

    /// Drives the section timer and the time-up countdown from the clock.
    pub fn tick(&mut self) {
        let now = self.clock.now();
        loop {
            match self.phase {
                SessionPhase::Running { .. } => match self.timer.tick(now) {
                    Some(TimerSignal::Expired) => self.on_timer_expired(),
                    None => break,
                },
                SessionPhase::TimeUpPending { deadline } => {
                    if now >= deadline {
                        self.submit(SubmissionReason::Auto);
                    }
                    break;
                }
                SessionPhase::AutoSubmitted | SessionPhase::ManuallySubmitted => break,
            }
        }
    }

    /// Moves to the next section, or into time-up after the last one.
    /// Ignored unless the session is running.
    pub fn on_timer_expired(&mut self) {
        let SessionPhase::Running { section } = self.phase else {
            debug!(phase = ?self.phase, "Ignoring timer expiry outside running phase");
            return;
        };
        // A late tick must not give the next section the missed time.
        let expired_at = self.timer.deadline().min(self.clock.now());
        let next = section + 1;

        if next < self.test.sections().len() {
            self.navigator.jump_to_section(&self.test, next);
            self.activate_section(section, next, expired_at, SectionChangeCause::TimerExpired);
        } else {
            self.phase = SessionPhase::TimeUpPending {
                deadline: expired_at.checked_add(self.countdown).unwrap_or(expired_at),
            };
            info!(test = %self.test.name(), "Time is up, auto-submitting after countdown");
            self.events.push(SessionEvent::TimeUp {
                countdown: self.countdown,
            });
        }
    }

    fn activate_section(&mut self, from: usize, to: usize, at: Instant, cause: SectionChangeCause) {
        self.timer.reset(section_duration(&self.test, to), at);
        self.phase = SessionPhase::Running { section: to };
        debug!(from, to, cause = cause.as_str(), "Section activated");
        self.events
            .push(SessionEvent::SectionAdvanced { from, to, cause });
    }

    fn apply_movement(&mut self, movement: Movement) -> Movement {
        if let Some((from, to)) = movement.changed_section() {
            let now = self.clock.now();
            self.activate_section(from, to, now, SectionChangeCause::Navigation);
        }
        movement
    }

    // ========================================================================
    // User operations
    // ========================================================================

    fn ensure_running(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Running { .. } => Ok(()),
            _ => Err(SessionError::Closed),
        }
    }

    /// Picks an option of the current question; picking it again clears it.
    pub fn select_option(&mut self, letter: OptionLetter) -> Result<&str, SessionError> {
        self.ensure_running()?;
        let question = self.navigator.current_question(&self.test);
        Ok(self
            .answers
            .set_answer(question.id(), &question.option(letter).text))
    }

    pub fn save(&mut self) -> Result<QuestionId, SessionError> {
        self.ensure_running()?;
        let question_id = self.navigator.save_current(&self.test, &mut self.progress);
        self.events.push(SessionEvent::QuestionSaved {
            question_id: question_id.clone(),
        });
        Ok(question_id)
    }

    /// Refuses to leave a question whose answer has not been saved.
    pub fn next(&mut self) -> Result<Movement, SessionError> {
        self.ensure_running()?;
        if self.has_unsaved_answer() {
            return Err(SessionError::UnsavedAnswer);
        }
        let movement = self.navigator.advance(&self.test, &mut self.progress);
        Ok(self.apply_movement(movement))
    }

    pub fn save_and_next(&mut self) -> Result<Movement, SessionError> {
        self.ensure_running()?;
        let (question_id, movement) = self
            .navigator
            .save_and_advance(&self.test, &mut self.progress);
        self.events.push(SessionEvent::QuestionSaved { question_id });
        Ok(self.apply_movement(movement))
    }

    pub fn previous(&mut self) -> Result<Movement, SessionError> {
        self.ensure_running()?;
        let movement = self.navigator.retreat(&self.test, &mut self.progress);
        Ok(self.apply_movement(movement))
    }

    /// Flags or unflags the current question; either way it counts as saved.
    pub fn toggle_flag(&mut self) -> Result<bool, SessionError> {
        self.ensure_running()?;
        let question_id = self.navigator.current_question(&self.test).id().clone();
        let flagged = self.progress.toggle_flag(&question_id);
        self.events.push(SessionEvent::QuestionSaved { question_id });
        Ok(flagged)
    }

    pub fn jump_to(&mut self, question_index: usize) -> Result<Movement, SessionError> {
        self.ensure_running()?;
        Ok(self.navigator.jump_to(&self.test, question_index))
    }

    pub fn jump_to_section(&mut self, section_index: usize) -> Result<Movement, SessionError> {
        self.ensure_running()?;
        let movement = self.navigator.jump_to_section(&self.test, section_index);
        Ok(self.apply_movement(movement))
    }

    /// Freezes the session. Only the first call records a submission; later
    /// calls return the same snapshot and emit nothing.
    pub fn submit(&mut self, reason: SubmissionReason) -> Arc<Submission> {
        if let Some(submission) = &self.submission {
            return Arc::clone(submission);
        }

        let submission = Arc::new(Submission {
            test: Arc::clone(&self.test),
            answers: self.answers.snapshot(),
            progress: self.progress.snapshot(),
            attempted: self.progress.attempted(),
            total: self.progress.total(),
            auto_submitted: reason == SubmissionReason::Auto,
        });
        self.phase = match reason {
            SubmissionReason::Auto => SessionPhase::AutoSubmitted,
            SubmissionReason::Manual => SessionPhase::ManuallySubmitted,
        };
        info!(
            test = %self.test.name(),
            reason = reason.as_str(),
            attempted = submission.attempted,
            total = submission.total,
            "Test submitted"
        );
        self.submission = Some(Arc::clone(&submission));
        self.events
            .push(SessionEvent::Submitted(Arc::clone(&submission)));
        submission
    }
}

fn section_duration(test: &Test, index: usize) -> Duration {
    Duration::from_secs(
        test.section(index)
            .map(|section| section.duration_seconds())
            .unwrap_or_default(),
    )
}
