use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionSettings;
use crate::engine::{Clock, SessionError, SessionEvent, TestSession};
use crate::metrics::{SECTION_TRANSITIONS_TOTAL, SESSIONS_ACTIVE, SESSIONS_TOTAL, SUBMISSIONS_TOTAL};
use crate::models::report::{SubmissionReason, TestReport};
use crate::models::session::FlagResponse;
use crate::models::test::{AvailabilityStatus, OptionLetter, Test, TestDefinitionError};
use crate::models::timer::{QuestionSaved, SectionAdvanced, Submitted, TimeUp, TimerEvent, TimerTick};
use crate::models::{CreateSessionResponse, SessionView};
use crate::services::scoring_service;
use crate::services::session_runner;
use crate::services::test_catalog::TestCatalog;

const EVENT_BUFFER: usize = 64;

/// Sessions by id, shared with the runners so they can evict themselves.
pub type SessionRegistry = RwLock<HashMap<String, Arc<SessionHandle>>>;

#[derive(Debug, Error)]
pub enum SessionServiceError {
    #[error("Session not found")]
    NotFound,
    #[error("Test '{0}' not found")]
    TestNotFound(String),
    #[error("Invalid test definition: {0}")]
    InvalidTest(#[from] TestDefinitionError),
    #[error("Test is {} and cannot be started", .0.as_str())]
    NotAvailable(AvailabilityStatus),
    #[error("Session has not been submitted yet")]
    NotSubmitted,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Test catalog error: {0:#}")]
    Catalog(anyhow::Error),
}

struct SessionSlot {
    session: TestSession,
    report: Option<Arc<TestReport>>,
}

/// A live session plus its event fan-out.
pub struct SessionHandle {
    id: String,
    slot: Mutex<SessionSlot>,
    events: broadcast::Sender<TimerEvent>,
    shutdown: watch::Sender<bool>,
    submitted: AtomicBool,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.load(Ordering::Acquire)
    }

    /// Advances the session clock. Returns `true` once the session is submitted.
    pub async fn tick(&self) -> bool {
        let mut slot = self.slot.lock().await;
        slot.session.tick();
        self.publish(&mut slot);

        if slot.session.status().is_submitted() {
            return true;
        }
        let _ = self.events.send(self.tick_event(&slot.session));
        false
    }

    fn tick_event(&self, session: &TestSession) -> TimerEvent {
        let navigator = session.navigator();
        TimerEvent::TimerTick(TimerTick {
            session_id: self.id.clone(),
            section_index: navigator.section_index(),
            section_name: navigator.current_section(session.test()).name().to_string(),
            remaining_seconds: session.section_time_remaining(),
            time_up_countdown: session.time_up_countdown_remaining(),
            timestamp: Utc::now(),
        })
    }

    /// Drains the session outbox: metrics, scoring on submit, then fan-out.
    fn publish(&self, slot: &mut SessionSlot) {
        for event in slot.session.take_events() {
            let timestamp = Utc::now();
            let timer_event = match &event {
                SessionEvent::QuestionSaved { question_id } => {
                    debug!(session_id = %self.id, question_id = %question_id, "Question saved");
                    TimerEvent::QuestionSaved(QuestionSaved {
                        session_id: self.id.clone(),
                        question_id: question_id.clone(),
                        timestamp,
                    })
                }
                SessionEvent::SectionAdvanced { from, to, cause } => {
                    SECTION_TRANSITIONS_TOTAL
                        .with_label_values(&[cause.as_str()])
                        .inc();
                    info!(session_id = %self.id, from, to, cause = cause.as_str(), "Section changed");
                    TimerEvent::SectionAdvanced(SectionAdvanced {
                        session_id: self.id.clone(),
                        from_section: *from,
                        to_section: *to,
                        section_name: slot
                            .session
                            .test()
                            .section(*to)
                            .map(|section| section.name().to_string())
                            .unwrap_or_default(),
                        remaining_seconds: slot.session.section_time_remaining(),
                        cause: cause.as_str().to_string(),
                        timestamp,
                    })
                }
                SessionEvent::TimeUp { countdown } => {
                    info!(session_id = %self.id, countdown_seconds = countdown.as_secs(), "Time is up");
                    TimerEvent::TimeUp(TimeUp {
                        session_id: self.id.clone(),
                        countdown_seconds: countdown.as_secs(),
                        timestamp,
                        message: "Time is up! Your test will be submitted automatically.".to_string(),
                    })
                }
                SessionEvent::Submitted(submission) => {
                    let reason = if submission.auto_submitted {
                        SubmissionReason::Auto
                    } else {
                        SubmissionReason::Manual
                    };
                    let report = scoring_service::score(submission);
                    SUBMISSIONS_TOTAL.with_label_values(&[reason.as_str()]).inc();
                    SESSIONS_TOTAL.with_label_values(&["submitted"]).inc();
                    SESSIONS_ACTIVE.dec();
                    info!(
                        session_id = %self.id,
                        reason = reason.as_str(),
                        attempted = submission.attempted,
                        total = submission.total,
                        accuracy = report.accuracy,
                        "Session submitted and scored"
                    );
                    slot.report = Some(Arc::new(report));
                    self.submitted.store(true, Ordering::Release);
                    TimerEvent::Submitted(Submitted {
                        session_id: self.id.clone(),
                        auto_submitted: submission.auto_submitted,
                        attempted: submission.attempted,
                        total: submission.total,
                        timestamp,
                    })
                }
            };
            // Nobody listening is fine.
            let _ = self.events.send(timer_event);
        }
    }
}

/// In-memory registry of live sessions.
pub struct SessionService {
    catalog: Arc<dyn TestCatalog>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    sessions: Arc<SessionRegistry>,
}

impl SessionService {
    pub fn new(catalog: Arc<dyn TestCatalog>, clock: Arc<dyn Clock>, settings: SessionSettings) -> Self {
        Self {
            catalog,
            clock,
            settings,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn TestCatalog> {
        &self.catalog
    }

    pub async fn create_session(
        &self,
        test_name: &str,
    ) -> Result<CreateSessionResponse, SessionServiceError> {
        let document = self
            .catalog
            .fetch_test(test_name)
            .await
            .map_err(SessionServiceError::Catalog)?
            .ok_or_else(|| SessionServiceError::TestNotFound(test_name.to_string()))?;

        let test = Test::try_from(document).map_err(|e| {
            warn!(test = %test_name, error = %e, "Rejected invalid test definition");
            e
        })?;

        if self.settings.enforce_availability_window {
            let status = test.availability().status(Utc::now());
            if status != AvailabilityStatus::Active {
                return Err(SessionServiceError::NotAvailable(status));
            }
        }

        let session = TestSession::with_countdown(
            Arc::new(test),
            Arc::clone(&self.clock),
            self.settings.time_up_countdown(),
        );
        let view = session.view();
        let session_id = Uuid::new_v4().to_string();
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let handle = Arc::new(SessionHandle {
            id: session_id.clone(),
            slot: Mutex::new(SessionSlot {
                session,
                report: None,
            }),
            events,
            shutdown,
            submitted: AtomicBool::new(false),
        });

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::clone(&handle));
        tokio::spawn(session_runner::run(
            handle,
            Arc::clone(&self.sessions),
            self.settings.tick_interval(),
            self.settings.report_retention(),
            shutdown_rx,
        ));

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        SESSIONS_ACTIVE.inc();
        info!(session_id = %session_id, test = %test_name, "Created test session");

        Ok(CreateSessionResponse {
            session_id,
            session: view,
        })
    }

    async fn handle(&self, session_id: &str) -> Result<Arc<SessionHandle>, SessionServiceError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or(SessionServiceError::NotFound)
    }

    /// Runs one engine operation under the session lock and publishes its events.
    async fn apply<T>(
        &self,
        session_id: &str,
        op: impl FnOnce(&mut TestSession) -> Result<T, SessionError>,
    ) -> Result<(T, SessionView), SessionServiceError> {
        let handle = self.handle(session_id).await?;
        let mut slot = handle.slot.lock().await;
        let result = op(&mut slot.session);
        handle.publish(&mut slot);
        let value = result?;
        Ok((value, slot.session.view()))
    }

    pub async fn view(&self, session_id: &str) -> Result<SessionView, SessionServiceError> {
        let handle = self.handle(session_id).await?;
        let slot = handle.slot.lock().await;
        Ok(slot.session.view())
    }

    pub async fn select_option(
        &self,
        session_id: &str,
        letter: OptionLetter,
    ) -> Result<SessionView, SessionServiceError> {
        let (_, view) = self
            .apply(session_id, |session| session.select_option(letter).map(|_| ()))
            .await?;
        Ok(view)
    }

    pub async fn save(&self, session_id: &str) -> Result<SessionView, SessionServiceError> {
        let (_, view) = self.apply(session_id, TestSession::save).await?;
        Ok(view)
    }

    pub async fn next(&self, session_id: &str) -> Result<SessionView, SessionServiceError> {
        let (_, view) = self.apply(session_id, TestSession::next).await?;
        Ok(view)
    }

    pub async fn save_and_next(&self, session_id: &str) -> Result<SessionView, SessionServiceError> {
        let (_, view) = self.apply(session_id, TestSession::save_and_next).await?;
        Ok(view)
    }

    pub async fn previous(&self, session_id: &str) -> Result<SessionView, SessionServiceError> {
        let (_, view) = self.apply(session_id, TestSession::previous).await?;
        Ok(view)
    }

    pub async fn toggle_flag(&self, session_id: &str) -> Result<FlagResponse, SessionServiceError> {
        let (flagged, session) = self.apply(session_id, TestSession::toggle_flag).await?;
        Ok(FlagResponse { flagged, session })
    }

    pub async fn jump_to(
        &self,
        session_id: &str,
        question_index: usize,
    ) -> Result<SessionView, SessionServiceError> {
        let (_, view) = self
            .apply(session_id, |session| session.jump_to(question_index))
            .await?;
        Ok(view)
    }

    pub async fn jump_to_section(
        &self,
        session_id: &str,
        section_index: usize,
    ) -> Result<SessionView, SessionServiceError> {
        let (_, view) = self
            .apply(session_id, |session| session.jump_to_section(section_index))
            .await?;
        Ok(view)
    }

    /// Manual submit. Returns the stored report when the session was already submitted.
    pub async fn submit(&self, session_id: &str) -> Result<Arc<TestReport>, SessionServiceError> {
        let handle = self.handle(session_id).await?;
        let mut slot = handle.slot.lock().await;
        slot.session.submit(SubmissionReason::Manual);
        handle.publish(&mut slot);
        slot.report.clone().ok_or(SessionServiceError::NotSubmitted)
    }

    pub async fn report(&self, session_id: &str) -> Result<Arc<TestReport>, SessionServiceError> {
        let handle = self.handle(session_id).await?;
        let slot = handle.slot.lock().await;
        slot.report.clone().ok_or(SessionServiceError::NotSubmitted)
    }

    /// Receiver for live events plus an event describing the current state
    /// (`submitted` when there is nothing left to stream).
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<(broadcast::Receiver<TimerEvent>, TimerEvent), SessionServiceError> {
        let handle = self.handle(session_id).await?;
        let slot = handle.slot.lock().await;
        let snapshot = match slot.session.submission() {
            Some(submission) => TimerEvent::Submitted(Submitted {
                session_id: handle.id.clone(),
                auto_submitted: submission.auto_submitted,
                attempted: submission.attempted,
                total: submission.total,
                timestamp: Utc::now(),
            }),
            None => handle.tick_event(&slot.session),
        };
        Ok((handle.events.subscribe(), snapshot))
    }

    /// Stops the session timer and forgets the session.
    pub async fn teardown(&self, session_id: &str) -> Result<(), SessionServiceError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or(SessionServiceError::NotFound)?;
        let _ = handle.shutdown.send(true);

        let slot = handle.slot.lock().await;
        if !slot.session.status().is_submitted() {
            SESSIONS_ACTIVE.dec();
            SESSIONS_TOTAL.with_label_values(&["abandoned"]).inc();
        }
        info!(session_id = %session_id, status = slot.session.status().as_str(), "Session torn down");
        Ok(())
    }

    /// Sessions still in progress.
    pub async fn active_sessions(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|handle| !handle.is_submitted())
            .count()
    }

    /// Submitted sessions kept around until their report retention elapses.
    pub async fn retained_reports(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|handle| handle.is_submitted())
            .count()
    }

    /// Tears down every live session; used on graceful shutdown.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        for id in ids {
            let _ = self.teardown(&id).await;
        }
    }
}
