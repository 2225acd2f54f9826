//! Client-side test session engine.
//!
//! Everything in here is synchronous and free of I/O: the host drives it with
//! a [`clock::Clock`] and drains the resulting [`orchestrator::SessionEvent`]s.

pub mod answer_store;
pub mod clock;
pub mod navigation;
pub mod orchestrator;
pub mod progress;
pub mod section_timer;
mod view;

#[cfg(test)]
mod property_tests;

pub use answer_store::AnswerStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use navigation::{Movement, Navigator};
pub use orchestrator::{
    SectionChangeCause, SessionError, SessionEvent, SessionPhase, TestSession,
    DEFAULT_TIME_UP_COUNTDOWN,
};
pub use progress::ProgressTracker;
pub use section_timer::{SectionTimer, TimerSignal};
