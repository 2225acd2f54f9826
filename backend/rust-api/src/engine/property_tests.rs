//! Property tests for the session engine: random operation sequences keep
//! the cursor in bounds and the bookkeeping consistent.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use crate::engine::clock::ManualClock;
use crate::engine::orchestrator::{SessionEvent, SessionPhase, TestSession};
use crate::models::report::SubmissionReason;
use crate::models::test::{fixtures, OptionLetter};

#[derive(Debug, Clone)]
enum Op {
    Select(OptionLetter),
    Save,
    Next,
    SaveAndNext,
    Previous,
    Flag,
    Jump(usize),
    JumpSection(usize),
    Wait(u64),
    Submit,
}

fn letter_strategy() -> impl Strategy<Value = OptionLetter> {
    prop_oneof![
        Just(OptionLetter::A),
        Just(OptionLetter::B),
        Just(OptionLetter::C),
        Just(OptionLetter::D),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => letter_strategy().prop_map(Op::Select),
        3 => Just(Op::Save),
        3 => Just(Op::Next),
        3 => Just(Op::SaveAndNext),
        2 => Just(Op::Previous),
        2 => Just(Op::Flag),
        2 => (0usize..6).prop_map(Op::Jump),
        1 => (0usize..4).prop_map(Op::JumpSection),
        2 => (0u64..90).prop_map(Op::Wait),
        1 => Just(Op::Submit),
    ]
}

fn apply(session: &mut TestSession, clock: &ManualClock, op: &Op) {
    // Rejections are part of the contract; only the resulting state matters here.
    let _ = match op {
        Op::Select(letter) => session.select_option(*letter).map(|_| ()),
        Op::Save => session.save().map(|_| ()),
        Op::Next => session.next().map(|_| ()),
        Op::SaveAndNext => session.save_and_next().map(|_| ()),
        Op::Previous => session.previous().map(|_| ()),
        Op::Flag => session.toggle_flag().map(|_| ()),
        Op::Jump(index) => session.jump_to(*index).map(|_| ()),
        Op::JumpSection(index) => session.jump_to_section(*index).map(|_| ()),
        Op::Wait(seconds) => {
            clock.advance(Duration::from_secs(*seconds));
            session.tick();
            Ok(())
        }
        Op::Submit => {
            session.submit(SubmissionReason::Manual);
            Ok(())
        }
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn cursor_and_bookkeeping_stay_consistent(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let clock = Arc::new(ManualClock::new());
        let test = Arc::new(fixtures::test(&[("S1", "1", 3), ("S2", "2", 2), ("S3", "1", 4)]));
        let mut session = TestSession::new(test.clone(), clock.clone());
        let mut submitted_events = 0;

        for op in &ops {
            apply(&mut session, &clock, op);
            submitted_events += session
                .take_events()
                .iter()
                .filter(|event| matches!(event, SessionEvent::Submitted(_)))
                .count();

            let nav = session.navigator();
            prop_assert!(nav.section_index() < test.sections().len());
            prop_assert!(nav.question_index() < test.sections()[nav.section_index()].len());
            if let SessionPhase::Running { section } = session.phase() {
                prop_assert_eq!(section, nav.section_index());
            }

            let progress = session.progress();
            prop_assert!(progress.attempted() <= progress.total());
            for section in test.sections() {
                for (index, question) in section.questions().iter().enumerate() {
                    if progress.is_saved(section.name(), index) {
                        prop_assert!(progress.is_visited(question.id()));
                    }
                    if progress.is_flagged(question.id()) {
                        prop_assert!(progress.is_saved(section.name(), index));
                    }
                }
            }
        }

        prop_assert!(submitted_events <= 1);
        prop_assert_eq!(submitted_events == 1, session.submission().is_some());
    }

    #[test]
    fn double_selection_is_identity(letter in letter_strategy(), first in prop::option::of(letter_strategy())) {
        let clock = Arc::new(ManualClock::new());
        let test = Arc::new(fixtures::test(&[("S1", "1", 1)]));
        let mut session = TestSession::new(test, clock);
        if let Some(first) = first {
            session.select_option(first).unwrap();
        }
        let before = session.view().current_question.selected_answer;

        session.select_option(letter).unwrap();
        session.select_option(letter).unwrap();
        let after = session.view().current_question.selected_answer;

        if first == Some(letter) {
            prop_assert_eq!(after, before);
        } else {
            prop_assert_eq!(after, "");
        }
    }
}
