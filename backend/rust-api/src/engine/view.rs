use crate::engine::orchestrator::TestSession;
use crate::models::session::{
    OptionView, QuestionCell, QuestionView, SectionProgressView, SessionCounts, SessionView,
};
use crate::models::test::OptionLetter;

impl TestSession {
    /// Snapshot for rendering. Never exposes correct answers or explanations.
    pub fn view(&self) -> SessionView {
        let test = self.test();
        let navigator = self.navigator();
        let answers = self.answers();
        let progress = self.progress();
        let section = navigator.current_section(test);
        let question = navigator.current_question(test);
        let selected_answer = answers.get_answer(question.id()).to_string();

        let options = OptionLetter::ALL
            .iter()
            .map(|&letter| {
                let option = question.option(letter);
                OptionView {
                    letter,
                    text: option.text.clone(),
                    image: option.image.clone(),
                }
            })
            .collect();
        let selected_option = if selected_answer.is_empty() {
            None
        } else {
            OptionLetter::ALL
                .into_iter()
                .find(|&letter| question.option(letter).text == selected_answer)
        };

        let sections = test
            .sections()
            .iter()
            .enumerate()
            .map(|(section_index, s)| {
                let active = section_index == navigator.section_index();
                let questions = s
                    .questions()
                    .iter()
                    .enumerate()
                    .map(|(question_index, q)| {
                        let is_current = active && question_index == navigator.question_index();
                        QuestionCell {
                            id: q.id().clone(),
                            status: progress.status(q.id(), is_current, answers),
                        }
                    })
                    .collect();
                SectionProgressView {
                    name: s.name().to_string(),
                    duration_seconds: s.duration_seconds(),
                    active,
                    questions,
                }
            })
            .collect();

        let total = progress.total();
        let answered = answers.answered_count();

        SessionView {
            test_name: test.name().to_string(),
            status: self.status(),
            section_index: navigator.section_index(),
            question_index: navigator.question_index(),
            section_name: section.name().to_string(),
            section_time_remaining: self.section_time_remaining(),
            time_up_countdown: self.time_up_countdown_remaining(),
            calculator_enabled: test.calculator_enabled(),
            is_last_question: navigator.is_last_question(test),
            current_question: QuestionView {
                id: question.id().clone(),
                number: navigator.question_index() + 1,
                prompt: question.prompt().to_string(),
                image: question.image().map(str::to_string),
                options,
                selected_option,
                selected_answer,
                saved: progress.is_question_saved(question.id()),
                flagged: progress.is_flagged(question.id()),
            },
            sections,
            counts: SessionCounts {
                total,
                answered,
                unanswered: total.saturating_sub(answered),
                flagged: progress.flagged_count(),
                attempted: progress.attempted(),
            },
        }
    }
}
