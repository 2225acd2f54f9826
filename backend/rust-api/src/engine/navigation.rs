use crate::engine::progress::ProgressTracker;
use crate::models::test::{Question, QuestionId, Section, Test};

/// What a navigation call did to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Stayed,
    Question { from: usize, to: usize },
    Section { from: usize, to: usize },
}

impl Movement {
    pub fn changed_section(self) -> Option<(usize, usize)> {
        match self {
            Movement::Section { from, to } => Some((from, to)),
            _ => None,
        }
    }
}

/// Cursor over `(section, question)`.
///
/// Every method keeps the cursor inside the test; callers only hand in a
/// validated [`Test`], so there is always at least one section with at least
/// one question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigator {
    section_index: usize,
    question_index: usize,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section_index(&self) -> usize {
        self.section_index
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn current_section<'t>(&self, test: &'t Test) -> &'t Section {
        &test.sections()[self.section_index]
    }

    pub fn current_question<'t>(&self, test: &'t Test) -> &'t Question {
        &self.current_section(test).questions()[self.question_index]
    }

    pub fn is_last_question(&self, test: &Test) -> bool {
        self.section_index + 1 == test.sections().len()
            && self.question_index + 1 == self.current_section(test).len()
    }

    /// Records the current question as saved.
    pub fn save_current(&self, test: &Test, progress: &mut ProgressTracker) -> QuestionId {
        let section = self.current_section(test);
        progress.mark_saved(section.name(), self.question_index);
        self.current_question(test).id().clone()
    }

    /// Next question, or the first question of the next section. Stays put on
    /// the last question of the test.
    pub fn advance(&mut self, test: &Test, progress: &mut ProgressTracker) -> Movement {
        progress.mark_visited(self.current_question(test).id());

        if self.question_index + 1 < self.current_section(test).len() {
            let from = self.question_index;
            self.question_index += 1;
            Movement::Question {
                from,
                to: self.question_index,
            }
        } else if self.section_index + 1 < test.sections().len() {
            self.enter_section(self.section_index + 1)
        } else {
            Movement::Stayed
        }
    }

    pub fn save_and_advance(
        &mut self,
        test: &Test,
        progress: &mut ProgressTracker,
    ) -> (QuestionId, Movement) {
        let saved = self.save_current(test, progress);
        (saved, self.advance(test, progress))
    }

    /// Previous question, or the last question of the previous section.
    pub fn retreat(&mut self, test: &Test, progress: &mut ProgressTracker) -> Movement {
        progress.mark_visited(self.current_question(test).id());

        if self.question_index > 0 {
            let from = self.question_index;
            self.question_index -= 1;
            Movement::Question {
                from,
                to: self.question_index,
            }
        } else if self.section_index > 0 {
            let movement = self.enter_section(self.section_index - 1);
            self.question_index = self.current_section(test).len() - 1;
            movement
        } else {
            Movement::Stayed
        }
    }

    /// Jumps within the current section; out-of-range indices are ignored.
    pub fn jump_to(&mut self, test: &Test, question_index: usize) -> Movement {
        if question_index >= self.current_section(test).len() || question_index == self.question_index {
            return Movement::Stayed;
        }
        let from = self.question_index;
        self.question_index = question_index;
        Movement::Question {
            from,
            to: question_index,
        }
    }

    /// Opens a section at its first question; out-of-range indices are ignored.
    pub fn jump_to_section(&mut self, test: &Test, section_index: usize) -> Movement {
        if section_index >= test.sections().len() {
            return Movement::Stayed;
        }
        if section_index == self.section_index {
            return self.jump_to(test, 0);
        }
        self.enter_section(section_index)
    }

    fn enter_section(&mut self, section_index: usize) -> Movement {
        let from = self.section_index;
        self.section_index = section_index;
        self.question_index = 0;
        Movement::Section {
            from,
            to: section_index,
        }
    }
}
