use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::engine::answer_store::AnswerStore;
use crate::models::report::SectionSaves;
use crate::models::session::QuestionStatus;
use crate::models::test::{QuestionId, Test};

#[derive(Debug, Clone)]
struct SectionProgress {
    name: String,
    question_ids: Vec<QuestionId>,
    saved: Vec<bool>,
}

/// Saved / visited / flagged bookkeeping for every question of a test.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    sections: Vec<SectionProgress>,
    section_lookup: HashMap<String, usize>,
    positions: HashMap<QuestionId, (usize, usize)>,
    visited: HashSet<QuestionId>,
    flagged: HashSet<QuestionId>,
}

impl ProgressTracker {
    pub fn new(test: &Test) -> Self {
        let mut sections = Vec::with_capacity(test.sections().len());
        let mut section_lookup = HashMap::new();
        let mut positions = HashMap::new();

        for (section_index, section) in test.sections().iter().enumerate() {
            let question_ids: Vec<QuestionId> =
                section.questions().iter().map(|q| q.id().clone()).collect();
            for (question_index, id) in question_ids.iter().enumerate() {
                positions.insert(id.clone(), (section_index, question_index));
            }
            section_lookup.insert(section.name().to_string(), section_index);
            sections.push(SectionProgress {
                name: section.name().to_string(),
                saved: vec![false; question_ids.len()],
                question_ids,
            });
        }

        Self {
            sections,
            section_lookup,
            positions,
            visited: HashSet::new(),
            flagged: HashSet::new(),
        }
    }

    /// Marks the question saved (and therefore visited). Unknown positions are ignored.
    pub fn mark_saved(&mut self, section_name: &str, question_index: usize) -> bool {
        let Some(&section_index) = self.section_lookup.get(section_name) else {
            return false;
        };
        self.save_position(section_index, question_index)
    }

    fn save_position(&mut self, section_index: usize, question_index: usize) -> bool {
        let Some(section) = self.sections.get_mut(section_index) else {
            return false;
        };
        let (Some(saved), Some(id)) = (
            section.saved.get_mut(question_index),
            section.question_ids.get(question_index),
        ) else {
            return false;
        };
        *saved = true;
        self.visited.insert(id.clone());
        true
    }

    pub fn is_saved(&self, section_name: &str, question_index: usize) -> bool {
        self.section_lookup
            .get(section_name)
            .and_then(|&index| self.sections[index].saved.get(question_index))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_question_saved(&self, question_id: &QuestionId) -> bool {
        self.positions
            .get(question_id)
            .map(|&(section, question)| self.sections[section].saved[question])
            .unwrap_or(false)
    }

    pub fn mark_visited(&mut self, question_id: &QuestionId) {
        if self.positions.contains_key(question_id) {
            self.visited.insert(question_id.clone());
        }
    }

    pub fn is_visited(&self, question_id: &QuestionId) -> bool {
        self.visited.contains(question_id)
    }

    /// Flips the flag and returns the new state.
    ///
    /// Flag implies save: flagging *and* unflagging record the question as
    /// saved, whatever its answer.
    pub fn toggle_flag(&mut self, question_id: &QuestionId) -> bool {
        let Some(&(section_index, question_index)) = self.positions.get(question_id) else {
            return false;
        };
        let flagged = if self.flagged.remove(question_id) {
            false
        } else {
            self.flagged.insert(question_id.clone());
            true
        };
        self.save_position(section_index, question_index);
        debug!(question_id = %question_id, flagged, "Toggled question flag");
        flagged
    }

    pub fn is_flagged(&self, question_id: &QuestionId) -> bool {
        self.flagged.contains(question_id)
    }

    /// Display status, first matching rule wins:
    /// current, flagged, saved with an answer, saved, visited, not viewed.
    pub fn status(
        &self,
        question_id: &QuestionId,
        is_current: bool,
        answers: &AnswerStore,
    ) -> QuestionStatus {
        if is_current {
            QuestionStatus::Current
        } else if self.is_flagged(question_id) {
            QuestionStatus::Flagged
        } else if self.is_question_saved(question_id) {
            if answers.has_answer(question_id) {
                QuestionStatus::Answered
            } else {
                QuestionStatus::Saved
            }
        } else if self.is_visited(question_id) {
            QuestionStatus::Visited
        } else {
            QuestionStatus::NotViewed
        }
    }

    /// Number of saved questions, answered or not.
    pub fn attempted(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.saved.iter().filter(|saved| **saved).count())
            .sum()
    }

    pub fn attempted_in(&self, section_name: &str) -> usize {
        self.section_lookup
            .get(section_name)
            .map(|&index| self.sections[index].saved.iter().filter(|s| **s).count())
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.sections.iter().map(|section| section.saved.len()).sum()
    }

    pub fn flagged_count(&self) -> usize {
        self.flagged.len()
    }

    pub fn snapshot(&self) -> Vec<SectionSaves> {
        self.sections
            .iter()
            .map(|section| SectionSaves {
                section: section.name.clone(),
                saved: section.saved.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test::fixtures;

    fn id(value: &str) -> QuestionId {
        QuestionId::new(value)
    }

    #[test]
    fn saving_marks_visited_and_is_idempotent() {
        let test = fixtures::test(&[("S1", "1", 3)]);
        let mut progress = ProgressTracker::new(&test);

        assert!(progress.mark_saved("S1", 1));
        assert!(progress.mark_saved("S1", 1));

        assert!(progress.is_saved("S1", 1));
        assert!(progress.is_visited(&id("S1-1")));
        assert_eq!(progress.attempted(), 1);
    }

    #[test]
    fn ignores_unknown_positions() {
        let test = fixtures::test(&[("S1", "1", 2)]);
        let mut progress = ProgressTracker::new(&test);

        assert!(!progress.mark_saved("S1", 5));
        assert!(!progress.mark_saved("Nope", 0));
        assert!(!progress.toggle_flag(&id("ghost")));
        assert_eq!(progress.attempted(), 0);
    }

    #[test]
    fn attempted_counts_saved_flags_regardless_of_answers() {
        let test = fixtures::test(&[("S1", "1", 3)]);
        let mut progress = ProgressTracker::new(&test);

        progress.mark_saved("S1", 0);
        progress.mark_saved("S1", 2);

        assert_eq!(progress.snapshot()[0].saved, vec![true, false, true]);
        assert_eq!(progress.attempted(), 2);
        assert_eq!(progress.attempted_in("S1"), 2);
        assert_eq!(progress.total(), 3);
    }

    #[test]
    fn snapshot_lists_sections_in_test_order() {
        let test = fixtures::test(&[("Physics", "1", 1), ("Chemistry", "1", 2), ("Biology", "1", 1)]);
        let mut progress = ProgressTracker::new(&test);
        progress.mark_saved("Chemistry", 1);

        let snapshot = progress.snapshot();
        let names: Vec<&str> = snapshot.iter().map(|s| s.section.as_str()).collect();
        assert_eq!(names, vec!["Physics", "Chemistry", "Biology"]);
        assert_eq!(snapshot[1].saved, vec![false, true]);
    }

    #[test]
    fn flag_implies_save_both_ways() {
        let test = fixtures::test(&[("S1", "1", 2)]);
        let mut progress = ProgressTracker::new(&test);
        let answers = AnswerStore::for_test(&test);

        assert!(progress.toggle_flag(&id("S1-0")));
        assert!(progress.is_saved("S1", 0));
        assert_eq!(
            progress.status(&id("S1-0"), false, &answers),
            QuestionStatus::Flagged
        );

        assert!(progress.toggle_flag(&id("S1-1")));
        assert!(!progress.toggle_flag(&id("S1-1")));
        assert!(progress.is_saved("S1", 1));
        assert_eq!(
            progress.status(&id("S1-1"), false, &answers),
            QuestionStatus::Saved
        );
    }

    #[test]
    fn status_precedence() {
        let test = fixtures::test(&[("S1", "1", 5)]);
        let mut progress = ProgressTracker::new(&test);
        let mut answers = AnswerStore::for_test(&test);

        // flagged and saved with an answer
        answers.set_answer(&id("S1-0"), "S1-0 a");
        progress.mark_saved("S1", 0);
        progress.toggle_flag(&id("S1-0"));
        // saved with an answer
        answers.set_answer(&id("S1-1"), "S1-1 b");
        progress.mark_saved("S1", 1);
        // saved, empty
        progress.mark_saved("S1", 2);
        // visited only, with an unsaved answer
        answers.set_answer(&id("S1-3"), "S1-3 c");
        progress.mark_visited(&id("S1-3"));

        assert_eq!(progress.status(&id("S1-0"), false, &answers), QuestionStatus::Flagged);
        assert_eq!(progress.status(&id("S1-0"), true, &answers), QuestionStatus::Current);
        assert_eq!(progress.status(&id("S1-1"), false, &answers), QuestionStatus::Answered);
        assert_eq!(progress.status(&id("S1-2"), false, &answers), QuestionStatus::Saved);
        assert_eq!(progress.status(&id("S1-3"), false, &answers), QuestionStatus::Visited);
        assert_eq!(progress.status(&id("S1-4"), false, &answers), QuestionStatus::NotViewed);
    }
}
