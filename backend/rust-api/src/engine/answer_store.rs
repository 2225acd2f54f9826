use std::collections::{BTreeMap, HashMap};

use crate::models::test::{QuestionId, Test};

/// Selected option text per question; `""` means unanswered.
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    answers: HashMap<QuestionId, String>,
}

impl AnswerStore {
    /// Every question of the test starts out unanswered.
    pub fn for_test(test: &Test) -> Self {
        let answers = test
            .sections()
            .iter()
            .flat_map(|section| section.questions())
            .map(|question| (question.id().clone(), String::new()))
            .collect();
        Self { answers }
    }

    /// Selecting the option that is already selected clears the answer.
    pub fn set_answer(&mut self, question_id: &QuestionId, option_text: &str) -> &str {
        let answer = self.answers.entry(question_id.clone()).or_default();
        if answer == option_text {
            answer.clear();
        } else {
            option_text.clone_into(answer);
        }
        answer
    }

    pub fn get_answer(&self, question_id: &QuestionId) -> &str {
        self.answers
            .get(question_id)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn has_answer(&self, question_id: &QuestionId) -> bool {
        !self.get_answer(question_id).is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|answer| !answer.is_empty()).count()
    }

    pub fn snapshot(&self) -> BTreeMap<QuestionId, String> {
        self.answers
            .iter()
            .map(|(id, answer)| (id.clone(), answer.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test::fixtures;

    #[test]
    fn unset_answers_read_as_empty() {
        let store = AnswerStore::default();
        let id = QuestionId::new("missing");

        assert_eq!(store.get_answer(&id), "");
        assert!(!store.has_answer(&id));
    }

    #[test]
    fn selecting_the_same_option_twice_clears_it() {
        let mut store = AnswerStore::default();
        let id = QuestionId::new("q1");

        assert_eq!(store.set_answer(&id, "Paris"), "Paris");
        assert_eq!(store.set_answer(&id, "Paris"), "");
        assert!(!store.has_answer(&id));
    }

    #[test]
    fn selecting_another_option_replaces_it() {
        let mut store = AnswerStore::default();
        let id = QuestionId::new("q1");

        store.set_answer(&id, "Paris");
        store.set_answer(&id, "Lyon");

        assert_eq!(store.get_answer(&id), "Lyon");
        assert_eq!(store.answered_count(), 1);
    }

    #[test]
    fn starts_with_every_question_empty() {
        let test = fixtures::test(&[("Maths", "1", 2), ("Physics", "1", 1)]);
        let store = AnswerStore::for_test(&test);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.values().all(String::is_empty));
        assert_eq!(store.answered_count(), 0);
    }
}
