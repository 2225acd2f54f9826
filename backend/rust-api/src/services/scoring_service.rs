//! Result computation for a submitted session.

use crate::models::report::{
    PerformanceRating, QuestionReview, ReviewOutcome, SectionReport, Submission, TestReport,
};
use crate::models::test::Question;

/// Half-up rounding, matching the result page (`-2.5` rounds to `-2`).
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

fn percentage(numerator: f64, denominator: usize) -> i64 {
    if denominator == 0 {
        return 0;
    }
    round_half_up(numerator / denominator as f64 * 100.0)
}

fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}

fn outcome(question: &Question, answer: &str, saved: bool) -> ReviewOutcome {
    if !saved {
        return ReviewOutcome::NotAttempted;
    }
    let answer = normalize(answer);
    if answer.is_empty() {
        ReviewOutcome::Skipped
    } else if answer == normalize(&question.correct_option().text) {
        ReviewOutcome::Correct
    } else {
        ReviewOutcome::Incorrect
    }
}

/// Scores only saved questions; an answer selected but never saved does not count.
pub fn score(submission: &Submission) -> TestReport {
    let test = &submission.test;
    let marks = test.marks_per_question();
    let negative = test.negative_marking();

    let sections: Vec<SectionReport> = test
        .sections()
        .iter()
        .map(|section| {
            let questions: Vec<QuestionReview> = section
                .questions()
                .iter()
                .enumerate()
                .map(|(index, question)| {
                    let answer = submission.answer(question.id());
                    let saved = submission.is_saved(section.name(), index);
                    QuestionReview {
                        question_id: question.id().clone(),
                        prompt: question.prompt().to_string(),
                        selected_answer: answer.to_string(),
                        correct_option: question.correct_answer(),
                        correct_answer: question.correct_option().text.clone(),
                        outcome: outcome(question, answer, saved),
                        explanation: question.explanation().map(str::to_string),
                        explanation_image: question.explanation_image().map(str::to_string),
                    }
                })
                .collect();

            let count = |wanted: ReviewOutcome| questions.iter().filter(|q| q.outcome == wanted).count();
            let correct = count(ReviewOutcome::Correct);
            let incorrect = count(ReviewOutcome::Incorrect);
            let total = section.len();
            let attempted = questions
                .iter()
                .filter(|q| q.outcome != ReviewOutcome::NotAttempted)
                .count();

            SectionReport {
                section_name: section.name().to_string(),
                total,
                attempted,
                correct,
                incorrect,
                unanswered: total - attempted,
                accuracy: percentage(correct as f64, attempted),
                performance: percentage(correct as f64 - incorrect as f64 * negative, total),
                questions,
            }
        })
        .collect();

    let total: usize = sections.iter().map(|s| s.total).sum();
    let correct: usize = sections.iter().map(|s| s.correct).sum();
    let incorrect: usize = sections.iter().map(|s| s.incorrect).sum();
    let unanswered: usize = sections.iter().map(|s| s.unanswered).sum();
    let accuracy = percentage(correct as f64, total);

    TestReport {
        test_name: test.name().to_string(),
        auto_submitted: submission.auto_submitted,
        total: submission.total,
        attempted: submission.attempted,
        correct,
        incorrect,
        unanswered,
        total_score: correct as f64 * marks - incorrect as f64 * marks * negative,
        max_score: total as f64 * marks,
        accuracy,
        performance: percentage(correct as f64 - incorrect as f64 * negative, total),
        rating: PerformanceRating::from_accuracy(accuracy),
        sections,
    }
}
