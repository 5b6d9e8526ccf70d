//! Scoring: per-question caps and contributions, and per-test result finalization.
//!
//! A question's signed `mark` is its only weight:
//! - Rated: slider `0..=max(mark, 1)`, contribution = slider value.
//! - Yes/no: `mark > 0` → Yes = mark, No = 0; `mark <= 0` → Yes = 0, No = 1.
//! - Image choice records a selection, never a score.

use crate::models::result::TestResult;
use crate::models::test_definition::{AnswerMode, Question, TestDefinition};
use crate::survey::answers::{Answer, AnswerState};

// ────────────────────────────────────────────────────────────────────────────
// Per-question rules
// ────────────────────────────────────────────────────────────────────────────

/// Upper slider bound. Non-positive marks are clamped to 1 so the range never
/// collapses or inverts.
pub fn slider_max(mark: i64) -> i64 {
    mark.max(1)
}

/// Score contributed by a yes/no answer.
pub fn yes_no_contribution(mark: i64, yes: bool) -> i64 {
    match (mark > 0, yes) {
        (true, true) => mark,
        (true, false) => 0,
        (false, true) => 0,
        (false, false) => 1,
    }
}

/// Highest score a single question can contribute in the given mode.
pub fn question_cap(mode: AnswerMode, question: &Question) -> i64 {
    match mode {
        AnswerMode::Rated => slider_max(question.mark),
        AnswerMode::YesNo => {
            if question.mark > 0 {
                question.mark
            } else {
                1
            }
        }
        AnswerMode::ImageChoice => 0,
    }
}

fn contribution(question: &Question, answer: Option<Answer>) -> i64 {
    match answer {
        Some(Answer::Slider(value)) => value.clamp(0, slider_max(question.mark)),
        Some(Answer::YesNo(yes)) => yes_no_contribution(question.mark, yes),
        None => 0,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Finalization
// ────────────────────────────────────────────────────────────────────────────

/// Builds the result for the test at `test_index` from recorded answers.
/// Missing answers count as 0; the maximum never depends on what was answered.
pub fn finalize_test(test_index: usize, test: &TestDefinition, answers: &AnswerState) -> TestResult {
    if test.mode == AnswerMode::ImageChoice {
        let title = answers
            .choice(test_index)
            .and_then(|i| test.questions.get(i))
            .map(|q| q.text.clone())
            .unwrap_or_else(|| test.title.clone());
        return TestResult {
            title,
            raw_score: 0,
            maximum_score: 0,
            is_optional: test.is_optional,
            is_selection: true,
        };
    }

    let raw_score = test
        .questions
        .iter()
        .enumerate()
        .map(|(qi, q)| contribution(q, answers.get(test_index, qi)))
        .sum();
    let maximum_score = test
        .questions
        .iter()
        .map(|q| question_cap(test.mode, q))
        .sum();

    TestResult {
        title: test.title.clone(),
        raw_score,
        maximum_score,
        is_optional: test.is_optional,
        is_selection: false,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
