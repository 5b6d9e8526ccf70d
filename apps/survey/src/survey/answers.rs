use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A raw per-question answer. Image-choice tests record a test-level choice
/// instead (see [`AnswerState::choice`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Slider(i64),
    YesNo(bool),
}

/// Answers captured during one session, keyed by position.
///
/// Entries are only ever inserted or overwritten; the whole state is dropped
/// once the batch has been accepted.
#[derive(Debug, Default, Clone)]
pub struct AnswerState {
    answers: HashMap<(usize, usize), Answer>,
    choices: HashMap<usize, usize>,
}

impl AnswerState {
    pub fn record(&mut self, test_index: usize, question_index: usize, answer: Answer) {
        self.answers.insert((test_index, question_index), answer);
    }

    pub fn get(&self, test_index: usize, question_index: usize) -> Option<Answer> {
        self.answers.get(&(test_index, question_index)).copied()
    }

    pub fn record_choice(&mut self, test_index: usize, option_index: usize) {
        self.choices.insert(test_index, option_index);
    }

    pub fn choice(&self, test_index: usize) -> Option<usize> {
        self.choices.get(&test_index).copied()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.choices.is_empty()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
        self.choices.clear();
    }
}
