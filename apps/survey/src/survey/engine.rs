//! Survey Engine: question-by-question state machine.
//!
//! States: `Loading → Active(test, question) → Submitting → Completed | Failed`.
//!
//! Every command is a state transition that returns the next [`RenderModel`].
//! The engine performs no I/O; the session driver feeds it loaded tests and
//! submission outcomes.

use tracing::{debug, info, warn};

use crate::models::result::{ResultBatch, TestResult};
use crate::models::test_definition::{AnswerMode, TestDefinition};
use crate::survey::answers::{Answer, AnswerState};
use crate::survey::error::SurveyError;
use crate::survey::loader::LoadOutcome;
use crate::survey::notify::{Notifier, DEFAULT_NOTIFICATION_TTL_MS};
use crate::survey::params::SurveyParams;
use crate::survey::render::{
    AnswerInput, Heading, ImageChoiceScreen, ImageOption, QuestionScreen, RenderModel, Screen,
    SummaryEntry, TestHeader,
};
use crate::survey::scoring::{finalize_test, slider_max};

const MULTI_TEST_TITLE: &str = "Skills Assessment Tests";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyPolicy {
    /// Block forward navigation on questions without an answer.
    pub require_answer: bool,
    pub notification_ttl_ms: i64,
}

impl Default for SurveyPolicy {
    fn default() -> Self {
        Self {
            require_answer: false,
            notification_ttl_ms: DEFAULT_NOTIFICATION_TTL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    FatalInput(String),
    EmptyResult,
    /// Retryable: accumulated results are kept.
    SubmissionRejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurveyState {
    Loading,
    Active {
        test_index: usize,
        question_index: usize,
    },
    Submitting,
    Completed,
    Failed(Failure),
}

#[derive(Debug)]
pub struct SurveyEngine {
    subject_id: Option<i64>,
    display_name: Option<String>,
    policy: SurveyPolicy,
    state: SurveyState,
    tests: Vec<TestDefinition>,
    answers: AnswerState,
    results: Vec<TestResult>,
    /// Input on the current question screen, persisted only by navigation.
    draft: Option<Answer>,
    /// Option picked on the current image-choice screen.
    draft_choice: Option<usize>,
    notifier: Notifier,
}

impl SurveyEngine {
    pub fn new(params: &SurveyParams, policy: SurveyPolicy) -> Self {
        Self {
            subject_id: Some(params.subject_id),
            display_name: params.display_name.clone(),
            policy,
            state: SurveyState::Loading,
            tests: Vec::new(),
            answers: AnswerState::default(),
            results: Vec::new(),
            draft: None,
            draft_choice: None,
            notifier: Notifier::new(policy.notification_ttl_ms),
        }
    }

    /// An engine halted on bad page parameters. Nothing is ever rendered but the error.
    pub fn halted(error: &SurveyError, policy: SurveyPolicy) -> Self {
        let message = match error {
            SurveyError::FatalInput(msg) => msg.clone(),
            other => other.to_string(),
        };
        warn!("Survey halted before loading: {message}");

        let mut notifier = Notifier::new(policy.notification_ttl_ms);
        notifier.error(message.clone());
        Self {
            subject_id: None,
            display_name: None,
            policy,
            state: SurveyState::Failed(Failure::FatalInput(message)),
            tests: Vec::new(),
            answers: AnswerState::default(),
            results: Vec::new(),
            draft: None,
            draft_choice: None,
            notifier,
        }
    }

    pub fn state(&self) -> &SurveyState {
        &self.state
    }

    pub fn tests(&self) -> &[TestDefinition] {
        &self.tests
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    #[cfg(test)]
    pub fn answers(&self) -> &AnswerState {
        &self.answers
    }

    #[cfg(test)]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn set_display_name(&mut self, name: Option<String>) {
        if self.display_name.is_none() {
            self.display_name = name;
        }
    }

    /// True once the engine can never move forward again.
    #[cfg(test)]
    pub fn is_halted(&self) -> bool {
        matches!(
            self.state,
            SurveyState::Failed(Failure::FatalInput(_) | Failure::EmptyResult)
        )
    }

    /// Queues an error for the next render without changing state.
    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.notifier.error(message);
    }

    // ────────────────────────────────────────────────────────────────────────
    // Loading
    // ────────────────────────────────────────────────────────────────────────

    pub fn on_tests_loaded(&mut self, outcome: LoadOutcome) -> Result<RenderModel, SurveyError> {
        if self.state != SurveyState::Loading {
            return Err(self.invalid("tests can only be loaded once"));
        }

        for failure in &outcome.failures {
            debug!("Dropping test {}: {}", failure.test_id, failure.reason);
            self.notifier
                .error(format!("Failed to load test {}", failure.test_id));
        }

        self.tests = outcome.tests;
        if self.tests.is_empty() {
            warn!("No tests could be loaded for subject {:?}", self.subject_id);
            let message = SurveyError::EmptyResult.to_string();
            self.notifier.error(message);
            self.state = SurveyState::Failed(Failure::EmptyResult);
        } else {
            info!("Survey started with {} tests", self.tests.len());
            self.enter(0, 0);
        }

        Ok(self.render())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Answer capture
    // ────────────────────────────────────────────────────────────────────────

    /// Updates the current question's input. The value is persisted by the next
    /// navigation command, not here.
    pub fn on_answer_changed(&mut self, value: Answer) -> Result<RenderModel, SurveyError> {
        let (test_index, question_index) = self.active_position()?;
        let test = &self.tests[test_index];
        let Some(question) = test.questions.get(question_index) else {
            return Err(self.invalid("this test has no questions to answer"));
        };

        match (test.mode, value) {
            (AnswerMode::Rated, Answer::Slider(v)) => {
                let max = slider_max(question.mark);
                if !(0..=max).contains(&v) {
                    return Err(SurveyError::InvalidAnswer(format!(
                        "slider value {v} is outside 0..={max}"
                    )));
                }
            }
            (AnswerMode::YesNo, Answer::YesNo(_)) => {}
            (AnswerMode::ImageChoice, _) => {
                return Err(self.invalid("image-choice tests are answered by selecting an option"));
            }
            (mode, _) => {
                return Err(SurveyError::InvalidAnswer(format!(
                    "answer does not match {mode:?} question"
                )));
            }
        }

        self.draft = Some(value);
        Ok(self.render())
    }

    pub fn on_image_selected(&mut self, option_index: usize) -> Result<RenderModel, SurveyError> {
        let (test_index, _) = self.active_position()?;
        let test = &self.tests[test_index];
        if test.mode != AnswerMode::ImageChoice {
            return Err(self.invalid("the current test is not an image choice"));
        }
        if option_index >= test.questions.len() {
            return Err(SurveyError::InvalidAnswer(format!(
                "option {option_index} does not exist"
            )));
        }

        self.draft_choice = Some(option_index);
        Ok(self.render())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Navigation
    // ────────────────────────────────────────────────────────────────────────

    pub fn on_advance(&mut self) -> Result<RenderModel, SurveyError> {
        let (test_index, question_index) = self.active_position()?;
        let test = &self.tests[test_index];
        let mode = test.mode;
        let question_count = test.question_count();

        if mode == AnswerMode::ImageChoice {
            let choice = self.draft_choice.ok_or(SurveyError::AnswerRequired)?;
            self.answers.record_choice(test_index, choice);
            self.finish_test(test_index);
            return Ok(self.render());
        }

        if question_count == 0 {
            self.finish_test(test_index);
            return Ok(self.render());
        }

        if self.policy.require_answer && self.draft.is_none() {
            return Err(SurveyError::AnswerRequired);
        }

        self.persist_draft(test_index, question_index, mode);
        if question_index + 1 < question_count {
            self.enter(test_index, question_index + 1);
        } else {
            self.finish_test(test_index);
        }
        Ok(self.render())
    }

    /// Steps back within the current test. A no-op on its first question.
    pub fn on_retreat(&mut self) -> Result<RenderModel, SurveyError> {
        let (test_index, question_index) = self.active_position()?;
        if question_index == 0 {
            return Ok(self.render());
        }

        let mode = self.tests[test_index].mode;
        self.persist_draft(test_index, question_index, mode);
        self.enter(test_index, question_index - 1);
        Ok(self.render())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Submission
    // ────────────────────────────────────────────────────────────────────────

    /// The batch to hand to the submitter while the engine is submitting.
    pub fn pending_submission(&self) -> Option<ResultBatch> {
        match (&self.state, self.subject_id) {
            (SurveyState::Submitting, Some(resume_id)) => Some(ResultBatch {
                resume_id,
                sub_tests: self.results.clone(),
            }),
            _ => None,
        }
    }

    pub fn on_submission_accepted(&mut self) -> Result<RenderModel, SurveyError> {
        if self.state != SurveyState::Submitting {
            return Err(self.invalid("no submission in progress"));
        }

        info!(
            "Results for subject {:?} accepted ({} tests)",
            self.subject_id,
            self.results.len()
        );
        self.answers.clear();
        self.draft = None;
        self.draft_choice = None;
        self.state = SurveyState::Completed;
        self.notifier.info("Test results submitted successfully!");
        Ok(self.render())
    }

    pub fn on_submission_rejected(
        &mut self,
        message: impl Into<String>,
    ) -> Result<RenderModel, SurveyError> {
        if self.state != SurveyState::Submitting {
            return Err(self.invalid("no submission in progress"));
        }

        let message = message.into();
        warn!("Results submission rejected: {message}");
        self.notifier
            .error(SurveyError::SubmissionFailure(message.clone()).to_string());
        self.state = SurveyState::Failed(Failure::SubmissionRejected(message));
        Ok(self.render())
    }

    pub fn on_retry_submission(&mut self) -> Result<RenderModel, SurveyError> {
        if !matches!(
            self.state,
            SurveyState::Failed(Failure::SubmissionRejected(_))
        ) {
            return Err(self.invalid("there is no rejected submission to retry"));
        }

        debug!("Retrying results submission");
        self.state = SurveyState::Submitting;
        Ok(self.render())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Internals
    // ────────────────────────────────────────────────────────────────────────

    fn active_position(&self) -> Result<(usize, usize), SurveyError> {
        match self.state {
            SurveyState::Active {
                test_index,
                question_index,
            } => Ok((test_index, question_index)),
            _ => Err(self.invalid("no question is active")),
        }
    }

    fn invalid(&self, reason: &str) -> SurveyError {
        SurveyError::InvalidCommand(format!("{reason} (state: {:?})", self.state))
    }

    fn enter(&mut self, test_index: usize, question_index: usize) {
        self.state = SurveyState::Active {
            test_index,
            question_index,
        };
        self.draft = self.answers.get(test_index, question_index);
        self.draft_choice = self.answers.choice(test_index);
    }

    /// An untouched slider still holds its default of 0; an unchosen yes/no
    /// records nothing.
    fn persist_draft(&mut self, test_index: usize, question_index: usize, mode: AnswerMode) {
        let answer = match (mode, self.draft) {
            (_, Some(answer)) => answer,
            (AnswerMode::Rated, None) => Answer::Slider(0),
            _ => return,
        };
        self.answers.record(test_index, question_index, answer);
    }

    fn finish_test(&mut self, test_index: usize) {
        let result = finalize_test(test_index, &self.tests[test_index], &self.answers);
        debug!(
            "Finished test {} '{}': {}/{}",
            test_index, result.title, result.raw_score, result.maximum_score
        );
        self.results.push(result);

        if test_index + 1 < self.tests.len() {
            self.enter(test_index + 1, 0);
        } else {
            info!("All {} tests finished, submitting", self.results.len());
            self.draft = None;
            self.draft_choice = None;
            self.state = SurveyState::Submitting;
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Rendering
    // ────────────────────────────────────────────────────────────────────────

    /// Builds the current render model and hands over pending notifications.
    pub fn render(&mut self) -> RenderModel {
        RenderModel {
            heading: self.heading(),
            screen: self.screen(),
            notifications: self.notifier.drain(),
        }
    }

    fn heading(&self) -> Heading {
        match self.tests.as_slice() {
            [only] => Heading {
                title: only.title.clone(),
                subtitle: only.profession.clone(),
            },
            [] => Heading {
                title: MULTI_TEST_TITLE.to_string(),
                subtitle: None,
            },
            many => Heading {
                title: MULTI_TEST_TITLE.to_string(),
                subtitle: Some(format!("{} tests to complete", many.len())),
            },
        }
    }

    fn screen(&self) -> Screen {
        match &self.state {
            SurveyState::Loading => Screen::Loading,
            SurveyState::Submitting => Screen::Submitting,
            SurveyState::Completed => Screen::Summary {
                entries: self
                    .results
                    .iter()
                    .map(|r| SummaryEntry {
                        title: r.title.clone(),
                        score: r.score_label(),
                    })
                    .collect(),
            },
            SurveyState::Failed(failure) => {
                let (message, can_retry) = match failure {
                    Failure::FatalInput(msg) => (msg.clone(), false),
                    Failure::EmptyResult => (SurveyError::EmptyResult.to_string(), false),
                    Failure::SubmissionRejected(msg) => {
                        (SurveyError::SubmissionFailure(msg.clone()).to_string(), true)
                    }
                };
                Screen::Failed { message, can_retry }
            }
            SurveyState::Active {
                test_index,
                question_index,
            } => self.active_screen(*test_index, *question_index),
        }
    }

    fn active_screen(&self, test_index: usize, question_index: usize) -> Screen {
        let test = &self.tests[test_index];
        let mut header = TestHeader {
            test_index,
            test_count: self.tests.len(),
            title: test.title.clone(),
            profession: test.profession.clone(),
            survey_heading: test.is_optional.then(|| self.survey_heading()),
            can_advance: true,
        };

        if test.mode == AnswerMode::ImageChoice {
            header.can_advance = self.draft_choice.is_some();
            return Screen::ImageChoice(ImageChoiceScreen {
                header,
                options: test
                    .questions
                    .iter()
                    .enumerate()
                    .map(|(index, q)| ImageOption {
                        index,
                        label: q.text.clone(),
                        image_source: q.image_source.clone().unwrap_or_default(),
                    })
                    .collect(),
                selected: self.draft_choice,
            });
        }

        let Some(question) = test.questions.get(question_index) else {
            return Screen::EmptyTest(header);
        };

        header.can_advance = !self.policy.require_answer || self.draft.is_some();
        let input = match test.mode {
            AnswerMode::YesNo => AnswerInput::YesNo {
                selected: match self.draft {
                    Some(Answer::YesNo(yes)) => Some(yes),
                    _ => None,
                },
            },
            _ => AnswerInput::Slider {
                min: 0,
                max: slider_max(question.mark),
                value: match self.draft {
                    Some(Answer::Slider(v)) => v,
                    _ => 0,
                },
            },
        };

        Screen::Question(QuestionScreen {
            header,
            question_index,
            question_count: test.question_count(),
            text: format!("{}. {}", question_index + 1, question.text),
            input,
            can_retreat: question_index > 0,
            is_last_question: question_index + 1 == test.question_count(),
        })
    }

    fn survey_heading(&self) -> String {
        match &self.display_name {
            Some(name) => format!("Optional survey for {name}"),
            None => "Optional survey".to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
