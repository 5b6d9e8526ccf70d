use thiserror::Error;

/// Errors raised by the survey engine and its session driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurveyError {
    /// Missing or malformed page parameters. Halts before anything is rendered.
    #[error("Invalid survey parameters: {0}")]
    FatalInput(String),

    /// Every requested test failed to load.
    #[error("Could not load any tests. Please try again later.")]
    EmptyResult,

    /// The results batch was rejected. Progress is kept and the submit can be retried.
    #[error("Error submitting results: {0}")]
    SubmissionFailure(String),

    /// The command does not apply to the engine's current state.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Forward navigation is disabled until the current question is answered.
    #[error("An answer is required before continuing")]
    AnswerRequired,

    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),
}
