//! Render models: what a renderer needs to draw the current screen.
//!
//! The engine produces these after every command; the JSON session host and
//! the tests are the two renderers in this crate.

use serde::Serialize;

use crate::survey::notify::Notification;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heading {
    pub title: String,
    pub subtitle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderModel {
    pub heading: Heading,
    pub screen: Screen,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Screen {
    Loading,
    Question(QuestionScreen),
    ImageChoice(ImageChoiceScreen),
    EmptyTest(TestHeader),
    Submitting,
    Summary { entries: Vec<SummaryEntry> },
    Failed { message: String, can_retry: bool },
}

/// Section header shown above every question of a test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestHeader {
    pub test_index: usize,
    pub test_count: usize,
    pub title: String,
    pub profession: Option<String>,
    /// Personalised heading for optional surveys.
    pub survey_heading: Option<String>,
    pub can_advance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionScreen {
    #[serde(flatten)]
    pub header: TestHeader,
    pub question_index: usize,
    pub question_count: usize,
    /// Prompt prefixed with its 1-based number.
    pub text: String,
    pub input: AnswerInput,
    pub can_retreat: bool,
    pub is_last_question: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerInput {
    Slider { min: i64, max: i64, value: i64 },
    YesNo { selected: Option<bool> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageChoiceScreen {
    #[serde(flatten)]
    pub header: TestHeader,
    pub options: Vec<ImageOption>,
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOption {
    pub index: usize,
    pub label: String,
    pub image_source: String,
}

/// One line of the read-only summary: a scored test shows `raw/max`, an
/// image-choice entry shows only its label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub title: String,
    pub score: Option<String>,
}

#[cfg(test)]
impl Screen {
    pub fn can_advance(&self) -> bool {
        match self {
            Screen::Question(q) => q.header.can_advance,
            Screen::ImageChoice(s) => s.header.can_advance,
            Screen::EmptyTest(h) => h.can_advance,
            _ => false,
        }
    }

    pub fn can_submit(&self) -> bool {
        matches!(self, Screen::Failed { can_retry: true, .. })
    }
}
