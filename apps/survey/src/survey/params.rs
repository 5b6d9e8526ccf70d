use serde::Deserialize;

use crate::survey::error::SurveyError;

/// Raw query parameters of the hosting page.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SurveyQuery {
    pub resume_id: Option<String>,
    pub tests_id: Option<String>,
    pub name: Option<String>,
}

/// Validated session inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyParams {
    pub subject_id: i64,
    pub test_ids: Vec<String>,
    pub display_name: Option<String>,
}

impl SurveyParams {
    /// Validates the page query. `tests_id` is a comma-separated list; blank
    /// segments are dropped and the remaining order is kept.
    pub fn from_query(query: &SurveyQuery) -> Result<Self, SurveyError> {
        let raw_subject = query
            .resume_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(missing_parameters)?;

        let subject_id = raw_subject.parse::<i64>().map_err(|_| {
            SurveyError::FatalInput(format!("resume_id '{raw_subject}' is not a valid number"))
        })?;

        let test_ids: Vec<String> = query
            .tests_id
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        if test_ids.is_empty() {
            return Err(missing_parameters());
        }

        let display_name = query
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(SurveyParams {
            subject_id,
            test_ids,
            display_name,
        })
    }
}

fn missing_parameters() -> SurveyError {
    SurveyError::FatalInput(
        "Missing required parameters. Please check the URL and try again.".to_string(),
    )
}
