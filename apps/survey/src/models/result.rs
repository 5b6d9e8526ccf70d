use serde::{Deserialize, Serialize};

/// Outcome of one completed test. Built once when the engine moves past the
/// test's last question and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Test title, or the chosen option's text for image-choice tests.
    pub title: String,
    #[serde(rename = "result")]
    pub raw_score: i64,
    #[serde(rename = "maximum")]
    pub maximum_score: i64,
    pub is_optional: bool,
    /// Image-choice results record a selection rather than a score.
    #[serde(skip)]
    pub is_selection: bool,
}

impl TestResult {
    /// Label shown on the read-only summary screen.
    pub fn score_label(&self) -> Option<String> {
        if self.is_selection {
            None
        } else {
            Some(format!("{}/{}", self.raw_score, self.maximum_score))
        }
    }
}

/// Body of `POST /result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBatch {
    pub resume_id: i64,
    pub sub_tests: Vec<TestResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_serializes_platform_field_names() {
        let batch = ResultBatch {
            resume_id: 42,
            sub_tests: vec![TestResult {
                title: "Rust".to_string(),
                raw_score: 7,
                maximum_score: 10,
                is_optional: false,
                is_selection: false,
            }],
        };

        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            value,
            json!({
                "resume_id": 42,
                "sub_tests": [
                    { "title": "Rust", "result": 7, "maximum": 10, "is_optional": false }
                ]
            })
        );
    }

    #[test]
    fn test_selection_has_no_score_label() {
        let result = TestResult {
            title: "Cats".to_string(),
            raw_score: 0,
            maximum_score: 0,
            is_optional: true,
            is_selection: true,
        };
        assert_eq!(result.score_label(), None);
    }

    #[test]
    fn test_score_label_formats_raw_over_maximum() {
        let result = TestResult {
            title: "Rust".to_string(),
            raw_score: 3,
            maximum_score: 8,
            is_optional: false,
            is_selection: false,
        };
        assert_eq!(result.score_label().as_deref(), Some("3/8"));
    }
}
