use serde::{Deserialize, Deserializer, Serialize};

/// How a test collects answers. Derived once from the definition's shape when
/// the test is loaded and never re-derived afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    /// One slider per question, `0..=max(mark, 1)`.
    Rated,
    /// One yes/no choice per question.
    YesNo,
    /// A single pick among the test's questions, each shown as an image option.
    ImageChoice,
}

impl AnswerMode {
    /// Optional tests become image-choice only when every question carries an
    /// image; a test that mixes image and plain questions stays yes/no.
    pub fn detect(is_optional: bool, questions: &[Question]) -> Self {
        if !is_optional {
            return AnswerMode::Rated;
        }
        let all_images =
            !questions.is_empty() && questions.iter().all(|q| q.image_source.is_some());
        if all_images {
            AnswerMode::ImageChoice
        } else {
            AnswerMode::YesNo
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(alias = "question")]
    pub text: String,
    pub mark: i64,
    #[serde(
        default,
        rename = "image_src",
        alias = "image_source",
        alias = "imageSource"
    )]
    pub image_source: Option<String>,
}

/// Test definition as served by `GET /test/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TestDefinitionDto {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, rename = "proffesion", alias = "profession")]
    pub profession: Option<String>,
    #[serde(default, alias = "isOptional")]
    pub is_optional: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A loaded test, read-only to the survey engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestDefinition {
    pub id: String,
    pub title: String,
    pub profession: Option<String>,
    pub is_optional: bool,
    pub questions: Vec<Question>,
    pub mode: AnswerMode,
}

impl TestDefinition {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        profession: Option<String>,
        is_optional: bool,
        questions: Vec<Question>,
    ) -> Self {
        let mode = AnswerMode::detect(is_optional, &questions);
        Self {
            id: id.into(),
            title: title.into(),
            profession: profession.filter(|p| !p.trim().is_empty()),
            is_optional,
            questions,
            mode,
        }
    }

    /// Converts the wire form, falling back to the requested id when the
    /// payload omits its own. A blank image source counts as no image.
    pub fn from_dto(requested_id: &str, dto: TestDefinitionDto) -> Self {
        let id = dto.id.unwrap_or_else(|| requested_id.to_string());
        let questions = dto
            .questions
            .into_iter()
            .map(|q| Question {
                image_source: q.image_source.filter(|src| !src.trim().is_empty()),
                ..q
            })
            .collect();
        Self::new(id, dto.title, dto.profession, dto.is_optional, questions)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(mark: i64, image: Option<&str>) -> Question {
        Question {
            text: format!("q{mark}"),
            mark,
            image_source: image.map(str::to_string),
        }
    }

    #[test]
    fn test_non_optional_is_rated_even_with_images() {
        let qs = vec![question(3, Some("a.png"))];
        assert_eq!(AnswerMode::detect(false, &qs), AnswerMode::Rated);
    }

    #[test]
    fn test_optional_without_images_is_yes_no() {
        let qs = vec![question(3, None), question(-1, None)];
        assert_eq!(AnswerMode::detect(true, &qs), AnswerMode::YesNo);
    }

    #[test]
    fn test_optional_with_all_images_is_image_choice() {
        let qs = vec![question(1, Some("a.png")), question(1, Some("b.png"))];
        assert_eq!(AnswerMode::detect(true, &qs), AnswerMode::ImageChoice);
    }

    #[test]
    fn test_mixed_images_fall_back_to_yes_no() {
        let qs = vec![question(1, Some("a.png")), question(1, None)];
        assert_eq!(AnswerMode::detect(true, &qs), AnswerMode::YesNo);
    }

    #[test]
    fn test_empty_optional_test_is_not_image_choice() {
        assert_eq!(AnswerMode::detect(true, &[]), AnswerMode::YesNo);
    }

    #[test]
    fn test_dto_accepts_platform_field_names() {
        let dto: TestDefinitionDto = serde_json::from_value(json!({
            "id": 17,
            "title": "Backend",
            "proffesion": "Rust developer",
            "is_optional": true,
            "questions": [
                { "question": "Cats", "mark": 1, "image_src": "cat.png" },
                { "question": "Dogs", "mark": 1, "image_src": "dog.png" }
            ]
        }))
        .unwrap();

        let test = TestDefinition::from_dto("ignored", dto);
        assert_eq!(test.id, "17");
        assert_eq!(test.profession.as_deref(), Some("Rust developer"));
        assert_eq!(test.questions[1].text, "Dogs");
        assert_eq!(test.mode, AnswerMode::ImageChoice);
    }

    #[test]
    fn test_blank_image_sources_are_not_images() {
        let dto: TestDefinitionDto = serde_json::from_value(json!({
            "id": "8",
            "title": "Habits",
            "is_optional": true,
            "questions": [
                { "question": "Coffee?", "mark": 1, "image_src": "" },
                { "question": "Tea?", "mark": -1, "image_src": "  " }
            ]
        }))
        .unwrap();

        let test = TestDefinition::from_dto("8", dto);
        assert_eq!(test.mode, AnswerMode::YesNo);
        assert!(test.questions.iter().all(|q| q.image_source.is_none()));
    }

    #[test]
    fn test_dto_without_id_uses_requested_id() {
        let dto: TestDefinitionDto = serde_json::from_value(json!({
            "title": "Soft skills",
            "questions": [{ "text": "Teamwork", "mark": 5 }]
        }))
        .unwrap();

        let test = TestDefinition::from_dto("abc", dto);
        assert_eq!(test.id, "abc");
        assert!(!test.is_optional);
        assert_eq!(test.mode, AnswerMode::Rated);
        assert!(test.profession.is_none());
    }
}
