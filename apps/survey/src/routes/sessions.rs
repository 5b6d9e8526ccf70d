//! Axum route handlers for survey sessions.
//!
//! Each command locks its session, applies one engine transition and returns
//! the next render model.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::survey::answers::Answer;
use crate::survey::params::SurveyQuery;
use crate::survey::render::RenderModel;
use crate::survey::session::Session;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub render: RenderModel,
}

#[derive(Debug, Deserialize)]
pub struct ImageSelection {
    pub index: usize,
}

async fn find_session(state: &AppState, id: Uuid) -> Result<Arc<Mutex<Session>>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

fn respond(session_id: Uuid, render: RenderModel) -> Json<SessionResponse> {
    Json(SessionResponse { session_id, render })
}

/// A submitted session has nothing left to do; its summary was already returned.
async fn forget_if_completed(state: &AppState, id: Uuid, session: &Session) {
    if session.is_completed() && state.sessions.remove(id).await {
        info!(
            "Closed survey session {id} after submitting {} results",
            session.engine().results().len()
        );
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions?resume_id=..&tests_id=..[&name=..]
///
/// Validates the hosting page's query, loads every requested test and opens a
/// session on the first question. Halted sessions are not kept.
pub async fn handle_create_session(
    State(state): State<AppState>,
    Query(query): Query<SurveyQuery>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let mut session = Session::start(&query, state.policy, state.collaborators.clone()).await;
    if let Some(reason) = session.halt_reason() {
        return Err(reason.into());
    }

    let render = session.render();
    let test_count = session.engine().tests().len();
    let session_id = state.sessions.insert(session).await;
    info!("Opened survey session {session_id} with {test_count} tests");

    Ok((StatusCode::CREATED, respond(session_id, render)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let render = session.lock().await.render();
    Ok(respond(id, render))
}

/// POST /api/v1/sessions/:id/answer
///
/// Body: `{"slider": 7}` or `{"yes_no": true}`.
pub async fn handle_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(answer): Json<Answer>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let render = session.lock().await.answer(answer)?;
    Ok(respond(id, render))
}

/// POST /api/v1/sessions/:id/image
pub async fn handle_select_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(selection): Json<ImageSelection>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let render = session.lock().await.select_image(selection.index)?;
    Ok(respond(id, render))
}

/// POST /api/v1/sessions/:id/advance
///
/// Finishing the last question submits the results before responding.
pub async fn handle_advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    let render = session.advance().await?;
    forget_if_completed(&state, id, &session).await;
    Ok(respond(id, render))
}

/// POST /api/v1/sessions/:id/retreat
pub async fn handle_retreat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let render = session.lock().await.retreat()?;
    Ok(respond(id, render))
}

/// POST /api/v1/sessions/:id/submit
///
/// Retries a rejected submission; earlier answers are not repeated.
pub async fn handle_retry_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    let render = session.retry_submission().await?;
    forget_if_completed(&state, id, &session).await;
    Ok(respond(id, render))
}

/// DELETE /api/v1/sessions/:id
///
/// Discards an abandoned session and every answer recorded in it.
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.remove(id).await {
        return Err(AppError::NotFound(format!("Session {id} not found")));
    }
    info!("Discarded survey session {id}");
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_definition::{Question, TestDefinition};
    use crate::routes::build_router;
    use crate::survey::engine::SurveyPolicy;
    use crate::survey::session::fakes::{FakeSubmitter, FakeTests};
    use crate::survey::session::Collaborators;
    use crate::survey::store::SessionStore;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn question(text: &str, mark: i64, image: Option<&str>) -> Question {
        Question {
            text: text.to_string(),
            mark,
            image_source: image.map(str::to_string),
        }
    }

    fn app(submitter: Arc<FakeSubmitter>) -> axum::Router {
        let tests = vec![
            TestDefinition::new(
                "rust",
                "Rust",
                Some("Backend developer".into()),
                false,
                vec![question("Ownership", 10, None), question("Lifetimes", 5, None)],
            ),
            TestDefinition::new(
                "pets",
                "Pick a pet",
                None,
                true,
                vec![
                    question("Cats", 1, Some("cats.png")),
                    question("Dogs", 1, Some("dogs.png")),
                ],
            ),
        ];
        let state = AppState {
            sessions: SessionStore::default(),
            collaborators: Collaborators {
                tests: Arc::new(FakeTests::with(tests)),
                submitter,
                subjects: None,
            },
            policy: SurveyPolicy::default(),
        };
        build_router(state)
    }

    async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn open(app: &axum::Router, tests: &str) -> String {
        let uri = format!("/api/v1/sessions?resume_id=42&tests_id={tests}");
        let (status, json) = send(app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = send(&app(Arc::default()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_session_renders_first_question() {
        let app = app(Arc::default());
        let (status, json) =
            send(&app, "POST", "/api/v1/sessions?resume_id=42&tests_id=rust", None).await;

        assert_eq!(status, StatusCode::CREATED);
        let render = &json["render"];
        assert_eq!(render["heading"]["title"], "Rust");
        assert_eq!(render["heading"]["subtitle"], "Backend developer");
        assert_eq!(render["screen"]["kind"], "question");
        assert_eq!(render["screen"]["text"], "1. Ownership");
        assert_eq!(
            render["screen"]["input"],
            json!({ "type": "slider", "min": 0, "max": 10, "value": 0 })
        );
    }

    #[tokio::test]
    async fn test_missing_parameters_are_rejected() {
        let app = app(Arc::default());
        let (status, json) = send(&app, "POST", "/api/v1/sessions?resume_id=42", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_no_loadable_tests_is_bad_gateway() {
        let app = app(Arc::default());
        let (status, json) =
            send(&app, "POST", "/api/v1/sessions?resume_id=42&tests_id=nope", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = app(Arc::default());
        let uri = format!("/api/v1/sessions/{}", Uuid::new_v4());
        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_full_survey_over_http() {
        let submitter = Arc::new(FakeSubmitter::default());
        let app = app(submitter.clone());
        let id = open(&app, "rust,pets").await;
        let base = format!("/api/v1/sessions/{id}");

        let (status, json) =
            send(&app, "POST", &format!("{base}/answer"), Some(json!({ "slider": 7 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["render"]["screen"]["input"]["value"], 7);

        send(&app, "POST", &format!("{base}/advance"), None).await;
        send(&app, "POST", &format!("{base}/answer"), Some(json!({ "slider": 4 }))).await;

        let (_, json) = send(&app, "POST", &format!("{base}/retreat"), None).await;
        assert_eq!(json["render"]["screen"]["input"]["value"], 7);
        send(&app, "POST", &format!("{base}/advance"), None).await;

        let (_, json) = send(&app, "POST", &format!("{base}/advance"), None).await;
        assert_eq!(json["render"]["screen"]["kind"], "image_choice");
        assert_eq!(json["render"]["screen"]["can_advance"], false);

        let (status, _) = send(&app, "POST", &format!("{base}/advance"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        send(&app, "POST", &format!("{base}/image"), Some(json!({ "index": 1 }))).await;
        let (status, json) = send(&app, "POST", &format!("{base}/advance"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["render"]["screen"]["kind"], "summary");
        assert_eq!(
            json["render"]["screen"]["entries"],
            json!([
                { "title": "Rust", "score": "11/15" },
                { "title": "Dogs", "score": null }
            ])
        );

        let batches = submitter.submitted();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].sub_tests.len(), 2);

        let (status, _) = send(&app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_partial_load_reports_failed_test() {
        let app = app(Arc::default());
        let (status, json) = send(
            &app,
            "POST",
            "/api/v1/sessions?resume_id=42&tests_id=rust,nope,pets",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let notifications = json["render"]["notifications"].as_array().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["message"], "Failed to load test nope");
        assert_eq!(notifications[0]["level"], "error");
        assert_eq!(json["render"]["heading"]["subtitle"], "2 tests to complete");

        let id = json["session_id"].as_str().unwrap();
        let (_, json) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(json["render"]["notifications"], json!([]));
    }

    #[tokio::test]
    async fn test_delete_discards_session() {
        let app = app(Arc::default());
        let id = open(&app, "rust").await;
        let uri = format!("/api/v1/sessions/{id}");

        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_out_of_range_slider_is_bad_request() {
        let app = app(Arc::default());
        let id = open(&app, "rust").await;
        let (status, json) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/answer"),
            Some(json!({ "slider": 11 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_rejected_submit_can_be_retried() {
        let submitter = Arc::new(FakeSubmitter::failing(1));
        let app = app(submitter.clone());
        let id = open(&app, "pets").await;
        let base = format!("/api/v1/sessions/{id}");

        send(&app, "POST", &format!("{base}/image"), Some(json!({ "index": 0 }))).await;
        let (status, json) = send(&app, "POST", &format!("{base}/advance"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["render"]["screen"]["kind"], "failed");
        assert_eq!(json["render"]["screen"]["can_retry"], true);
        assert_eq!(json["render"]["notifications"][0]["level"], "error");

        let (status, _) = send(&app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(&app, "POST", &format!("{base}/submit"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["render"]["screen"]["kind"], "summary");
        assert_eq!(submitter.submitted().len(), 2);

        let (status, _) = send(&app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_without_rejection_is_conflict() {
        let app = app(Arc::default());
        let id = open(&app, "rust").await;
        let (status, _) = send(&app, "POST", &format!("/api/v1/sessions/{id}/submit"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
