//! Session driver: connects a [`SurveyEngine`] to its collaborators.
//!
//! The engine only transitions state; the session performs the I/O those
//! transitions ask for (loading tests, resolving the subject's name, posting
//! the results batch) and feeds the outcomes back.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api_client::ApiError;
use crate::survey::answers::Answer;
use crate::survey::engine::{Failure, SurveyEngine, SurveyPolicy, SurveyState};
use crate::survey::error::SurveyError;
use crate::survey::loader::load_tests;
use crate::survey::params::{SurveyParams, SurveyQuery};
use crate::survey::provider::{ResultSubmitter, SubjectProvider, TestProvider};
use crate::survey::notify::Notification;
use crate::survey::render::RenderModel;

pub const SUBJECT_LOOKUP_FAILED: &str = "Could not load resume information. Please try again later.";

/// Services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub tests: Arc<dyn TestProvider>,
    pub submitter: Arc<dyn ResultSubmitter>,
    pub subjects: Option<Arc<dyn SubjectProvider>>,
}

pub struct Session {
    engine: SurveyEngine,
    collaborators: Collaborators,
    /// Raised while starting, before any render reached the caller.
    undelivered: Vec<Notification>,
}

impl Session {
    /// Validates the page query and loads every requested test. The returned
    /// session may already be halted; check [`Session::halt_reason`].
    pub async fn start(
        query: &SurveyQuery,
        policy: SurveyPolicy,
        collaborators: Collaborators,
    ) -> Session {
        let params = match SurveyParams::from_query(query) {
            Ok(params) => params,
            Err(e) => {
                return Session {
                    engine: SurveyEngine::halted(&e, policy),
                    collaborators,
                    undelivered: Vec::new(),
                }
            }
        };

        let mut engine = SurveyEngine::new(&params, policy);
        let (outcome, subject_name) = tokio::join!(
            load_tests(collaborators.tests.as_ref(), &params.test_ids),
            lookup_subject_name(&collaborators, &params),
        );
        match subject_name {
            Ok(name) => engine.set_display_name(name),
            Err(e) => {
                warn!("Could not load subject {}: {e}", params.subject_id);
                engine.notify_error(SUBJECT_LOOKUP_FAILED);
            }
        }

        // The engine is freshly built in `Loading`, so this cannot be rejected.
        let undelivered = match engine.on_tests_loaded(outcome) {
            Ok(render) => render.notifications,
            Err(e) => {
                warn!("Unexpected load transition failure: {e}");
                Vec::new()
            }
        };

        Session {
            engine,
            collaborators,
            undelivered,
        }
    }

    pub fn engine(&self) -> &SurveyEngine {
        &self.engine
    }

    /// The error that stopped the session for good, if any.
    pub fn halt_reason(&self) -> Option<SurveyError> {
        match self.engine.state() {
            SurveyState::Failed(Failure::FatalInput(msg)) => {
                Some(SurveyError::FatalInput(msg.clone()))
            }
            SurveyState::Failed(Failure::EmptyResult) => Some(SurveyError::EmptyResult),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.engine.state() == &SurveyState::Completed
    }

    pub fn render(&mut self) -> RenderModel {
        let render = self.engine.render();
        self.deliver(render)
    }

    pub fn answer(&mut self, value: Answer) -> Result<RenderModel, SurveyError> {
        let render = self.engine.on_answer_changed(value)?;
        Ok(self.deliver(render))
    }

    pub fn select_image(&mut self, option_index: usize) -> Result<RenderModel, SurveyError> {
        let render = self.engine.on_image_selected(option_index)?;
        Ok(self.deliver(render))
    }

    pub fn retreat(&mut self) -> Result<RenderModel, SurveyError> {
        let render = self.engine.on_retreat()?;
        Ok(self.deliver(render))
    }

    /// Advances; when this finishes the last test the batch is submitted
    /// before returning.
    pub async fn advance(&mut self) -> Result<RenderModel, SurveyError> {
        let render = self.engine.on_advance()?;
        let render = self.submit_pending(render).await?;
        Ok(self.deliver(render))
    }

    /// Re-submits after a rejected batch without repeating any test.
    pub async fn retry_submission(&mut self) -> Result<RenderModel, SurveyError> {
        let render = self.engine.on_retry_submission()?;
        let render = self.submit_pending(render).await?;
        Ok(self.deliver(render))
    }

    /// Puts notifications no caller has seen yet ahead of the render's own.
    fn deliver(&mut self, mut render: RenderModel) -> RenderModel {
        if !self.undelivered.is_empty() {
            let mut notifications = std::mem::take(&mut self.undelivered);
            notifications.append(&mut render.notifications);
            render.notifications = notifications;
        }
        render
    }

    async fn submit_pending(&mut self, render: RenderModel) -> Result<RenderModel, SurveyError> {
        let Some(batch) = self.engine.pending_submission() else {
            return Ok(render);
        };

        info!(
            "Submitting {} results for resume {}",
            batch.sub_tests.len(),
            batch.resume_id
        );
        let mut next = match self.collaborators.submitter.submit_results(&batch).await {
            Ok(()) => self.engine.on_submission_accepted()?,
            Err(e) => self.engine.on_submission_rejected(e.user_message())?,
        };

        let mut notifications = render.notifications;
        notifications.append(&mut next.notifications);
        next.notifications = notifications;
        Ok(next)
    }
}

/// `Ok(None)` when the name is already known or nothing can look it up.
async fn lookup_subject_name(
    collaborators: &Collaborators,
    params: &SurveyParams,
) -> Result<Option<String>, ApiError> {
    if params.display_name.is_some() {
        return Ok(None);
    }
    let Some(subjects) = collaborators.subjects.as_ref() else {
        return Ok(None);
    };
    subjects.fetch_subject_name(params.subject_id).await.map(Some)
}
