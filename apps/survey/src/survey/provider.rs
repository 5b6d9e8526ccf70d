//! Collaborator traits the survey depends on. The platform API client
//! implements all three; tests swap in in-memory fakes.

use async_trait::async_trait;

use crate::api_client::ApiError;
use crate::models::result::ResultBatch;
use crate::models::test_definition::TestDefinition;

/// Fetches one test definition by id.
#[async_trait]
pub trait TestProvider: Send + Sync {
    async fn fetch_test(&self, test_id: &str) -> Result<TestDefinition, ApiError>;
}

/// Posts the aggregated results batch.
#[async_trait]
pub trait ResultSubmitter: Send + Sync {
    async fn submit_results(&self, batch: &ResultBatch) -> Result<(), ApiError>;
}

/// Resolves the subject's display name when the page did not pass one.
#[async_trait]
pub trait SubjectProvider: Send + Sync {
    async fn fetch_subject_name(&self, subject_id: i64) -> Result<String, ApiError>;
}
