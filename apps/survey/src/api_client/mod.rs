//! Platform API client is the single point of entry for every call the survey
//! makes to the recruiting platform.
//!
//! Implements the survey's collaborator traits against:
//! - `GET  {base}/test/{id}`    → test definition
//! - `GET  {base}/resumes/{id}` → subject (resume) details
//! - `POST {base}/result`       → results batch

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::result::ResultBatch;
use crate::models::test_definition::{TestDefinition, TestDefinitionDto};
use crate::survey::provider::{ResultSubmitter, SubjectProvider, TestProvider};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Request failed after {retries} attempts")]
    RetriesExhausted { retries: u32 },

    #[error("Invalid platform URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Api { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Api { status, .. } => format!("request failed with status {status}"),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlatformError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResumeSummary {
    fullname: String,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self, ApiError> {
        let raw = base_url.into();
        let base_url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(raw));
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url,
            max_retries: max_retries.max(1),
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        })
    }

    /// Overrides the first backoff delay; later retries double it.
    #[cfg(test)]
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Appends path segments to the base URL, percent-encoding each one so an
    /// id can never change the route it is sent to.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Posts the results batch, retrying transport errors, 429 and 5xx with
    /// exponential backoff. Other failures return immediately.
    pub async fn submit(&self, batch: &ResultBatch) -> Result<(), ApiError> {
        let url = self.endpoint(&["result"]);
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "Result submission attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(url.clone()).json(batch).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ApiError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let error = error_from_response(response).await;
                warn!("Platform API returned {}: {}", status, error);
                last_error = Some(error);
                continue;
            }

            if !status.is_success() {
                return Err(error_from_response(response).await);
            }

            debug!(
                "Submitted {} results for resume {}",
                batch.sub_tests.len(),
                batch.resume_id
            );
            return Ok(());
        }

        Err(last_error.unwrap_or(ApiError::RetriesExhausted {
            retries: self.max_retries,
        }))
    }

    pub async fn get_test(&self, test_id: &str) -> Result<TestDefinition, ApiError> {
        let response = self.client.get(self.endpoint(&["test", test_id])).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await?;
        let dto: TestDefinitionDto = serde_json::from_str(&body)?;
        Ok(TestDefinition::from_dto(test_id, dto))
    }

    pub async fn get_subject_name(&self, resume_id: i64) -> Result<String, ApiError> {
        let response = self
            .client
            .get(self.endpoint(&["resumes", &resume_id.to_string()]))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await?;
        let resume: ResumeSummary = serde_json::from_str(&body)?;
        Ok(resume.fullname)
    }
}

/// Reads a failed response, preferring the platform's `{ "message": ... }` body.
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<PlatformError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    ApiError::Api { status, message }
}

#[async_trait]
impl TestProvider for ApiClient {
    async fn fetch_test(&self, test_id: &str) -> Result<TestDefinition, ApiError> {
        self.get_test(test_id).await
    }
}

#[async_trait]
impl ResultSubmitter for ApiClient {
    async fn submit_results(&self, batch: &ResultBatch) -> Result<(), ApiError> {
        self.submit(batch).await
    }
}

#[async_trait]
impl SubjectProvider for ApiClient {
    async fn fetch_subject_name(&self, subject_id: i64) -> Result<String, ApiError> {
        self.get_subject_name(subject_id).await
    }
}
