use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

use hinter_core::model::Flowchart;

use crate::api::types::{ErrorBody, FlowchartRequest, GenerationOptions, StepLinksRequest, StepLinksResponse};
use crate::error::ApiError;

/// Every request is bounded by this deadline and cancelled past it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var("HINTER_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::new(base_url)
    }

    /// Override the request deadline, mainly for tests.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The external generation endpoint, behind a trait so sessions take an
/// explicitly constructed client instead of a module-level singleton.
#[async_trait]
pub trait GuidanceApi: Send + Sync {
    /// Generate a flowchart for a problem description.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport, status, decode, or validation failures.
    async fn generate_flowchart(
        &self,
        problem: &str,
        options: &GenerationOptions,
    ) -> Result<Flowchart, ApiError>;

    /// Fetch supplementary resources for one step.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport, status, or decode failures.
    async fn step_links(&self, request: &StepLinksRequest) -> Result<StepLinksResponse, ApiError>;
}

#[derive(Clone)]
pub struct GuidanceClient {
    client: Client,
    config: ApiConfig,
}

impl GuidanceClient {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ApiConfig::from_env())
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Liveness probe.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the server is unreachable or unhealthy.
    pub async fn health(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .get(self.endpoint("/api/health"))
            .timeout(self.config.timeout)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl GuidanceApi for GuidanceClient {
    async fn generate_flowchart(
        &self,
        problem: &str,
        options: &GenerationOptions,
    ) -> Result<Flowchart, ApiError> {
        let payload = FlowchartRequest { problem, options };
        let response = self
            .client
            .post(self.endpoint("/api/flowchart"))
            .timeout(self.config.timeout)
            .json(&payload)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body)?;

        // The payload crosses a trust boundary: validate before it may enter
        // any session state.
        Ok(Flowchart::from_value(&value)?)
    }

    async fn step_links(&self, request: &StepLinksRequest) -> Result<StepLinksResponse, ApiError> {
        let response = self
            .client
            .post(self.endpoint("/api/step-links"))
            .timeout(self.config.timeout)
            .json(request)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(ErrorBody::into_detail)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    Err(ApiError::Http { status, detail })
}
