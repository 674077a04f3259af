//! iFixit guide API client
//!
//! Endpoint: GET {base_url}/guides/{guideid}

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::{FixError, Result};

/// Default public API root
pub const DEFAULT_IFIXIT_URL: &str = "https://www.ifixit.com/api/2.0";

/// Raw answer of the guide endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideResponse {
    pub status: u16,
    pub body: String,
}

impl GuideResponse {
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Anything that can answer guide lookups
#[async_trait]
pub trait GuideStepSource: Send + Sync {
    /// Fetch the raw guide record. Non-200 statuses are returned, not raised.
    async fn fetch_guide(&self, guideid: u64) -> Result<GuideResponse>;
}

/// HTTP client for the iFixit API
#[derive(Debug, Clone)]
pub struct IfixitClient {
    client: Client,
    base_url: String,
}

impl IfixitClient {
    /// Create a client with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fixbuddy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FixError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn guide_url(&self, guideid: u64) -> String {
        format!("{}/guides/{}", self.base_url, guideid)
    }
}

#[async_trait]
impl GuideStepSource for IfixitClient {
    async fn fetch_guide(&self, guideid: u64) -> Result<GuideResponse> {
        let response = self.client.get(self.guide_url(guideid)).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(GuideResponse { status, body })
    }
}

/// One ordered repair step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideStep {
    /// 1-based position in the guide
    pub stepno: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GuidePayload {
    #[serde(default)]
    steps: Vec<StepPayload>,
}

#[derive(Debug, Deserialize)]
struct StepPayload {
    #[serde(default)]
    lines: Vec<LinePayload>,
}

#[derive(Debug, Deserialize)]
struct LinePayload {
    #[serde(default)]
    text_rendered: Option<String>,
}

/// Extract ordered steps from a guide body.
///
/// Steps are numbered by position; lines without rendered text are skipped.
pub fn parse_steps(body: &str) -> Result<Vec<GuideStep>> {
    let payload: GuidePayload = serde_json::from_str(body)?;
    Ok(payload
        .steps
        .into_iter()
        .enumerate()
        .map(|(idx, step)| GuideStep {
            stepno: idx + 1,
            lines: step.lines.into_iter().filter_map(|l| l.text_rendered).collect(),
        })
        .collect())
}
