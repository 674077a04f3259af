//! Splices remote repair steps into guide documents

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::backoff::BackoffPolicy;
use super::client::{parse_steps, GuideStep, GuideStepSource};
use crate::corpus::Document;
use crate::errors::{FixError, Result};

/// Outcome of enriching one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentStatus {
    /// Not a guide document
    Skipped,
    /// Steps appended
    Enriched { steps: usize, retries: u32 },
    /// The rendered block was already in the content
    AlreadyPresent,
    /// The guide has no steps
    NoSteps,
    /// Fetch failed; content left unchanged
    Failed { reason: String, retries: u32 },
}

/// Steps fetched for a guide and the retries it took
#[derive(Debug, Clone)]
pub struct FetchedSteps {
    pub steps: Vec<GuideStep>,
    pub retries: u32,
}

/// Render steps as `\nStep N:\n<lines>` blocks, in order
pub fn render_steps(steps: &[GuideStep]) -> String {
    steps
        .iter()
        .map(|step| format!("\nStep {}:\n{}", step.stepno, step.lines.join("\n")))
        .collect()
}

/// Append `block` unless it is empty or, when `skip_if_present`, already contained
pub fn apply_steps(content: &mut String, block: &str, skip_if_present: bool) -> bool {
    if block.is_empty() || (skip_if_present && content.contains(block)) {
        return false;
    }
    content.push_str(block);
    true
}

/// Guide step enricher with bounded rate-limit retries
pub struct GuideStepEnricher {
    source: Arc<dyn GuideStepSource>,
    backoff: BackoffPolicy,
    request_timeout: Duration,
    skip_if_present: bool,
}

impl GuideStepEnricher {
    pub fn new(source: Arc<dyn GuideStepSource>, backoff: BackoffPolicy, request_timeout: Duration) -> Self {
        Self {
            source,
            backoff,
            request_timeout,
            skip_if_present: true,
        }
    }

    /// Toggle the "already present" guard
    pub fn with_skip_if_present(mut self, skip_if_present: bool) -> Self {
        self.skip_if_present = skip_if_present;
        self
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// One request. A 429 comes back as `RateLimited` so the caller can retry.
    async fn attempt(&self, guideid: u64, attempt: u32) -> Result<Vec<GuideStep>> {
        let response = match timeout(self.request_timeout, self.source.fetch_guide(guideid)).await {
            Ok(response) => response?,
            Err(_) => {
                return Err(FixError::Timeout {
                    duration_ms: self.request_timeout.as_millis() as u64,
                })
            }
        };

        if response.is_rate_limited() {
            return Err(FixError::RateLimited { attempt });
        }
        if !response.is_success() {
            return Err(FixError::RemoteGuideUnavailable {
                guideid,
                reason: format!("status {}", response.status),
            });
        }
        parse_steps(&response.body)
    }

    /// Fetch the ordered steps of a guide.
    ///
    /// Rate-limited attempts are retried until `max_attempts` is reached, then
    /// the guide is reported as `RemoteGuideUnavailable`. Any other failure is
    /// reported the same way without retrying.
    pub async fn fetch_steps(&self, guideid: u64) -> Result<FetchedSteps> {
        let (steps, retries) = self.fetch_with_retries(guideid).await;
        let steps = steps?;
        info!(guideid, steps = steps.len(), retries, "Guide steps fetched");
        Ok(FetchedSteps { steps, retries })
    }

    /// Retry loop; the retry count is reported whether or not it succeeded
    async fn fetch_with_retries(&self, guideid: u64) -> (Result<Vec<GuideStep>>, u32) {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let retries = attempt - 1;
            match self.attempt(guideid, attempt).await {
                Ok(steps) => return (Ok(steps), retries),
                Err(FixError::RateLimited { .. }) if self.backoff.allows_retry(attempt) => {
                    let delay = self.backoff.delay_for(attempt);
                    warn!(
                        guideid,
                        attempt,
                        wait_ms = delay.as_millis() as u64,
                        "Guide API rate limited, backing off"
                    );
                    sleep(delay).await;
                }
                Err(FixError::RateLimited { .. }) => {
                    let err = FixError::RemoteGuideUnavailable {
                        guideid,
                        reason: format!("still rate limited after {} attempts", attempt),
                    };
                    return (Err(err), retries);
                }
                Err(e @ FixError::RemoteGuideUnavailable { .. }) => return (Err(e), retries),
                Err(e) => {
                    let err = FixError::RemoteGuideUnavailable {
                        guideid,
                        reason: e.to_string(),
                    };
                    return (Err(err), retries);
                }
            }
        }
    }

    /// Append the guide's steps to a guide document.
    ///
    /// Never fails: on any fetch error the content is left untouched and the
    /// reason is reported in the status.
    pub async fn enrich(&self, document: &mut Document) -> EnrichmentStatus {
        let Some(guideid) = document.guideid() else {
            return EnrichmentStatus::Skipped;
        };

        let (steps, retries) = self.fetch_with_retries(guideid).await;
        let fetched = match steps {
            Ok(steps) => {
                info!(guideid, steps = steps.len(), retries, "Guide steps fetched");
                FetchedSteps { steps, retries }
            }
            Err(e) => {
                warn!(guideid, retries, error = %e, "Guide enrichment failed");
                return EnrichmentStatus::Failed {
                    reason: e.to_string(),
                    retries,
                };
            }
        };

        if fetched.steps.is_empty() {
            return EnrichmentStatus::NoSteps;
        }

        let block = render_steps(&fetched.steps);
        if apply_steps(&mut document.content, &block, self.skip_if_present) {
            EnrichmentStatus::Enriched {
                steps: fetched.steps.len(),
                retries: fetched.retries,
            }
        } else {
            debug!(guideid, "Guide steps already present");
            EnrichmentStatus::AlreadyPresent
        }
    }
}
