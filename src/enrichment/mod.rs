//! Guide step enrichment
//!
//! Components:
//! - Client: iFixit guide endpoint behind the [`GuideStepSource`] seam
//! - Backoff: bounded rate-limit retry schedule
//! - Enricher: fetch, render and splice `Step N:` blocks

pub mod backoff;
pub mod client;
pub mod enricher;

pub use backoff::{BackoffPolicy, BackoffStrategy};
pub use client::{parse_steps, GuideResponse, GuideStep, GuideStepSource, IfixitClient, DEFAULT_IFIXIT_URL};
pub use enricher::{apply_steps, render_steps, EnrichmentStatus, FetchedSteps, GuideStepEnricher};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{FixError, Result};

/// Enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Skip the append when the rendered steps are already in the content
    pub skip_if_present: bool,
    pub backoff: BackoffPolicy,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_IFIXIT_URL.to_string(),
            timeout_secs: 10,
            skip_if_present: true,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl EnrichmentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(FixError::ConfigError(
                "enrichment.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(FixError::ConfigError(
                "enrichment.base_url must not be empty".to_string(),
            ));
        }
        self.backoff.validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Enricher backed by the HTTP client, or None when disabled
    pub fn build(&self) -> Result<Option<GuideStepEnricher>> {
        if !self.enabled {
            return Ok(None);
        }
        let client = IfixitClient::new(&self.base_url, self.timeout())?;
        Ok(Some(
            GuideStepEnricher::new(Arc::new(client), self.backoff.clone(), self.timeout())
                .with_skip_if_present(self.skip_if_present),
        ))
    }
}
