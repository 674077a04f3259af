//! Telemetry for fixbuddy
//!
//! Structured logging setup and per-request retrieval counters.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing_subscriber::EnvFilter;

use crate::cli::Verbosity;
use crate::errors::{FixError, Result};
use crate::enrichment::EnrichmentStatus;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter used at normal verbosity when `RUST_LOG` is unset
    pub log_filter: String,
    /// Print per-request counters after a command
    pub show_stats: bool,
    pub color_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "fixbuddy=info".to_string(),
            show_stats: false,
            color_output: true,
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        EnvFilter::try_new(&self.log_filter)
            .map(|_| ())
            .map_err(|e| FixError::ConfigError(format!("Invalid telemetry.log_filter: {}", e)))
    }
}

/// Filter directive for a verbosity level
pub fn filter_for(verbosity: Verbosity, normal: &str) -> String {
    match verbosity {
        Verbosity::Quiet => "error".to_string(),
        Verbosity::Normal => normal.to_string(),
        Verbosity::Verbose => "fixbuddy=debug".to_string(),
        Verbosity::VeryVerbose => "trace".to_string(),
    }
}

/// Install the global subscriber, logging to stderr.
///
/// `RUST_LOG` wins over the verbosity flags. Calling this twice is harmless.
pub fn init_logging(verbosity: Verbosity, config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_for(verbosity, &config.log_filter)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.color_output)
        .try_init();
}

/// Retrieval events counted per request
#[derive(Debug, Clone)]
pub enum RetrievalEvent {
    QueryExecuted { hits: usize },
    ResultsMerged { raw: usize, unique: usize },
    GuideEnrichment(EnrichmentStatus),
    ContextAssembled { documents: usize, skipped: usize },
}

/// Per-request retrieval statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalStats {
    pub queries_run: usize,
    pub raw_hits: usize,
    pub unique_hits: usize,
    pub guides_enriched: usize,
    pub guides_already_enriched: usize,
    pub enrichment_failures: usize,
    pub rate_limit_retries: u32,
    pub documents_in_context: usize,
    pub elapsed_ms: u64,
}

impl RetrievalStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event
    pub fn record(&mut self, event: &RetrievalEvent) {
        match event {
            RetrievalEvent::QueryExecuted { hits } => {
                self.queries_run += 1;
                self.raw_hits += hits;
            }
            RetrievalEvent::ResultsMerged { unique, .. } => {
                self.unique_hits = *unique;
            }
            RetrievalEvent::GuideEnrichment(status) => match status {
                EnrichmentStatus::Enriched { retries, .. } => {
                    self.guides_enriched += 1;
                    self.rate_limit_retries += retries;
                }
                EnrichmentStatus::AlreadyPresent => self.guides_already_enriched += 1,
                EnrichmentStatus::Failed { retries, .. } => {
                    self.enrichment_failures += 1;
                    self.rate_limit_retries += retries;
                }
                EnrichmentStatus::Skipped | EnrichmentStatus::NoSteps => {}
            },
            RetrievalEvent::ContextAssembled { documents, .. } => {
                self.documents_in_context = *documents;
            }
        }
    }

    /// Share of raw hits removed as duplicates
    pub fn duplicate_ratio(&self) -> f64 {
        if self.raw_hits == 0 {
            0.0
        } else {
            (self.raw_hits - self.unique_hits.min(self.raw_hits)) as f64 / self.raw_hits as f64
        }
    }
}

impl fmt::Display for RetrievalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Queries run:        {}", self.queries_run)?;
        writeln!(f, "Raw hits:           {}", self.raw_hits)?;
        writeln!(f, "Unique hits:        {}", self.unique_hits)?;
        writeln!(f, "Duplicates merged:  {:.0}%", self.duplicate_ratio() * 100.0)?;
        writeln!(f, "Guides enriched:    {}", self.guides_enriched)?;
        writeln!(f, "Enrichment errors:  {}", self.enrichment_failures)?;
        writeln!(f, "Rate-limit retries: {}", self.rate_limit_retries)?;
        write!(f, "Elapsed:            {}ms", self.elapsed_ms)
    }
}
