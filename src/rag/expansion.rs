//! Multi-query expansion
//!
//! An expander turns one question into alternative phrasings. Its output is
//! only a list of strings; what the caller does with an empty or failed
//! expansion is decided by [`prepare_queries`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{FixError, Result};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default reformulation model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Produces alternative phrasings of a question
#[async_trait]
pub trait QueryExpander: Send + Sync {
    /// Zero or more reformulations, in the order they should be searched
    async fn expand(&self, question: &str) -> Result<Vec<String>>;
}

/// Expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    pub enabled: bool,
    pub ollama_url: String,
    pub model: String,
    /// Reformulations requested from the model
    pub num_queries: usize,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            num_queries: 5,
            timeout_secs: 30,
            temperature: 0.0,
        }
    }
}

impl ExpansionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.num_queries == 0 {
            return Err(FixError::ConfigError(
                "expansion.num_queries must be greater than 0".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(FixError::ConfigError(
                "expansion.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

/// Reformulates questions with a local Ollama model
#[derive(Debug, Clone)]
pub struct OllamaQueryExpander {
    client: Client,
    base_url: String,
    model: String,
    num_queries: usize,
    temperature: f32,
}

impl OllamaQueryExpander {
    pub fn new(config: &ExpansionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(FixError::HttpError)?;

        Ok(Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            num_queries: config.num_queries,
            temperature: config.temperature,
        })
    }

    fn prompt(&self, question: &str) -> String {
        format!(
            "Generate {} different rephrasings of the user's question to retrieve relevant \
             documents from a vector database. Write one question per line, in English, \
             with no other text.\n\nOriginal question: {}",
            self.num_queries, question
        )
    }
}

#[async_trait]
impl QueryExpander for OllamaQueryExpander {
    async fn expand(&self, question: &str) -> Result<Vec<String>> {
        let url = format!("{}/api/generate", self.base_url);
        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: self.prompt(question),
            stream: false,
            options: Some(OllamaOptions {
                temperature: self.temperature,
            }),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| FixError::ExpansionError(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            return Err(FixError::ExpansionError(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let body: OllamaGenerateResponse = response.json().await?;
        let mut queries = parse_reformulations(&body.response);
        queries.truncate(self.num_queries);
        debug!(count = queries.len(), "Query reformulations generated");
        Ok(queries)
    }
}

/// Fixed reformulations, regardless of the question
#[derive(Debug, Clone, Default)]
pub struct StaticExpander {
    queries: Vec<String>,
}

impl StaticExpander {
    pub fn new<I, S>(queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queries: queries.into_iter().map(Into::into).collect(),
        }
    }

    /// Expander that never produces a reformulation
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueryExpander for StaticExpander {
    async fn expand(&self, _question: &str) -> Result<Vec<String>> {
        Ok(self.queries.clone())
    }
}

/// Split model output into one query per line.
///
/// Blank lines are dropped, as are list markers such as `1.`, `2)` or `-`.
pub fn parse_reformulations(output: &str) -> Vec<String> {
    output
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    let rest = &line[digits..];
    let rest = if digits > 0 {
        match rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            Some(stripped) => stripped,
            None => return line,
        }
    } else if let Some(stripped) = rest.strip_prefix("- ").or_else(|| rest.strip_prefix("* ")) {
        stripped
    } else {
        rest
    };
    rest.trim()
}

/// Final list of queries to search, in order.
///
/// The original question comes first when `include_original` is set. A
/// failed or empty expansion falls back to the question alone, so the list
/// is never empty.
pub fn prepare_queries(question: &str, expansion: Result<Vec<String>>, include_original: bool) -> Vec<String> {
    let expanded = match expansion {
        Ok(queries) => queries,
        Err(e) => {
            warn!(error = %e, "Query expansion failed, using the original question");
            Vec::new()
        }
    };

    let mut queries = Vec::with_capacity(expanded.len() + 1);
    if include_original {
        queries.push(question.to_string());
    }
    for query in expanded {
        let query = query.trim();
        if !query.is_empty() && !queries.iter().any(|q| q == query) {
            queries.push(query.to_string());
        }
    }

    if queries.is_empty() {
        warn!(error = %FixError::EmptyExpansion, "Falling back to the original question");
        queries.push(question.to_string());
    }
    queries
}
