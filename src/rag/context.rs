//! Context assembly for the downstream answer generator
use serde::{Deserialize, Serialize};

use crate::corpus::Document;

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Line opening every document block
    pub separator: String,
    /// Include the `metadata:` section
    pub include_metadata: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            separator: "---".to_string(),
            include_metadata: true,
        }
    }
}

/// Assembled context blob
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The formatted context text
    pub text: String,
    /// Number of documents included
    pub document_count: usize,
    /// Inputs dropped because they carried nothing
    pub skipped_empty: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.document_count == 0
    }
}

/// Renders documents as `content:` / `metadata:` blocks
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build the blob; every non-empty document appears once, in input order
    pub fn build(&self, documents: &[Document]) -> AssembledContext {
        let mut blocks = Vec::with_capacity(documents.len());
        let mut skipped_empty = 0;

        for doc in documents {
            if doc.is_empty() {
                skipped_empty += 1;
                continue;
            }
            blocks.push(self.format_document(doc));
        }

        AssembledContext {
            document_count: blocks.len(),
            text: blocks.join("\n\n"),
            skipped_empty,
        }
    }

    /// Format a single document
    pub fn format_document(&self, doc: &Document) -> String {
        let mut block = format!("{}\ncontent:\n{}\n", self.config.separator, doc.content);

        if self.config.include_metadata {
            block.push_str("\nmetadata:\n");
            for (key, value) in doc.metadata.entries() {
                block.push_str(key);
                block.push_str(": ");
                block.push_str(&value);
                block.push('\n');
            }
        }

        block
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}
