//! Retrieval and fusion pipeline
//!
//! Components:
//! - Expansion: alternative phrasings of the question
//! - Retrieval Engine: threshold similarity search per query
//! - Dedup: union of per-query result sets
//! - Context Builder: render documents for the answer generator
//! - Pipeline: end-to-end orchestration over a shared index

pub mod context;
pub mod dedup;
pub mod expansion;
pub mod pipeline;
pub mod retrieval;

pub use context::{AssembledContext, ContextBuilder, ContextConfig};
pub use dedup::union_dedup;
pub use expansion::{
    parse_reformulations, prepare_queries, ExpansionConfig, OllamaQueryExpander, QueryExpander, StaticExpander,
};
pub use pipeline::{
    IndexSettings, IndexSnapshot, IndexStats, RetrievalConfig, RetrievalContext, RetrievalOutcome, RetrievalPipeline,
};
pub use retrieval::{RetrievalEngine, SearchParams};
