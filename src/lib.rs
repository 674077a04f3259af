//! fixbuddy - Retrieval and fusion core for a repair troubleshooting assistant
//!
//! Given a free-text problem description, surfaces the most relevant repair
//! guides and forum threads, enriches guide matches with their steps, and
//! assembles one deduplicated context blob for an answer generator.
//!
//! # Architecture
//!
//! - **corpus**: guide/post loading, typed documents, chunking
//! - **embedding**: candle sentence encoder and an offline hashing embedder
//! - **index**: cosine similarity and the exact vector index
//! - **recommend**: standalone top-N guide recommendation
//! - **enrichment**: remote guide steps with bounded rate-limit backoff
//! - **rag**: query expansion, multi-query retrieval, union-dedup, context assembly

pub mod errors;

pub mod corpus;
pub mod embedding;
pub mod index;
pub mod recommend;
pub mod enrichment;
pub mod rag;

pub mod cli;
pub mod telemetry;

// Re-export commonly used types
pub use errors::{FixError, Result};
pub use rag::{RetrievalContext, RetrievalOutcome, RetrievalPipeline};
