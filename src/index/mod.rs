//! Vector indexing and similarity scoring

pub mod similarity;
pub mod vector;

pub use similarity::{cosine_similarities, cosine_similarity, l2_normalize, rank_top_n};
pub use vector::{ScoredDocument, VectorIndex};
