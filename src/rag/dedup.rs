//! Union of per-query result sets without duplicates

use std::collections::HashSet;

use crate::index::ScoredDocument;

/// Flatten result sets and drop repeated documents.
///
/// Two results are the same document when their content and metadata are
/// equal; the score does not take part. The first occurrence wins, so the
/// output follows query order, then rank within a query.
pub fn union_dedup(result_sets: Vec<Vec<ScoredDocument>>) -> Vec<ScoredDocument> {
    let flattened: Vec<ScoredDocument> = result_sets.into_iter().flatten().collect();

    let keep: Vec<bool> = {
        let mut seen = HashSet::with_capacity(flattened.len());
        flattened.iter().map(|r| seen.insert(r.document.dedup_key())).collect()
    };

    flattened
        .into_iter()
        .zip(keep)
        .filter_map(|(result, keep)| keep.then_some(result))
        .collect()
}
