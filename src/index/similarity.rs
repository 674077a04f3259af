//! Cosine similarity scoring
//!
//! Normalization convention: every stored vector and every query vector is
//! passed through [`l2_normalize`] exactly once before it is compared. Cosine
//! similarity of two normalized vectors is then their dot product. Zero
//! vectors stay zero and score 0.0 against everything.

/// Scale `vector` to unit L2 norm in place; zero vectors are left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Owned normalized copy
pub fn normalized(vector: &[f32]) -> Vec<f32> {
    let mut copy = vector.to_vec();
    l2_normalize(&mut copy);
    copy
}

/// Dot product of two equally sized vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity of two raw vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    dot(&normalized(a), &normalized(b))
}

/// Similarity of one query against N candidates, in candidate order.
///
/// The query is normalized here; `candidates` must already be normalized with
/// [`l2_normalize`], which is how the index and the guide embedding store keep
/// them.
pub fn cosine_similarities(query: &[f32], candidates: &[Vec<f32>]) -> Vec<f32> {
    let query = normalized(query);
    candidates.iter().map(|candidate| dot(&query, candidate)).collect()
}

/// Indices of the best scores, descending; ties keep original order.
///
/// Only scores reaching `threshold` qualify, and at most `top_n` are returned.
pub fn rank_top_n(scores: &[f32], top_n: usize, threshold: Option<f32>) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .filter(|(_, score)| threshold.map_or(true, |min| *score >= min))
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_normalized_self_similarity_is_one() {
        let v = normalized(&[3.0, 4.0, 12.0]);
        assert!((dot(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_similarities_length() {
        let candidates = vec![normalized(&[1.0, 0.0]), normalized(&[1.0, 1.0]), normalized(&[0.0, 1.0])];
        let scores = cosine_similarities(&[2.0, 0.0], &candidates);
        assert_eq!(scores.len(), 3);
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert!((scores[1] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!(scores[2].abs() < 1e-6);
    }

    #[test]
    fn test_rank_top_n_ties_keep_order() {
        let ranked = rank_top_n(&[0.5, 0.9, 0.5, 0.9], 3, None);
        assert_eq!(ranked.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 3, 0]);
    }

    #[test]
    fn test_rank_top_n_threshold_may_return_fewer() {
        let ranked = rank_top_n(&[0.2, 0.8, 0.4], 3, Some(0.5));
        assert_eq!(ranked, vec![(1, 0.8)]);
        assert!(rank_top_n(&[0.1, 0.2], 3, Some(0.9)).is_empty());
    }

    #[quickcheck]
    fn prop_self_similarity_is_one(values: Vec<i8>) -> bool {
        let v: Vec<f32> = values.iter().map(|x| *x as f32).collect();
        if v.iter().all(|x| *x == 0.0) {
            return true;
        }
        let n = normalized(&v);
        (dot(&n, &n) - 1.0).abs() < 1e-4
    }

    #[quickcheck]
    fn prop_raising_threshold_never_grows(scores: Vec<i8>, low: i8, high: i8) -> bool {
        let scores: Vec<f32> = scores.iter().map(|s| *s as f32 / 128.0).collect();
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let low = low as f32 / 128.0;
        let high = high as f32 / 128.0;
        rank_top_n(&scores, usize::MAX, Some(high)).len()
            <= rank_top_n(&scores, usize::MAX, Some(low)).len()
    }
}
