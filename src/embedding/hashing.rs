//! Offline embedder based on feature hashing
//!
//! Each lower-cased word and each character trigram of the `^word$` padded
//! form adds one unit to a hashed bucket. Related word forms ("replace",
//! "replacement") share most trigrams, which keeps similarity meaningful
//! without a neural model.
//!
//! Buckets come from 64-bit FNV-1a, so vectors are stable across builds and
//! can be persisted.

use super::Embedder;
use crate::errors::Result;

/// Deterministic bag-of-features embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: format!("hashing-fnv1a-trigram-{}", dimension),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) % self.dimension as u64) as usize
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();

        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            vector[self.bucket(word)] += 1.0;

            let padded: Vec<char> = std::iter::once('^')
                .chain(word.chars())
                .chain(std::iter::once('$'))
                .collect();
            for trigram in padded.windows(3) {
                let feature: String = trigram.iter().collect();
                vector[self.bucket(&feature)] += 1.0;
            }
        }

        vector
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME))
}

impl Embedder for HashingEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::similarity::cosine_similarity;

    #[test]
    fn test_deterministic() {
        let embedder = HashingEmbedder::new(128);
        assert_eq!(
            embedder.embed("Cracked screen").unwrap(),
            embedder.embed("Cracked screen").unwrap()
        );
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_buckets_are_fixed() {
        let embedder = HashingEmbedder::new(64);
        let vector = embedder.embed("a").unwrap();
        let expected = [
            fnv1a(b"a") % 64,
            fnv1a("^a$".as_bytes()) % 64,
        ];
        for bucket in expected {
            assert!(vector[bucket as usize] > 0.0);
        }
        assert_eq!(embedder.model_id(), "hashing-fnv1a-trigram-64");
    }

    #[test]
    fn test_case_insensitive() {
        let embedder = HashingEmbedder::new(128);
        assert_eq!(
            embedder.embed("BATTERY").unwrap(),
            embedder.embed("battery").unwrap()
        );
    }

    #[test]
    fn test_related_words_score_higher() {
        let embedder = HashingEmbedder::new(512);
        let query = embedder.embed("screen replacement").unwrap();
        let related = embedder.embed("Replace screen").unwrap();
        let unrelated = embedder.embed("keyboard driver").unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        assert!(embedder.embed("").unwrap().iter().all(|v| *v == 0.0));
    }
}
