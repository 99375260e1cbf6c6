//! Vector similarity over claim embeddings.
//!
//! Pure math, no external calls. Embeddings are looked up by claim id through
//! [`EmbeddingIndex`]; the candidate generator treats a missing or
//! dimension-mismatched vector as "no semantic signal".

use std::collections::HashMap;

use crate::types::ClaimId;

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Returns `0.0` for empty, zero-norm or differently-sized inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Why a semantic lookup could not be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingLookup {
    Missing,
    DimensionMismatch { expected: usize, actual: usize },
}

/// Claim embeddings keyed by claim id.
///
/// The dimension is fixed by the first inserted vector; vectors of any other
/// size are still stored but never compared.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    vectors: HashMap<ClaimId, Vec<f32>>,
    dimension: Option<usize>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from `(claim_id, vector)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ClaimId, Vec<f32>)>,
    {
        let mut index = Self::new();
        for (id, vector) in pairs {
            index.insert(id, vector);
        }
        index
    }

    pub fn insert(&mut self, claim_id: impl Into<ClaimId>, vector: Vec<f32>) {
        if self.dimension.is_none() && !vector.is_empty() {
            self.dimension = Some(vector.len());
        }
        self.vectors.insert(claim_id.into(), vector);
    }

    pub fn get(&self, claim_id: &str) -> Option<&[f32]> {
        self.vectors.get(claim_id).map(Vec::as_slice)
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The embedding for `claim_id` if it exists and has the index dimension.
    pub fn lookup(&self, claim_id: &str) -> Result<&[f32], EmbeddingLookup> {
        let vector = self.get(claim_id).ok_or(EmbeddingLookup::Missing)?;
        match self.dimension {
            Some(expected) if expected != vector.len() => Err(EmbeddingLookup::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            _ if vector.is_empty() => Err(EmbeddingLookup::Missing),
            _ => Ok(vector),
        }
    }

    /// Cosine similarity between two indexed claims, `None` if either is unusable.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        let va = self.lookup(a).ok()?;
        let vb = self.lookup(b).ok()?;
        Some(cosine_similarity(va, vb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identity_is_one() {
        let v = vec![0.3, -1.2, 4.0, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-0.5, 4.0, 0.25];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_index_lookup_reports_mismatch() {
        let mut index = EmbeddingIndex::new();
        index.insert("a", vec![1.0, 0.0, 0.0]);
        index.insert("b", vec![1.0, 0.0]);
        assert_eq!(index.dimension(), Some(3));
        assert!(index.lookup("a").is_ok());
        assert_eq!(
            index.lookup("b"),
            Err(EmbeddingLookup::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(index.lookup("zzz"), Err(EmbeddingLookup::Missing));
        assert_eq!(index.similarity("a", "b"), None);
    }

    #[test]
    fn test_index_similarity() {
        let index = EmbeddingIndex::from_pairs(vec![
            ("a".to_string(), vec![1.0, 1.0]),
            ("b".to_string(), vec![2.0, 2.0]),
        ]);
        let sim = index.similarity("a", "b").unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }
}
