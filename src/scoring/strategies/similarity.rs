use std::sync::Arc;

use crate::llm::EmbeddingModel;
use crate::scoring::{Metric, ScoringStrategy};
use crate::testgen::candidate::Candidate;

/// Mean cosine similarity of each candidate against the whole set,
/// itself included.
pub struct SimilarityStrategy {
    embedder: Arc<dyn EmbeddingModel>,
}

impl SimilarityStrategy {
    pub fn new(embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self { embedder }
    }
}

impl ScoringStrategy for SimilarityStrategy {
    fn metric(&self) -> Metric {
        Metric::Similarity
    }

    fn score(&self, candidates: &[Candidate]) -> Result<Vec<f64>, String> {
        let texts: Vec<String> = candidates.iter().map(|c| c.code.clone()).collect();
        let vectors = self.embedder.embed(&texts)?;

        if vectors.len() != candidates.len() {
            return Err(format!(
                "embedder returned {} vectors for {} candidates",
                vectors.len(),
                candidates.len()
            ));
        }

        Ok(mean_similarity(&vectors))
    }
}

pub fn mean_similarity(vectors: &[Vec<f64>]) -> Vec<f64> {
    let n = vectors.len() as f64;

    vectors
        .iter()
        .map(|a| vectors.iter().map(|b| cosine(a, b)).sum::<f64>() / n)
        .collect()
}

/// Zero vectors are orthogonal to everything, themselves included.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}
