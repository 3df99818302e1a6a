use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::llm::backend::LlmBackend;
use crate::llm::EmbeddingModel;

/// Embedding model name selecting the local token embedder.
pub const LOCAL_EMBEDDING_MODEL: &str = "local";

pub const TOKEN_DIMS: usize = 256;

/* ---------- remote ---------- */

pub struct RemoteEmbedder {
    backend: LlmBackend,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(backend: LlmBackend, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }
}

impl EmbeddingModel for RemoteEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, String> {
        self.backend.embed(&self.model, texts)
    }
}

/* ---------- local ---------- */

/// Bag-of-tokens counts over a hashed vocabulary. No network, fully
/// deterministic.
pub struct TokenEmbedder {
    dims: usize,
}

impl TokenEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn vector(&self, text: &str) -> Vec<f64> {
        static TOKEN: OnceLock<Regex> = OnceLock::new();
        let re = TOKEN.get_or_init(|| {
            Regex::new(r"[A-Za-z_][A-Za-z0-9_]*|\d+|[^\sA-Za-z0-9_]").expect("static regex")
        });

        let mut v = vec![0.0; self.dims];
        for tok in re.find_iter(text) {
            v[bucket(tok.as_str(), self.dims)] += 1.0;
        }
        v
    }
}

impl Default for TokenEmbedder {
    fn default() -> Self {
        Self::new(TOKEN_DIMS)
    }
}

impl EmbeddingModel for TokenEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f64>>, String> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

fn bucket(token: &str, dims: usize) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(head) % dims as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::strategies::SimilarityStrategy;
    use crate::scoring::ScoringStrategy;
    use crate::testgen::candidate::Candidate;
    use std::sync::Arc;

    #[test]
    fn identical_texts_embed_identically() {
        let e = TokenEmbedder::default();
        assert_eq!(e.vector("def f(x): return x"), e.vector("def f(x): return x"));
        assert_eq!(e.vector("a b").len(), TOKEN_DIMS);
    }

    #[test]
    fn counts_every_token() {
        let e = TokenEmbedder::new(8);
        let total: f64 = e.vector("x = x + 1").iter().sum();
        assert_eq!(total, 5.0);
    }

    #[test]
    fn related_code_is_more_similar_than_unrelated() {
        let cands = Candidate::batch(vec![
            "def compute(a, b):\n    return a + b".into(),
            "def compute(a, b):\n    return a + b + 0".into(),
            "while True: pass".into(),
        ]);

        let scores = SimilarityStrategy::new(Arc::new(TokenEmbedder::default()))
            .score(&cands)
            .unwrap_or_default();

        assert!(scores[0] > scores[2]);
        assert!(scores[1] > scores[2]);
    }
}
