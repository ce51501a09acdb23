//! Hash embeddings (xf-style)
//!
//! Implements FNV-1a based hash embeddings for semantic similarity.
//! No ML model dependencies - fully deterministic. Remote providers plug in
//! behind the same [`Embedder`] trait (see `embeddings_api`).

use crate::config::EmbeddingConfig;
use crate::error::{FhError, Result};
use crate::search::embeddings_api::ApiEmbedder;

/// Pluggable embedding backend interface.
///
/// `embed` fails with [`FhError::EmbeddingUnavailable`] when the provider
/// cannot produce a vector; callers treat that as a per-call failure.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dims(&self) -> usize;
    fn name(&self) -> &str;
}

/// Build an embedder from embedding config.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let backend = config.backend.trim().to_lowercase();
    let dims = config.dims as usize;
    if dims == 0 {
        return Err(FhError::Config(
            "embedding.dims must be greater than 0".to_string(),
        ));
    }

    match backend.as_str() {
        "" | "hash" => Ok(Box::new(HashEmbedder::new(dims))),
        "api" => Ok(Box::new(ApiEmbedder::from_config(config)?)),
        other => Err(FhError::Config(format!(
            "unknown embedding backend: {other}"
        ))),
    }
}

/// Hash embedder using FNV-1a
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    /// Embedding dimension (default: 384)
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl HashEmbedder {
    /// Create embedder with specified dimension
    pub const fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Embed text into an L2-normalized vector. Text with no usable tokens
    /// embeds to the zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        if self.dim == 0 {
            return Vec::new();
        }

        let tokens = tokenize(text);
        let mut embedding = vec![0.0; self.dim];

        if tokens.is_empty() {
            return embedding;
        }

        for token in &tokens {
            accumulate_embedding(&mut embedding, token, 1.0);
        }

        for window in tokens.windows(2) {
            let bigram = format!("{} {}", window[0], window[1]);
            accumulate_embedding(&mut embedding, &bigram, 0.5);
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dims(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Cosine similarity. Mismatched lengths or zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '&' || c == '/'))
        .filter(|token| token.chars().count() >= 2)
        .map(ToString::to_string)
        .collect()
}

fn accumulate_embedding(embedding: &mut [f32], token: &str, weight: f32) {
    let token_hash = fnv1a_hash(token.as_bytes());

    for i in 0..embedding.len() {
        let dim_hash = fnv1a_hash_with_salt(token_hash, i as u64);
        let sign = if dim_hash & 1 == 0 { weight } else { -weight };
        let dim = ((dim_hash >> 1) as usize) % embedding.len();
        embedding[dim] += sign;
    }
}

fn fnv1a_hash_with_salt(seed: u64, salt: u64) -> u64 {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..].copy_from_slice(&salt.to_le_bytes());
    fnv1a_hash(&bytes)
}

fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_hash_known_value() {
        assert_eq!(fnv1a_hash(b"hello"), 0xa430_d846_80aa_bd0b);
    }

    #[test]
    fn test_embedding_dimensions() {
        let embedder = HashEmbedder::new(64);
        let embedding = embedder.embed("interest rate swap").unwrap();
        assert_eq!(embedding.len(), 64);
        assert_eq!(embedder.dims(), 64);
    }

    #[test]
    fn test_embedding_normalized() {
        let embedder = HashEmbedder::new(128);
        let embedding = embedder.embed_text("price to earnings ratio");
        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_embedding_empty_input() {
        let embedder = HashEmbedder::new(32);
        // 1-char tokens are filtered out by the tokenizer
        let embedding = embedder.embed_text("a b c d");
        assert!(embedding.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        assert_eq!(embedder.embed_text("Hedging"), embedder.embed_text("hedging"));
    }

    #[test]
    fn test_similarity_prefers_related_text() {
        let embedder = HashEmbedder::new(256);
        let a = embedder.embed_text("what is hedging");
        let b = embedder.embed_text("hedging");
        let c = embedder.embed_text("municipal bond");

        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[3.0, 4.0], &[3.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_build_embedder_backends() {
        let config = EmbeddingConfig::default();
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "hash");
        assert_eq!(embedder.dims(), 384);

        let config = EmbeddingConfig {
            backend: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(build_embedder(&config), Err(FhError::Config(_))));

        let config = EmbeddingConfig {
            dims: 0,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(build_embedder(&config), Err(FhError::Config(_))));
    }

    #[test]
    fn test_embedding_normalized_random_inputs() {
        let embedder = HashEmbedder::new(64);
        let mut seed = 0x1234_5678_9abc_def0u64;

        for _ in 0..20 {
            let text = random_text(&mut seed, 6);
            let embedding = embedder.embed_text(&text);
            let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-3);
        }
    }

    fn random_text(seed: &mut u64, words: usize) -> String {
        let mut out = String::new();
        for i in 0..words {
            if i > 0 {
                out.push(' ');
            }
            let len = 3 + (next_u32(seed) % 6) as usize;
            for _ in 0..len {
                out.push((b'a' + (next_u32(seed) % 26) as u8) as char);
            }
        }
        out
    }

    fn next_u32(seed: &mut u64) -> u32 {
        *seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        (*seed >> 32) as u32
    }
}
