//! Embedding backends.
//!
//! The extraction stage normally supplies embeddings. When a candidate or a
//! query arrives without one, the configured `Embedder` fills it in so the
//! corpus and its queries always share one vector space.
//!
//! `HashEmbedder` is FNV-1a feature hashing over unigrams (weight 1.0) and
//! adjacent bigrams (weight 0.5), signed by one hash bit and L2-normalized.
//! No model, fully deterministic across processes.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::retrieval::tokenizer::tokenize;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;

    fn dims(&self) -> usize;

    fn backend(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub backend: String,
    pub dims: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            dims: 768,
        }
    }
}

/// Builds the embedder named by `config.backend`.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    if config.dims == 0 {
        bail!("EMBEDDING_DIMS must be greater than 0");
    }
    match config.backend.trim().to_lowercase().as_str() {
        "" | "hash" => Ok(Box::new(HashEmbedder::new(config.dims))),
        other => bail!("Unknown embedding backend '{other}'"),
    }
}

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dims];
        if self.dims == 0 {
            return embedding;
        }

        let tokens = tokenize(text);
        for token in &tokens {
            accumulate(&mut embedding, token, 1.0);
        }
        for pair in tokens.windows(2) {
            accumulate(&mut embedding, &format!("{} {}", pair[0], pair[1]), 0.5);
        }

        let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn backend(&self) -> &'static str {
        "hash"
    }
}

fn accumulate(embedding: &mut [f32], feature: &str, weight: f32) {
    let hash = fnv1a(feature.as_bytes());
    let bucket = (hash % embedding.len() as u64) as usize;
    // Top bit picks the sign.
    let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
    embedding[bucket] += sign * weight;
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
