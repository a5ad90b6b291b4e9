//! Hybrid candidate retrieval: BM25 over normalized text, exact cosine over
//! embeddings, fused with Reciprocal Rank Fusion.

pub mod error;
pub mod evaluation;
pub mod fusion;
pub mod handlers;
pub mod lexical;
pub mod pipeline;
pub mod store;
pub mod tokenizer;
pub mod types;
pub mod vector;
