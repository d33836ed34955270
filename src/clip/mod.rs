//! CLIP (Contrastive Language-Image Pre-training) scoring backends
//!
//! Scores (prompt, image) pairs through two independent inference stacks:
//! - ONNX Runtime, running the split vision/text encoder towers
//! - libtorch, running the TorchScript export of the full model
//!
//! Both backends report cosine-scale similarity so their aggregates can be
//! compared directly.

mod onnx;
mod preprocess;
mod tokenizer;
mod torch;

pub use onnx::OnnxScorer;
pub use tokenizer::ClipTokenizer;
pub use torch::TorchScorer;

use anyhow::Result;
use image::DynamicImage;
use std::fmt;
use std::str::FromStr;

/// CLIP embedding vector
pub type ClipEmbedding = Vec<f32>;

/// Which inference stack backs a scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Torch,
    Onnx,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Torch => write!(f, "torch"),
            BackendKind::Onnx => write!(f, "onnx"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "torch" => Ok(BackendKind::Torch),
            "onnx" => Ok(BackendKind::Onnx),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

/// A loaded CLIP model that can score one (prompt, image) pair
pub trait ClipScorer {
    /// Cosine-scale similarity between the prompt and the image
    fn score(&mut self, text: &str, image: &DynamicImage) -> Result<f32>;

    /// Which inference stack this scorer runs on
    fn kind(&self) -> BackendKind;
}

/// Calculate cosine similarity between two CLIP embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

/// L2-normalize an embedding, leaving zero vectors untouched
pub(crate) fn l2_normalize(embedding: ClipEmbedding) -> ClipEmbedding {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm > 0.0 {
        embedding.iter().map(|x| x / norm).collect()
    } else {
        embedding
    }
}
