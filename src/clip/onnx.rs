//! Two-tower CLIP scoring on ONNX Runtime.

use anyhow::{anyhow, Result};
use image::DynamicImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::time::Instant;

use super::preprocess::{self, INPUT_SIZE};
use super::tokenizer::{ClipTokenizer, CONTEXT_LENGTH};
use super::{cosine_similarity, l2_normalize, BackendKind, ClipEmbedding, ClipScorer};
use crate::hub;

// Qdrant's CLIP ViT-B/32 export, split into vision and text encoders
// Source: https://huggingface.co/Qdrant/clip-ViT-B-32-vision
const VISION_MODEL_FILE: &str = "clip-vit-b32-vision.onnx";
const VISION_MODEL_URL: &str =
    "https://huggingface.co/Qdrant/clip-ViT-B-32-vision/resolve/main/model.onnx";
const TEXT_MODEL_FILE: &str = "clip-vit-b32-text.onnx";
const TEXT_MODEL_URL: &str =
    "https://huggingface.co/Qdrant/clip-ViT-B-32-text/resolve/main/model.onnx";

/// CLIP scorer running the encoder towers on ONNX Runtime.
///
/// Each tower emits an embedding; both are L2-normalized and their dot
/// product is the reported score.
pub struct OnnxScorer {
    vision: Session,
    text: Session,
    tokenizer: ClipTokenizer,
}

impl OnnxScorer {
    /// Download (if needed) and load both encoder sessions.
    ///
    /// Reads several hundred MB of weights; call once per run, not per
    /// scored pair. Fails if an artifact cannot be fetched or parsed.
    pub fn load(models_dir: &Path) -> Result<Self> {
        let started = Instant::now();

        let vision_path = hub::ensure_artifact(models_dir, VISION_MODEL_FILE, VISION_MODEL_URL)?;
        let text_path = hub::ensure_artifact(models_dir, TEXT_MODEL_FILE, TEXT_MODEL_URL)?;
        let tokenizer = ClipTokenizer::ensure(models_dir)?;

        let vision = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&vision_path)?;
        let text = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&text_path)?;

        tracing::info!(elapsed = ?started.elapsed(), "ONNX CLIP backend loaded");

        Ok(Self {
            vision,
            text,
            tokenizer,
        })
    }

    fn encode_image(&mut self, img: &DynamicImage) -> Result<ClipEmbedding> {
        let input_data = preprocess::image_to_nchw(img);
        let input_tensor = Tensor::from_array((
            [1usize, 3, INPUT_SIZE as usize, INPUT_SIZE as usize],
            input_data.into_boxed_slice(),
        ))?;

        let outputs = self.vision.run(ort::inputs!["pixel_values" => input_tensor])?;
        let embedding_output = outputs
            .iter()
            .next()
            .ok_or_else(|| anyhow!("No image embedding output"))?;
        let (_shape, embedding_data) = embedding_output.1.try_extract_tensor::<f32>()?;

        Ok(l2_normalize(embedding_data.to_vec()))
    }

    fn encode_text(&mut self, text: &str) -> Result<ClipEmbedding> {
        let input_ids = self.tokenizer.encode(text)?;
        let input_tensor =
            Tensor::from_array(([1usize, CONTEXT_LENGTH], input_ids.into_boxed_slice()))?;

        let outputs = self.text.run(ort::inputs!["input_ids" => input_tensor])?;
        let embedding_output = outputs
            .iter()
            .next()
            .ok_or_else(|| anyhow!("No text embedding output"))?;
        let (_shape, embedding_data) = embedding_output.1.try_extract_tensor::<f32>()?;

        Ok(l2_normalize(embedding_data.to_vec()))
    }
}

impl ClipScorer for OnnxScorer {
    fn score(&mut self, text: &str, image: &DynamicImage) -> Result<f32> {
        let started = Instant::now();

        let image_embedding = self.encode_image(image)?;
        let text_embedding = self.encode_text(text)?;
        let score = cosine_similarity(&image_embedding, &text_embedding);

        tracing::debug!(backend = %self.kind(), elapsed = ?started.elapsed(), score, "Scored pair");
        Ok(score)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Onnx
    }
}
