//! TorchScript CLIP scoring on libtorch.
//!
//! Loads the scripted ViT-B/32 archive published with the reference CLIP
//! release. Its forward pass returns image-to-text logits, which carry the
//! checkpoint's learned logit scale; dividing that scale back out yields a
//! plain cosine similarity comparable with the ONNX towers.

use anyhow::{anyhow, Result};
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tch::{CModule, Device, IValue, Kind, Tensor};

use super::preprocess::{self, INPUT_SIZE};
use super::tokenizer::{ClipTokenizer, CONTEXT_LENGTH};
use super::{BackendKind, ClipScorer};
use crate::hub;

// Scripted ViT-B/32 checkpoint from the reference CLIP release
const TORCH_MODEL_FILE: &str = "clip-vit-b32.pt";
const TORCH_MODEL_URL: &str = "https://openaipublic.azureedge.net/clip/models/40d365715913c9da98579312b702a82c18be219cc2a73407c4526f58eba950af/ViT-B-32.pt";

/// The checkpoint's `logit_scale.exp()`. Scores are divided by this so they
/// line up with raw cosine similarity; changing it breaks cross-backend
/// comparison by the same factor.
pub const LOGIT_SCALE: f32 = 100.0;

/// CLIP scorer running the scripted full model on libtorch
pub struct TorchScorer {
    module: CModule,
    tokenizer: ClipTokenizer,
    device: Device,
}

impl TorchScorer {
    /// Download (if needed) and load the scripted module.
    ///
    /// Reads several hundred MB of weights; call once per run, not per
    /// scored pair. Fails if the archive cannot be fetched or loaded.
    pub fn load(models_dir: &Path) -> Result<Self> {
        let started = Instant::now();

        let model_path = hub::ensure_artifact(models_dir, TORCH_MODEL_FILE, TORCH_MODEL_URL)?;
        let tokenizer = ClipTokenizer::ensure(models_dir)?;

        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(&model_path, device)?;

        tracing::info!(elapsed = ?started.elapsed(), device = ?device, "Torch CLIP backend loaded");

        Ok(Self {
            module,
            tokenizer,
            device,
        })
    }

    fn image_tensor(&self, img: &DynamicImage) -> Tensor {
        let data = preprocess::image_to_nchw(img);
        Tensor::of_slice(&data)
            .reshape(&[1, 3, INPUT_SIZE as i64, INPUT_SIZE as i64])
            .to_kind(Kind::Float)
            .to(self.device)
    }

    fn text_tensor(&self, text: &str) -> Result<Tensor> {
        let input_ids = self.tokenizer.encode(text)?;
        Ok(Tensor::of_slice(&input_ids)
            .reshape(&[1, CONTEXT_LENGTH as i64])
            .to(self.device))
    }
}

impl ClipScorer for TorchScorer {
    fn score(&mut self, text: &str, image: &DynamicImage) -> Result<f32> {
        let started = Instant::now();

        let image_input = self.image_tensor(image);
        let text_input = self.text_tensor(text)?;

        let output = tch::no_grad(|| {
            self.module
                .forward_is(&[IValue::Tensor(image_input), IValue::Tensor(text_input)])
        })?;

        // The scripted forward returns (logits_per_image, logits_per_text)
        let logits_per_image = match output {
            IValue::Tuple(mut values) if !values.is_empty() => match values.remove(0) {
                IValue::Tensor(t) => t,
                other => return Err(anyhow!("Unexpected scripted output element: {:?}", other)),
            },
            IValue::Tensor(t) => t,
            other => return Err(anyhow!("Unexpected scripted output: {:?}", other)),
        };

        let score = logits_per_image.double_value(&[0, 0]) as f32 / LOGIT_SCALE;

        tracing::debug!(backend = %self.kind(), elapsed = ?started.elapsed(), score, "Scored pair");
        Ok(score)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Torch
    }
}
