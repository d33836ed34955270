//! CLIP BPE tokenization via the HuggingFace `tokenizers` runtime.

use anyhow::{anyhow, Result};
use std::path::Path;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::hub;

/// CLIP context window, in tokens, including the start/end specials
pub const CONTEXT_LENGTH: usize = 77;

/// End-of-text token id, also used as padding
const PAD_TOKEN_ID: u32 = 49407;
const PAD_TOKEN: &str = "<|endoftext|>";

// Vocabulary shipped with the reference ViT-B/32 checkpoint
const TOKENIZER_FILE: &str = "clip-bpe-tokenizer.json";
const TOKENIZER_URL: &str =
    "https://huggingface.co/openai/clip-vit-base-patch32/resolve/main/tokenizer.json";

/// CLIP's byte-pair tokenizer, padded/truncated to the model context window
pub struct ClipTokenizer {
    inner: Tokenizer,
}

impl ClipTokenizer {
    /// Fetch the vocabulary into the model cache if needed, then load it
    pub fn ensure(models_dir: &Path) -> Result<Self> {
        let path = hub::ensure_artifact(models_dir, TOKENIZER_FILE, TOKENIZER_URL)?;
        Self::from_file(&path)
    }

    /// Load `tokenizer.json` and configure fixed-length padding and
    /// truncation to the CLIP context window.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {:?}: {}", path, e))?;

        inner.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(CONTEXT_LENGTH),
            pad_id: PAD_TOKEN_ID,
            pad_token: PAD_TOKEN.to_string(),
            ..Default::default()
        }));
        inner
            .with_truncation(Some(TruncationParams {
                max_length: CONTEXT_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        Ok(Self { inner })
    }

    /// Encode a prompt into a fixed-length id sequence of `CONTEXT_LENGTH`
    pub fn encode(&self, text: &str) -> Result<Vec<i64>> {
        let encoding = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow!("Failed to tokenize {:?}: {}", text, e))?;

        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }
}
