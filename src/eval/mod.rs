//! Score aggregation and cross-backend verification.

mod captions;

pub use captions::{random_caption, CAPTIONS};

use anyhow::Result;
use thiserror::Error;

use crate::clip::ClipScorer;
use crate::source::NamedImage;

/// Default closeness tolerance for cross-backend comparison
pub const DEFAULT_TOLERANCE: f32 = 1e-3;

/// Validation failures in the scoring loop
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    /// Images and prompts pair up by position, so the counts must agree.
    #[error("got {images} images but {prompts} prompts; inputs must pair up")]
    LengthMismatch { images: usize, prompts: usize },
    #[error("nothing to score")]
    Empty,
}

/// Mean CLIP score of each `images[i]` against `prompts[i]`.
///
/// Pairs are scored sequentially; the scorer may run its own accelerator
/// parallelism internally.
pub fn evaluate(
    images: &[NamedImage],
    prompts: &[String],
    scorer: &mut dyn ClipScorer,
) -> Result<f32> {
    if images.len() != prompts.len() {
        return Err(EvalError::LengthMismatch {
            images: images.len(),
            prompts: prompts.len(),
        }
        .into());
    }
    if images.is_empty() {
        return Err(EvalError::Empty.into());
    }

    let mut scores = Vec::with_capacity(images.len());
    for (named, prompt) in images.iter().zip(prompts) {
        let score = scorer.score(prompt, &named.image)?;
        tracing::debug!(image = %named.name, prompt = %prompt, score, "Scored");
        scores.push(score);
    }

    Ok(scores.iter().sum::<f32>() / scores.len() as f32)
}

/// Evaluate the same inputs under two scorers and report whether the means
/// agree within `tolerance`.
///
/// A mismatch is an expected outcome, surfaced through the return value and
/// the log, never as an error.
pub fn check_consistency(
    images: &[NamedImage],
    prompts: &[String],
    a: &mut dyn ClipScorer,
    b: &mut dyn ClipScorer,
    tolerance: f32,
) -> Result<bool> {
    let score_a = evaluate(images, prompts, a)?;
    tracing::info!(backend = %a.kind(), score = score_a, "Aggregate CLIP score");

    let score_b = evaluate(images, prompts, b)?;
    tracing::info!(backend = %b.kind(), score = score_b, "Aggregate CLIP score");

    let delta = (score_a - score_b).abs();
    let matched = delta <= tolerance;
    if matched {
        tracing::info!(delta, tolerance, "Backends matched");
    } else {
        tracing::warn!(delta, tolerance, "Backends did not match");
    }

    Ok(matched)
}
