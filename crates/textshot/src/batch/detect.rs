//! Lightweight MCQ detection.
//!
//! One cheap recognition pass over a fixed preprocessing variant, then three
//! pattern tests on the result. Detection is advisory: any failure along the
//! way yields `false` and the image is treated as ordinary text.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::engine::RecognitionEngine;
use crate::preprocess::{self, PreprocessConfig};
use crate::types::PixelBuffer;

static OPTION_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-D][.)]\s").expect("option marker pattern should compile"));
static NUMBERED_QUESTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+[.)]\s").expect("numbered question pattern should compile"));
static QUESTION_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:what|find|calculate|which|where|when|how)\b")
        .expect("question word pattern should compile")
});

/// The single preprocessing variant used for detection: enough cleanup to
/// make markers legible without the cost of a full best-of-N sweep.
fn detection_config() -> PreprocessConfig {
    PreprocessConfig {
        enabled: true,
        grayscale: true,
        contrast: 1.3,
        scale: 1.5,
        deskew: true,
        denoise: true,
        sharpen: true,
        ..PreprocessConfig::default()
    }
}

/// Pattern test behind the detector: option markers are required, plus
/// either numbered questions or interrogative vocabulary.
pub fn is_mcq_text(text: &str) -> bool {
    let has_options = OPTION_MARKER_RE.is_match(text);
    if !has_options {
        return false;
    }
    NUMBERED_QUESTION_RE.is_match(text) || QUESTION_WORD_RE.is_match(text)
}

/// Classify an image as MCQ-like with a single detection pass on the shared
/// engine session. Fails open to `false`.
pub(crate) async fn looks_like_mcq(engine: &mut dyn RecognitionEngine, image: &PixelBuffer) -> bool {
    let prepared = match preprocess::apply(image, &detection_config()) {
        Ok(buffer) => buffer,
        Err(err) => {
            debug!(error = %err, "MCQ detection preprocessing failed");
            return false;
        }
    };

    match engine.recognize(&prepared).await {
        Ok(output) => is_mcq_text(&output.text),
        Err(err) => {
            debug!(error = %err, "MCQ detection recognition failed");
            false
        }
    }
}
