//! Error types for textshot.
//!
//! Three layers, matching the failure sites of the pipeline:
//!
//! - [`PreprocessError`](crate::preprocess::PreprocessError) - a pixel stage
//!   rejected its input; fatal to that one preprocessing attempt only.
//! - [`EngineError`](crate::engine::EngineError) - a recognition-engine call
//!   failed; also fatal to a single attempt, except initialization failures
//!   which abort the batch.
//! - [`TextshotError`] - the crate-level aggregate. IO errors bubble up
//!   unchanged so real system problems stay visible.
use thiserror::Error;

/// Result type alias using `TextshotError`.
pub type Result<T> = std::result::Result<T, TextshotError>;

/// Main error type for all textshot operations.
#[derive(Debug, Error)]
pub enum TextshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Preprocess(#[from] crate::preprocess::PreprocessError),

    #[error(transparent)]
    Engine(#[from] crate::engine::EngineError),

    /// Aggregate failure for one image after every attempt failed. The batch
    /// continues; this variant only surfaces through per-image reports.
    #[error("Image processing error: {message}")]
    ImageProcessing { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl TextshotError {
    /// Create an ImageProcessing error.
    pub fn image_processing<S: Into<String>>(message: S) -> Self {
        Self::ImageProcessing {
            message: message.into(),
        }
    }

    /// Create a Validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = TextshotError::validation("unknown profile 'turbo'");
        assert_eq!(err.to_string(), "Validation error: unknown profile 'turbo'");
    }

    #[test]
    fn test_image_processing_error_display() {
        let err = TextshotError::image_processing("all attempts failed");
        assert_eq!(err.to_string(), "Image processing error: all attempts failed");
    }

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<Vec<u8>> {
            let bytes = std::fs::read("/nonexistent/page.png")?;
            Ok(bytes)
        }

        let result = read_file();
        assert!(matches!(result.unwrap_err(), TextshotError::Io(_)));
    }

    #[test]
    fn test_engine_error_converts() {
        let err: TextshotError = crate::engine::EngineError::RecognitionFailed("boom".into()).into();
        assert!(matches!(err, TextshotError::Engine(_)));
        assert!(err.to_string().contains("boom"));
    }
}
