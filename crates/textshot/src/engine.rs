//! Recognition engine boundary.
//!
//! The external OCR engine is consumed through [`RecognitionEngine`], a
//! narrow async trait. The engine holds mutable session state (loaded
//! language, active variables), so every method takes `&mut self` and the
//! orchestrator is the only caller for the lifetime of a batch.
//!
//! Implementations live outside the core: the CLI ships a subprocess-based
//! tesseract engine, tests use scripted mocks.

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

use crate::types::PixelBuffer;

/// Errors raised at the engine boundary.
///
/// Only `InitializationFailed` is fatal to a batch; everything else is fatal
/// to a single recognition attempt and the orchestrator moves on.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Engine initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Engine rejected parameters: {0}")]
    ParametersRejected(String),

    #[error("Recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("Engine terminated unexpectedly: {0}")]
    Terminated(String),
}

/// One recognition result from the engine.
#[derive(Debug, Clone, Default)]
pub struct RecognitionOutput {
    pub text: String,
    /// Engine confidence estimate in `[0, 100]`.
    pub confidence: f32,
    /// Tab-separated positional layout dump, when the engine produced one.
    pub tsv: Option<String>,
}

/// Engine parameter map. Insertion order is preserved so parameters are
/// applied in the order the profile declares them.
pub type EngineParameters = IndexMap<String, String>;

/// Narrow contract with the external OCR engine.
#[async_trait]
pub trait RecognitionEngine: Send {
    /// Load a language pack. Called once before recognition and again
    /// whenever the language changes.
    async fn initialize(&mut self, language: &str) -> Result<(), EngineError>;

    /// Apply engine variables, best effort: implementations must skip
    /// unsupported keys rather than fail the whole call where they can
    /// distinguish them.
    async fn set_parameters(&mut self, params: &EngineParameters) -> Result<(), EngineError>;

    /// Recognize text in an RGBA buffer.
    async fn recognize(&mut self, image: &PixelBuffer) -> Result<RecognitionOutput, EngineError>;

    /// Release the engine session. Called exactly once per batch, even after
    /// partial failure.
    async fn terminate(&mut self) -> Result<(), EngineError>;
}
