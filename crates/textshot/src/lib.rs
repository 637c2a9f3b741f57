//! Textshot - Batch OCR Refinement Library
//!
//! Textshot turns batches of photographed or scanned pages into cleaned-up
//! text. Each image is recognized several times under different pixel
//! preprocessing variants and the highest-confidence result wins; question
//! sheets get a specialized second pass and structural repair; tabular
//! output is reconstructed from the engine's positional layout dump.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use textshot::{BatchContext, ImageItem, RecognitionOptions};
//!
//! # async fn run(engine: Box<dyn textshot::RecognitionEngine>) -> textshot::Result<()> {
//! let mut images = vec![ImageItem::new("page1.png", std::fs::read("page1.png")?)];
//! let mut context = BatchContext::new(engine);
//! let summary = context
//!     .process(&mut images, "balanced", &RecognitionOptions::default(), None)
//!     .await?;
//! println!("{}", summary.combined_text);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Batch** (`batch`): sequential orchestration, best-of-N selection, MCQ
//!   detection and sub-pass, progress events
//! - **Preprocess** (`preprocess`): the pixel pipeline (scale, grayscale,
//!   denoise, contrast, binarize, sharpen)
//! - **Profiles** (`profiles`): named engine-parameter and variant bundles
//! - **Repair** (`repair`): total text transforms for MCQ sheets, math
//!   notation, and general cleanup
//! - **Table** (`table`): layout reconstruction from TSV or aligned text
//!
//! The recognition engine itself stays behind the [`RecognitionEngine`]
//! trait; this crate never talks to an OCR binary directly.

#![deny(unsafe_code)]

pub mod batch;
pub mod engine;
pub mod error;
pub mod preprocess;
pub mod profiles;
pub mod repair;
pub mod table;
pub mod types;

pub use batch::{start_batch, BatchContext};
pub use engine::{EngineError, EngineParameters, RecognitionEngine, RecognitionOutput};
pub use error::{Result, TextshotError};
pub use preprocess::{PreprocessConfig, PreprocessError};
pub use profiles::{get_profile, list_profiles, Profile, ProfileInfo};
pub use table::TableFormat;
pub use types::{
    BatchEvent, BatchSummary, ImageItem, ImageReport, ImageStatus, PixelBuffer, ProcessingMetrics,
    RecognitionOptions,
};
