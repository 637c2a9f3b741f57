//! Shared data model: pixel buffers, batch items, options, and results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TextshotError};
use crate::table::TableFormat;

/// An owned RGBA pixel buffer. The only image representation the core works
/// with; decoding from encoded bytes happens once, at ingestion.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA, row-major, `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, validating the length against the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(TextshotError::validation(format!(
                "RGBA buffer length {} does not match {}x{} (expected {})",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Decode an encoded image (PNG, JPEG, WEBP, GIF, BMP) into RGBA.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| TextshotError::ImageProcessing {
            message: format!("Failed to decode image: {}", e),
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            data: rgba.into_raw(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Processing state of one batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

/// One source image travelling through a batch.
///
/// Created on ingestion, then mutated in place by the orchestrator while the
/// batch runs. Items are processed strictly sequentially, so no item is ever
/// touched from two tasks at once.
#[derive(Debug, Clone)]
pub struct ImageItem {
    pub id: Uuid,
    /// Display name, used in failure placeholders (usually the file name).
    pub name: String,
    /// Encoded source bytes as ingested.
    pub bytes: Vec<u8>,
    /// Decoded RGBA source, filled in when processing starts.
    pub preview: Option<PixelBuffer>,
    /// Final extracted text, set once the item is done.
    pub text: Option<String>,
    /// The preprocessed variant that produced the best result, kept so a
    /// caller can show what the engine actually saw. Only set when the
    /// winning attempt ran the pixel pipeline.
    pub preprocessed: Option<PixelBuffer>,
    pub status: ImageStatus,
    pub error: Option<String>,
}

impl ImageItem {
    /// Ingest encoded image bytes. Decoding is deferred to processing time so
    /// a corrupt file fails its own item instead of the whole ingestion.
    pub fn new<S: Into<String>>(name: S, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bytes,
            preview: None,
            text: None,
            preprocessed: None,
            status: ImageStatus::Pending,
            error: None,
        }
    }

    /// Ingest an already-decoded buffer (e.g. a screenshot region).
    pub fn from_buffer<S: Into<String>>(name: S, buffer: PixelBuffer) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bytes: Vec::new(),
            preview: Some(buffer),
            text: None,
            preprocessed: None,
            status: ImageStatus::Pending,
            error: None,
        }
    }
}

/// Caller-facing options for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionOptions {
    /// Engine language pack, e.g. "eng" or "eng+equ".
    pub language: String,
    /// Run the general text-enhancement pipeline on non-MCQ results.
    pub use_enhancement: bool,
    /// Reconstruct tabular layout from the engine's TSV dump when present.
    pub detect_tables: bool,
    pub table_format: TableFormat,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            use_enhancement: true,
            detect_tables: false,
            table_format: TableFormat::Formatted,
        }
    }
}

/// Aggregate metrics for one batch run, recomputed from scratch each run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    pub total_time_seconds: f64,
    /// Mean of each image's best confidence. Failed images contribute their
    /// last-known best, which is the -1.0 sentinel if no attempt succeeded.
    pub average_confidence: f32,
}

/// Per-image outcome snapshot included in the batch summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReport {
    pub id: Uuid,
    pub name: String,
    pub status: ImageStatus,
    pub confidence: f32,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Per-image final texts joined with a blank-line separator.
    pub combined_text: String,
    pub reports: Vec<ImageReport>,
    pub metrics: ProcessingMetrics,
}

/// Progress events streamed while a batch runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    ItemStarted {
        id: Uuid,
        name: String,
        index: usize,
        total: usize,
    },
    ItemFinished {
        id: Uuid,
        status: ImageStatus,
        confidence: f32,
        /// Fraction of the batch completed, `(index + 1) / total`.
        progress: f32,
    },
    BatchFinished {
        metrics: ProcessingMetrics,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_buffer_from_rgba_valid() {
        let buf = PixelBuffer::from_rgba(2, 2, vec![0u8; 16]).unwrap();
        assert_eq!(buf.width, 2);
        assert_eq!(buf.height, 2);
        assert_eq!(buf.data.len(), 16);
    }

    #[test]
    fn test_pixel_buffer_from_rgba_wrong_length() {
        let result = PixelBuffer::from_rgba(2, 2, vec![0u8; 15]);
        assert!(matches!(result.unwrap_err(), TextshotError::Validation { .. }));
    }

    #[test]
    fn test_pixel_buffer_decode_invalid_bytes() {
        let result = PixelBuffer::decode(&[0, 1, 2, 3]);
        assert!(matches!(result.unwrap_err(), TextshotError::ImageProcessing { .. }));
    }

    #[test]
    fn test_pixel_buffer_decode_png() {
        use image::{ImageBuffer, Rgba};

        let img = ImageBuffer::from_pixel(3, 2, Rgba([10u8, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let buf = PixelBuffer::decode(&bytes).unwrap();
        assert_eq!((buf.width, buf.height), (3, 2));
        assert_eq!(&buf.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_image_item_new_is_pending() {
        let item = ImageItem::new("page1.png", vec![1, 2, 3]);
        assert_eq!(item.status, ImageStatus::Pending);
        assert!(item.text.is_none());
        assert!(item.preview.is_none());
        assert!(item.error.is_none());
    }

    #[test]
    fn test_image_item_ids_unique() {
        let a = ImageItem::new("a", vec![]);
        let b = ImageItem::new("b", vec![]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_recognition_options_default() {
        let opts = RecognitionOptions::default();
        assert_eq!(opts.language, "eng");
        assert!(opts.use_enhancement);
        assert!(!opts.detect_tables);
        assert_eq!(opts.table_format, TableFormat::Formatted);
    }
}
