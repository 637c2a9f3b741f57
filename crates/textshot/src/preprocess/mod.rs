//! Pixel preprocessing pipeline.
//!
//! One [`PreprocessConfig`] describes one pipeline invocation. Stages run
//! conditionally but always in a fixed order, because later stages operate on
//! the output of earlier ones: scale, grayscale, denoise, contrast, binarize,
//! sharpen. The pipeline is deterministic and holds no shared state, so it is
//! safe to run concurrently on independent buffers.

mod kernels;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::PixelBuffer;

/// Errors from the pixel pipeline. Fatal to a single preprocessing attempt
/// only; the orchestrator skips the attempt and moves to the next config.
#[derive(Debug, Clone, Error)]
pub enum PreprocessError {
    #[error("Cannot preprocess an empty pixel buffer")]
    EmptyBuffer,

    #[error("Pixel buffer length {actual} does not match dimensions (expected {expected})")]
    BufferMismatch { expected: usize, actual: usize },
}

/// One pixel-pipeline invocation, immutable after construction.
///
/// `enabled` is the master switch: a disabled config makes the orchestrator
/// feed the unmodified source to the engine, which is itself a useful variant
/// when the source photo is already clean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub enabled: bool,
    pub grayscale: bool,
    /// Contrast factor, clamped to `[0.5, 2.0]`. 1.0 means no adjustment.
    pub contrast: f32,
    pub binarize: bool,
    /// Global binarization threshold. Ignored when `adaptive_threshold` is set.
    pub threshold: u8,
    /// Resample factor, clamped to `[1.0, 3.0]`.
    pub scale: f32,
    /// Accepted but currently a documented no-op; skew-angle estimation is
    /// tracked separately.
    pub deskew: bool,
    pub denoise: bool,
    pub adaptive_threshold: bool,
    pub sharpen: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            grayscale: false,
            contrast: 1.0,
            binarize: false,
            threshold: 128,
            scale: 1.0,
            deskew: false,
            denoise: false,
            adaptive_threshold: false,
            sharpen: false,
        }
    }
}

impl PreprocessConfig {
    /// Contrast factor with out-of-range values pulled back into `[0.5, 2.0]`.
    pub fn effective_contrast(&self) -> f32 {
        self.contrast.clamp(0.5, 2.0)
    }

    /// Scale factor with out-of-range values pulled back into `[1.0, 3.0]`.
    pub fn effective_scale(&self) -> f32 {
        self.scale.clamp(1.0, 3.0)
    }
}

/// Run the pipeline on `source` per `config`.
///
/// Returns a new buffer sized `round(width * scale) x round(height * scale)`.
/// A disabled config returns the source unchanged.
pub fn apply(source: &PixelBuffer, config: &PreprocessConfig) -> Result<PixelBuffer, PreprocessError> {
    if source.is_empty() {
        return Err(PreprocessError::EmptyBuffer);
    }
    let expected = source.width as usize * source.height as usize * 4;
    if source.data.len() != expected {
        return Err(PreprocessError::BufferMismatch {
            expected,
            actual: source.data.len(),
        });
    }

    if !config.enabled {
        return Ok(source.clone());
    }

    let scale = config.effective_scale();
    let (mut data, width, height) =
        kernels::resample_bilinear(&source.data, source.width, source.height, scale);

    if config.grayscale {
        kernels::grayscale(&mut data);
    }

    if config.denoise {
        data = kernels::median_denoise(&data, width, height);
    }

    let contrast = config.effective_contrast();
    if (contrast - 1.0).abs() > f32::EPSILON {
        kernels::contrast(&mut data, contrast);
    }

    if config.binarize {
        if config.adaptive_threshold {
            kernels::binarize_adaptive(&mut data, width, height);
        } else {
            kernels::binarize_global(&mut data, config.threshold);
        }
    }

    if config.sharpen {
        data = kernels::sharpen(&data, width, height);
    }

    debug!(
        width,
        height,
        scale,
        grayscale = config.grayscale,
        binarize = config.binarize,
        "preprocessing pass complete"
    );

    Ok(PixelBuffer { width, height, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(width: u32, height: u32, rgba: [u8; 4]) -> PixelBuffer {
        PixelBuffer::from_rgba(width, height, rgba.repeat((width * height) as usize)).unwrap()
    }

    #[test]
    fn test_disabled_config_is_identity() {
        let source = buffer(4, 4, [17, 33, 99, 255]);
        let config = PreprocessConfig::default();
        let out = apply(&source, &config).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let source = PixelBuffer::from_rgba(0, 0, Vec::new()).unwrap();
        let err = apply(&source, &PreprocessConfig::default()).unwrap_err();
        assert!(matches!(err, PreprocessError::EmptyBuffer));
    }

    #[test]
    fn test_scale_changes_dimensions() {
        let source = buffer(4, 4, [100, 100, 100, 255]);
        let config = PreprocessConfig {
            enabled: true,
            scale: 2.0,
            ..PreprocessConfig::default()
        };
        let out = apply(&source, &config).unwrap();
        assert_eq!((out.width, out.height), (8, 8));
    }

    #[test]
    fn test_scale_clamped_to_range() {
        let source = buffer(4, 4, [100, 100, 100, 255]);
        let config = PreprocessConfig {
            enabled: true,
            scale: 10.0,
            ..PreprocessConfig::default()
        };
        let out = apply(&source, &config).unwrap();
        assert_eq!((out.width, out.height), (12, 12));
    }

    #[test]
    fn test_grayscale_stage_equalizes_channels() {
        let source = buffer(3, 3, [200, 50, 10, 255]);
        let config = PreprocessConfig {
            enabled: true,
            grayscale: true,
            ..PreprocessConfig::default()
        };
        let out = apply(&source, &config).unwrap();
        for chunk in out.data.chunks_exact(4) {
            assert_eq!(chunk[0], chunk[1]);
            assert_eq!(chunk[1], chunk[2]);
            assert_eq!(chunk[3], 255);
        }
    }

    #[test]
    fn test_binarize_stage_output_is_bilevel() {
        let source = buffer(3, 3, [90, 140, 180, 255]);
        let config = PreprocessConfig {
            enabled: true,
            binarize: true,
            threshold: 128,
            ..PreprocessConfig::default()
        };
        let out = apply(&source, &config).unwrap();
        for chunk in out.data.chunks_exact(4) {
            assert!(chunk[0] == 0 || chunk[0] == 255);
        }
    }

    #[test]
    fn test_full_stack_runs_in_order() {
        // Mixed-color noise through every stage; the end state must be
        // bilevel because binarize precedes only sharpen.
        let mut data = Vec::new();
        for i in 0..64u32 {
            data.extend_from_slice(&[(i * 37 % 256) as u8, (i * 11 % 256) as u8, 64, 255]);
        }
        let source = PixelBuffer::from_rgba(8, 8, data).unwrap();
        let config = PreprocessConfig {
            enabled: true,
            grayscale: true,
            denoise: true,
            contrast: 1.4,
            binarize: true,
            adaptive_threshold: true,
            sharpen: true,
            scale: 1.5,
            ..PreprocessConfig::default()
        };
        let out = apply(&source, &config).unwrap();
        assert_eq!((out.width, out.height), (12, 12));
        // Sharpen on a bilevel image either keeps a value or pushes it
        // further toward its own extreme, so the image stays bilevel.
        for chunk in out.data.chunks_exact(4) {
            assert!(chunk[0] == 0 || chunk[0] == 255);
        }
    }

    #[test]
    fn test_deskew_flag_is_noop() {
        let source = buffer(4, 4, [10, 10, 10, 255]);
        let with = PreprocessConfig {
            enabled: true,
            deskew: true,
            ..PreprocessConfig::default()
        };
        let without = PreprocessConfig {
            enabled: true,
            deskew: false,
            ..PreprocessConfig::default()
        };
        assert_eq!(apply(&source, &with).unwrap(), apply(&source, &without).unwrap());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = PreprocessConfig {
            enabled: true,
            grayscale: true,
            contrast: 1.5,
            scale: 2.0,
            ..PreprocessConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PreprocessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
