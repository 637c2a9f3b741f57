//! Tesseract subprocess engine.
//!
//! Drives the system `tesseract` binary through temp files: each recognize
//! call writes the RGBA buffer to a temporary PNG and runs the binary twice,
//! once for plain text and once for the TSV layout dump, from which the mean
//! word confidence is computed.
//!
//! Engine variables are applied best effort. Keys the binary does not accept
//! trigger one retry with only the page-segmentation mode, mirroring how the
//! in-browser engine silently ignores unknown variables.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use textshot::{EngineError, EngineParameters, PixelBuffer, RecognitionEngine, RecognitionOutput};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

const TESSERACT_TIMEOUT_SECONDS: u64 = 120;

pub struct TesseractEngine {
    binary: String,
    language: String,
    params: EngineParameters,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: "eng".to_string(),
            params: EngineParameters::new(),
        }
    }

    /// Arguments derived from the active profile parameters.
    /// `tessedit_pageseg_mode` maps to `--psm`; `tessjs_*` keys drive the
    /// in-browser engine builds and are skipped; everything else becomes a
    /// `-c key=value` pair.
    fn engine_args(&self) -> Vec<String> {
        let mut args = vec!["-l".to_string(), self.language.clone()];
        for (key, value) in &self.params {
            if key == "tessedit_pageseg_mode" {
                args.push("--psm".to_string());
                args.push(value.clone());
            } else if key.starts_with("tessjs_") {
                continue;
            } else {
                args.push("-c".to_string());
                args.push(format!("{}={}", key, value));
            }
        }
        args
    }

    /// Fallback arguments: language and page segmentation only.
    fn minimal_args(&self) -> Vec<String> {
        let mut args = vec!["-l".to_string(), self.language.clone()];
        if let Some(psm) = self.params.get("tessedit_pageseg_mode") {
            args.push("--psm".to_string());
            args.push(psm.clone());
        }
        args
    }

    async fn run(
        &self,
        input: &Path,
        args: &[String],
        extra: &[&str],
    ) -> Result<std::process::Output, EngineError> {
        let child = Command::new(&self.binary)
            .arg(input)
            .arg("stdout")
            .args(args)
            .args(extra)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EngineError::RecognitionFailed(format!("failed to spawn {}: {}", self.binary, e))
            })?;

        match timeout(
            Duration::from_secs(TESSERACT_TIMEOUT_SECONDS),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(EngineError::RecognitionFailed(format!(
                "failed to wait for {}: {}",
                self.binary, e
            ))),
            Err(_) => Err(EngineError::RecognitionFailed(format!(
                "recognition timed out after {} seconds",
                TESSERACT_TIMEOUT_SECONDS
            ))),
        }
    }

    /// Run with the full parameter set, falling back to the minimal argument
    /// list when the binary rejects a variable.
    async fn run_with_fallback(&self, input: &Path, extra: &[&str]) -> Result<String, EngineError> {
        let output = self.run(input, &self.engine_args(), extra).await?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let lowered = stderr.to_lowercase();
        if lowered.contains("variable") || lowered.contains("parameter") {
            warn!(stderr = %stderr.trim(), "engine rejected variables, retrying without them");
            let output = self.run(input, &self.minimal_args(), extra).await?;
            if output.status.success() {
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }
            return Err(EngineError::RecognitionFailed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        Err(EngineError::RecognitionFailed(stderr))
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn initialize(&mut self, language: &str) -> Result<(), EngineError> {
        let output = Command::new(&self.binary)
            .arg("--list-langs")
            .output()
            .await
            .map_err(|e| {
                EngineError::InitializationFailed(format!(
                    "failed to run {}: {}",
                    self.binary, e
                ))
            })?;
        if !output.status.success() {
            return Err(EngineError::InitializationFailed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        // Depending on the version the listing goes to stdout or stderr.
        let listing = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        for requested in language.split('+') {
            if !listing.lines().any(|line| line.trim() == requested) {
                return Err(EngineError::InitializationFailed(format!(
                    "language pack '{}' is not installed",
                    requested
                )));
            }
        }

        self.language = language.to_string();
        Ok(())
    }

    async fn set_parameters(&mut self, params: &EngineParameters) -> Result<(), EngineError> {
        self.params = params.clone();
        Ok(())
    }

    async fn recognize(&mut self, image: &PixelBuffer) -> Result<RecognitionOutput, EngineError> {
        let temp = write_temp_png(image)?;
        let text = self.run_with_fallback(temp.path(), &[]).await?;
        let tsv = self.run_with_fallback(temp.path(), &["tsv"]).await?;
        let confidence = mean_word_confidence(&tsv);
        debug!(confidence, chars = text.len(), "recognition pass complete");

        let wants_tsv = self
            .params
            .get("tessjs_create_tsv")
            .is_some_and(|v| v == "1");
        Ok(RecognitionOutput {
            text,
            confidence,
            tsv: wants_tsv.then_some(tsv),
        })
    }

    async fn terminate(&mut self) -> Result<(), EngineError> {
        self.params.clear();
        Ok(())
    }
}

fn write_temp_png(image: &PixelBuffer) -> Result<NamedTempFile, EngineError> {
    let file = tempfile::Builder::new()
        .prefix("textshot-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| {
            EngineError::RecognitionFailed(format!("failed to create temp image: {}", e))
        })?;

    let rgba = image::RgbaImage::from_raw(image.width, image.height, image.data.clone())
        .ok_or_else(|| {
            EngineError::RecognitionFailed("pixel buffer does not match its dimensions".to_string())
        })?;
    rgba.save_with_format(file.path(), image::ImageFormat::Png)
        .map_err(|e| {
            EngineError::RecognitionFailed(format!("failed to encode temp image: {}", e))
        })?;

    Ok(file)
}

/// Mean confidence over word rows (level 5) of a TSV dump. Rows with the
/// -1 placeholder confidence are skipped.
fn mean_word_confidence(tsv: &str) -> f32 {
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for line in tsv.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }
        if let Ok(conf) = fields[10].parse::<f32>() {
            if conf >= 0.0 {
                sum += conf;
                count += 1;
            }
        }
    }
    if count == 0 { 0.0 } else { sum / count as f32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_args_psm_and_variables() {
        let mut engine = TesseractEngine::new();
        engine.params.insert("tessedit_pageseg_mode".into(), "6".into());
        engine.params.insert("tessjs_create_tsv".into(), "1".into());
        engine.params.insert("preserve_interword_spaces".into(), "1".into());

        let args = engine.engine_args();
        assert_eq!(
            args,
            [
                "-l",
                "eng",
                "--psm",
                "6",
                "-c",
                "preserve_interword_spaces=1"
            ]
        );
    }

    #[test]
    fn test_minimal_args_keep_psm_only() {
        let mut engine = TesseractEngine::new();
        engine.params.insert("tessedit_pageseg_mode".into(), "3".into());
        engine.params.insert("textord_heavy_nr".into(), "1".into());

        assert_eq!(engine.minimal_args(), ["-l", "eng", "--psm", "3"]);
    }

    #[test]
    fn test_mean_word_confidence() {
        let tsv = "1\t1\t0\t0\t0\t0\t0\t0\t100\t30\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t0\t0\t40\t12\t90\tHello\n\
                   5\t1\t1\t1\t1\t2\t50\t0\t40\t12\t70\tworld\n";
        assert_eq!(mean_word_confidence(tsv), 80.0);
    }

    #[test]
    fn test_mean_word_confidence_empty_dump() {
        assert_eq!(mean_word_confidence(""), 0.0);
        assert_eq!(mean_word_confidence("1\t1\t0\t0\t0\t0\t0\t0\t1\t1\t-1\t\n"), 0.0);
    }

    #[test]
    fn test_write_temp_png_roundtrip() {
        let buffer = PixelBuffer::from_rgba(2, 2, vec![128u8; 16]).unwrap();
        let file = write_temp_png(&buffer).unwrap();
        let decoded = image::open(file.path()).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.into_raw(), buffer.data);
    }
}
