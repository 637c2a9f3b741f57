//! Batch orchestration.
//!
//! [`BatchContext`] owns the single engine session and drives images through
//! it strictly sequentially: the engine's internal state (loaded language,
//! active parameters) is mutated between images and between the primary and
//! MCQ passes, so there is never more than one recognition in flight.
//!
//! Per image the orchestrator runs every preprocessing variant of the active
//! profile, keeps the highest-confidence result, optionally re-runs with the
//! MCQ profile's parameters when the detector fires, then repairs the text.
//! One image failing never aborts the batch; its slot in the combined output
//! is a placeholder line.

mod detect;

pub use detect::is_mcq_text;

use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::RecognitionEngine;
use crate::error::{Result, TextshotError};
use crate::preprocess::{self, PreprocessConfig};
use crate::profiles::{self, Profile};
use crate::repair;
use crate::table;
use crate::types::{
    BatchEvent, BatchSummary, ImageItem, ImageReport, ImageStatus, PixelBuffer, ProcessingMetrics,
    RecognitionOptions,
};

/// Best attempt seen so far for one image. Starts at the -1.0 sentinel so
/// the first successful attempt always wins; comparison stays strict
/// greater-than, so later ties never displace an earlier winner.
struct BestResult {
    text: String,
    confidence: f32,
    /// The winning preprocessed buffer, only present when the winning
    /// attempt actually ran the pixel pipeline.
    preprocessed: Option<PixelBuffer>,
}

impl BestResult {
    fn new() -> Self {
        Self {
            text: String::new(),
            confidence: -1.0,
            preprocessed: None,
        }
    }
}

/// Owns the engine session and the batch loop state.
pub struct BatchContext {
    engine: Box<dyn RecognitionEngine>,
}

impl BatchContext {
    pub fn new(engine: Box<dyn RecognitionEngine>) -> Self {
        Self { engine }
    }

    /// Process `images` in order with the named profile.
    ///
    /// Engine initialization failure aborts the whole batch; every other
    /// failure is contained to the image it occurred on. The engine session
    /// is terminated before this returns.
    pub async fn process(
        &mut self,
        images: &mut [ImageItem],
        profile_name: &str,
        options: &RecognitionOptions,
        events: Option<&mpsc::UnboundedSender<BatchEvent>>,
    ) -> Result<BatchSummary> {
        let profile = profiles::get_profile(profile_name)?;
        let mcq_profile = profiles::get_profile("mcq")?;

        self.engine.initialize(&options.language).await?;
        if let Err(err) = self.engine.set_parameters(&profile.engine_params).await {
            warn!(error = %err, profile = profile.name, "some engine parameters were not accepted");
        }

        let start = Instant::now();
        let total = images.len();
        let mut segments: Vec<String> = Vec::with_capacity(total);
        let mut confidences: Vec<f32> = Vec::with_capacity(total);

        for (index, item) in images.iter_mut().enumerate() {
            emit(
                events,
                BatchEvent::ItemStarted {
                    id: item.id,
                    name: item.name.clone(),
                    index,
                    total,
                },
            );
            item.status = ImageStatus::Processing;
            item.error = None;

            let confidence = match self.process_image(item, profile, mcq_profile, options).await {
                Ok((text, confidence)) => {
                    item.text = Some(text.clone());
                    item.status = ImageStatus::Done;
                    segments.push(text);
                    confidence
                }
                Err(err) => {
                    warn!(error = %err, image = %item.name, "image failed, continuing batch");
                    item.status = ImageStatus::Failed;
                    item.error = Some("Failed to extract text".to_string());
                    segments.push(format!("[Failed to extract text from {}]", item.name));
                    -1.0
                }
            };
            confidences.push(confidence);

            emit(
                events,
                BatchEvent::ItemFinished {
                    id: item.id,
                    status: item.status,
                    confidence,
                    progress: (index + 1) as f32 / total as f32,
                },
            );
        }

        if let Err(err) = self.engine.terminate().await {
            warn!(error = %err, "engine termination reported an error");
        }

        let metrics = ProcessingMetrics {
            total_time_seconds: start.elapsed().as_secs_f64(),
            average_confidence: if confidences.is_empty() {
                0.0
            } else {
                confidences.iter().sum::<f32>() / confidences.len() as f32
            },
        };
        emit(events, BatchEvent::BatchFinished { metrics });

        let reports = images
            .iter()
            .zip(segments.iter().zip(&confidences))
            .map(|(item, (text, &confidence))| ImageReport {
                id: item.id,
                name: item.name.clone(),
                status: item.status,
                confidence,
                text: text.clone(),
                error: item.error.clone(),
            })
            .collect();

        Ok(BatchSummary {
            combined_text: segments.join("\n\n"),
            reports,
            metrics,
        })
    }

    /// Run one image through the best-of-N loop, the MCQ sub-pass, and text
    /// repair. Errors here mean no attempt produced anything usable.
    async fn process_image(
        &mut self,
        item: &mut ImageItem,
        profile: &Profile,
        mcq_profile: &Profile,
        options: &RecognitionOptions,
    ) -> Result<(String, f32)> {
        let source = match item.preview.clone() {
            Some(buffer) => buffer,
            None => {
                let decoded = PixelBuffer::decode(&item.bytes)?;
                item.preview = Some(decoded.clone());
                decoded
            }
        };

        let mut best = BestResult::new();
        self.run_attempts(&source, &profile.configs, options, &mut best)
            .await;

        let is_mcq = profile.name == mcq_profile.name
            || detect::looks_like_mcq(self.engine.as_mut(), &source).await;

        if is_mcq && profile.name != mcq_profile.name {
            debug!(image = %item.name, "MCQ layout detected, running specialized pass");
            match self.engine.set_parameters(&mcq_profile.engine_params).await {
                Ok(()) => {
                    self.run_attempts(&source, &mcq_profile.configs, options, &mut best)
                        .await;
                }
                Err(err) => {
                    warn!(error = %err, "MCQ engine parameters were not accepted, keeping primary result");
                }
            }
            // Restore the active profile for the images that follow.
            if let Err(err) = self.engine.set_parameters(&profile.engine_params).await {
                warn!(error = %err, profile = profile.name, "failed to restore engine parameters");
            }
        }

        if best.confidence < 0.0 {
            return Err(TextshotError::image_processing(format!(
                "every recognition attempt failed for '{}'",
                item.name
            )));
        }

        item.preprocessed = best.preprocessed.take();

        let text = if is_mcq {
            repair::mcq::repair(&best.text)
        } else if options.use_enhancement {
            repair::enhance(&best.text, options)
        } else {
            best.text
        };

        Ok((text, best.confidence))
    }

    /// One best-of-N sweep: preprocess per config, recognize, keep the
    /// strictly better result. Attempt-level failures are logged and
    /// skipped.
    async fn run_attempts(
        &mut self,
        source: &PixelBuffer,
        configs: &[PreprocessConfig],
        options: &RecognitionOptions,
        best: &mut BestResult,
    ) {
        for config in configs {
            let prepared = if config.enabled {
                match preprocess::apply(source, config) {
                    Ok(buffer) => Some(buffer),
                    Err(err) => {
                        warn!(error = %err, "preprocessing attempt failed, skipping variant");
                        continue;
                    }
                }
            } else {
                None
            };

            let input = prepared.as_ref().unwrap_or(source);
            match self.engine.recognize(input).await {
                Ok(output) => {
                    if output.confidence > best.confidence {
                        best.confidence = output.confidence;
                        best.text = output.text;
                        best.preprocessed = prepared;

                        if options.detect_tables {
                            if let Some(tsv) = &output.tsv {
                                if let Some(rendered) =
                                    table::from_delimited(tsv, options.table_format)
                                {
                                    if !rendered.trim().is_empty() {
                                        best.text = rendered;
                                    }
                                }
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "recognition attempt failed, skipping variant");
                }
            }
        }
    }
}

fn emit(events: Option<&mpsc::UnboundedSender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching progress.
        let _ = tx.send(event);
    }
}

/// Spawn a batch on the runtime and stream progress events.
///
/// Returns the event receiver and the join handle for the final summary.
pub fn start_batch(
    engine: Box<dyn RecognitionEngine>,
    mut images: Vec<ImageItem>,
    profile_name: impl Into<String>,
    options: RecognitionOptions,
) -> (
    mpsc::UnboundedReceiver<BatchEvent>,
    tokio::task::JoinHandle<Result<BatchSummary>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let profile_name = profile_name.into();
    let handle = tokio::spawn(async move {
        let mut context = BatchContext::new(engine);
        context
            .process(&mut images, &profile_name, &options, Some(&tx))
            .await
    });
    (rx, handle)
}
