//! Click-to-polygon detection service.

use ndarray::Array4;
use serde::{Deserialize, Serialize};

use super::classes::default_road_classes;
use super::error::DetectionError;
use super::frame::{CapturedFrame, FrameSource, preprocess};
use super::postprocess::{
    DetectionCandidate, decode_predictions, fallback_candidate, filter_classes,
    non_max_suppression, resolve_click,
};
use super::runtime::{LoadGate, ModelRuntime, ModelStatus};
use crate::geometry::{Point, Size, SurfaceScale};

/// Tunables of the detection pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum objectness and combined score
    pub score_threshold: f32,
    /// Candidates overlapping a kept one at or above this IOU are dropped
    pub iou_threshold: f32,
    /// Nearest-center resolution radius in native pixels (exclusive)
    pub click_radius: f32,
    /// Half side of the fallback square in native pixels
    pub fallback_half_size: f32,
    /// Confidence reported for fallback detections
    pub fallback_confidence: f32,
    /// Classes kept after decoding
    pub road_classes: Vec<String>,
    /// Run one inference on a blank input right after loading
    pub warm_up: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            iou_threshold: 0.5,
            click_radius: 100.0,
            fallback_half_size: 40.0,
            fallback_confidence: 0.5,
            road_classes: default_road_classes(),
            warm_up: true,
        }
    }
}

/// Where a detection came from.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionSource {
    /// Resolved from model output
    Model,
    /// Heuristic square; carries the reason the model path was abandoned
    Fallback(DetectionError),
}

/// A resolved detection in drawing-surface coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartDetection {
    /// Quad outline on the drawing surface
    pub polygon: Vec<Point>,
    pub object_class: String,
    pub confidence: f32,
    pub source: DetectionSource,
}

impl SmartDetection {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, DetectionSource::Fallback(_))
    }
}

/// Runs the full pipeline: capture, remap, load, infer, decode, resolve.
///
/// Safe to share between threads; the model is loaded at most once at a
/// time through the internal gate.
pub struct DetectionService {
    runtime: Box<dyn ModelRuntime>,
    gate: LoadGate,
    config: DetectionConfig,
}

impl std::fmt::Debug for DetectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionService")
            .field("gate", &self.gate)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DetectionService {
    pub fn new(runtime: impl ModelRuntime + 'static, config: DetectionConfig) -> Self {
        Self {
            runtime: Box::new(runtime),
            gate: LoadGate::new(),
            config,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Load the model eagerly.
    pub fn init(&self) -> Result<(), DetectionError> {
        self.ensure_loaded()
    }

    /// Unload the model. A later request loads it again.
    pub fn shutdown(&self) {
        self.runtime.unload();
        self.gate.reset();
        log::info!("Detection service shut down");
    }

    pub fn model_status(&self) -> ModelStatus {
        self.gate.status()
    }

    /// Load the model unless it is loaded or another caller is loading it.
    pub fn ensure_loaded(&self) -> Result<(), DetectionError> {
        self.gate
            .ensure_loaded(|| {
                self.runtime.load()?;
                if self.config.warm_up {
                    let side = self.runtime.input_size() as usize;
                    self.runtime
                        .infer(&Array4::zeros((1, 3, side, side)))
                        .map_err(|e| format!("warm-up inference failed: {e}"))?;
                }
                Ok(())
            })
            .map_err(DetectionError::ModelLoadFailure)
    }

    /// Road candidates in a frame after filtering and NMS, in native pixels.
    pub fn detect_candidates(
        &self,
        frame: &CapturedFrame,
    ) -> Result<Vec<DetectionCandidate>, DetectionError> {
        self.ensure_loaded()?;

        let input_size = self.runtime.input_size();
        let input = preprocess(frame, input_size);
        let output = self
            .runtime
            .infer(&input)
            .map_err(DetectionError::InferenceError)?;

        let decoded = decode_predictions(
            &output,
            input_size,
            frame.size(),
            self.config.score_threshold,
        );
        let filtered = filter_classes(
            decoded,
            &self.config.road_classes,
            self.config.score_threshold,
        );
        let kept = non_max_suppression(filtered, self.config.iou_threshold);
        log::debug!("Detected {} road objects", kept.len());
        Ok(kept)
    }

    /// Detect the object under a surface-space click on the source's frame.
    ///
    /// Fails only when the source cannot hand out a frame. Every other
    /// failure yields a fallback detection.
    pub fn detect_at(
        &self,
        source: &dyn FrameSource,
        click: Point,
        surface: Size,
    ) -> Result<SmartDetection, DetectionError> {
        let frame = source.capture().ok_or_else(|| {
            log::info!("Smart detection skipped: frame capture unavailable");
            DetectionError::FrameCaptureUnavailable
        })?;
        Ok(self.detect_in_frame(&frame, click, surface))
    }

    /// Detect the object under a surface-space click on a captured frame.
    pub fn detect_in_frame(
        &self,
        frame: &CapturedFrame,
        click: Point,
        surface: Size,
    ) -> SmartDetection {
        let scale = SurfaceScale::between(surface, frame.size());
        let native_click = scale.to_frame(click);
        log::debug!(
            "Smart detection at surface ({:.1}, {:.1}) -> frame ({:.1}, {:.1})",
            click.x,
            click.y,
            native_click.x,
            native_click.y
        );

        let resolved = self.detect_candidates(frame).and_then(|candidates| {
            resolve_click(&candidates, native_click, self.config.click_radius).cloned()
        });

        let (candidate, source) = match resolved {
            Ok(candidate) => {
                log::info!(
                    "Found {} with confidence {:.2}",
                    candidate.class,
                    candidate.confidence
                );
                (candidate, DetectionSource::Model)
            }
            Err(reason) => {
                log::warn!("Smart detection falling back: {}", reason);
                let candidate = fallback_candidate(
                    native_click,
                    self.config.fallback_half_size,
                    self.config.fallback_confidence,
                );
                (candidate, DetectionSource::Fallback(reason))
            }
        };

        SmartDetection {
            polygon: scale.polygon_to_surface(&candidate.polygon),
            object_class: candidate.class,
            confidence: candidate.confidence,
            source,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
