//! Smart detection: click a road object, get a polygon.
//!
//! The pipeline captures the displayed frame, maps the click into frame
//! pixels, runs the object detector, keeps road classes, suppresses
//! overlapping boxes and picks the box under (or nearest to) the click.
//! When any step after capture fails, a fixed-size square around the
//! click is returned instead, so the tool always produces something.
//!
//! Detections are axis-aligned quads stored as polygon annotations; the
//! model only predicts boxes.

mod backend;
mod classes;
mod error;
mod frame;
#[cfg(feature = "onnx")]
mod onnx;
mod postprocess;
mod runtime;
mod service;
#[cfg(not(target_arch = "wasm32"))]
mod worker;

pub use backend::{
    DetectionBackend, DetectionRequest, DetectionResponse, DetectionTicket, InlineDetector,
};
pub use classes::{COCO_CLASSES, NUM_CLASSES, ROAD_CLASSES, class_name, default_road_classes};
pub use error::DetectionError;
pub use frame::{CapturedFrame, FrameSource, StaticFrame, preprocess};
#[cfg(feature = "onnx")]
pub use onnx::OnnxRuntime;
pub use postprocess::{
    DetectionCandidate, FALLBACK_CLASS, RECORD_LEN, decode_predictions, fallback_candidate,
    filter_classes, non_max_suppression, resolve_click,
};
pub use runtime::{
    DEFAULT_INPUT_SIZE, LoadGate, ModelRuntime, ModelStatus, ScriptedRuntime, UnavailableRuntime,
    encode_record,
};
pub use service::{DetectionConfig, DetectionService, DetectionSource, SmartDetection};
#[cfg(not(target_arch = "wasm32"))]
pub use worker::DetectionWorker;
