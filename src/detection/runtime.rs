//! Model runtimes and single-flight loading.
//!
//! A `ModelRuntime` wraps whatever actually runs the detector. The service
//! never calls `load` directly; it goes through a `LoadGate` so concurrent
//! callers share one in-flight load and see its outcome.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ndarray::Array4;

use super::classes::COCO_CLASSES;
use super::postprocess::RECORD_LEN;
use crate::geometry::BoundingBox;

/// Default square input size of the model.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Something that can load and run the object detector.
pub trait ModelRuntime: Send + Sync {
    /// Load the model. Must be idempotent.
    fn load(&self) -> Result<(), String>;

    /// Release the model. The next `load` starts over.
    fn unload(&self) {}

    /// Run the model on an NCHW `[1, 3, S, S]` input.
    ///
    /// Returns flat records of `RECORD_LEN` floats each.
    fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>, String>;

    /// Side length `S` of the square input.
    fn input_size(&self) -> u32 {
        DEFAULT_INPUT_SIZE
    }
}

/// Load state reported to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// Never loaded, or shut down
    Unloaded,
    /// A load is in flight
    Loading,
    /// Loaded and ready for inference
    Ready,
    /// The last load failed; the next request retries
    Failed(String),
}

impl ModelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Ready)
    }
}

// ============================================================================
// Single-flight load gate
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Idle,
    Loading,
    Ready,
}

#[derive(Debug)]
struct GateState {
    phase: LoadPhase,
    /// Incremented every time a load starts
    flight: u64,
    /// Flight number and message of the most recent failure
    last_failure: Option<(u64, String)>,
}

/// Mutex + condvar gate that runs at most one load at a time.
#[derive(Debug)]
pub struct LoadGate {
    state: Mutex<GateState>,
    done: Condvar,
}

impl Default for LoadGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                phase: LoadPhase::Idle,
                flight: 0,
                last_failure: None,
            }),
            done: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `load` unless a load already succeeded or is in flight.
    ///
    /// Callers arriving during a flight block until it finishes and get its
    /// result. A failed flight leaves the gate idle so the next call retries.
    pub fn ensure_loaded<F>(&self, load: F) -> Result<(), String>
    where
        F: FnOnce() -> Result<(), String>,
    {
        let mut state = self.lock();
        loop {
            match state.phase {
                LoadPhase::Ready => return Ok(()),
                LoadPhase::Idle => break,
                LoadPhase::Loading => {
                    let flight = state.flight;
                    log::debug!("Model load #{} in flight, waiting", flight);
                    while state.phase == LoadPhase::Loading && state.flight == flight {
                        state = self
                            .done
                            .wait(state)
                            .unwrap_or_else(PoisonError::into_inner);
                    }
                    if let Some((failed, message)) = &state.last_failure {
                        if *failed == flight {
                            return Err(message.clone());
                        }
                    }
                }
            }
        }

        state.phase = LoadPhase::Loading;
        state.flight += 1;
        let flight = state.flight;
        drop(state);

        log::info!("Loading detection model (attempt #{})", flight);
        let result = load();

        let mut state = self.lock();
        match &result {
            Ok(()) => {
                state.phase = LoadPhase::Ready;
                state.last_failure = None;
                log::info!("Detection model ready");
            }
            Err(message) => {
                state.phase = LoadPhase::Idle;
                state.last_failure = Some((flight, message.clone()));
                log::warn!("Detection model load failed: {}", message);
            }
        }
        drop(state);
        self.done.notify_all();

        result
    }

    /// Forget a completed load so the next call loads again.
    pub fn reset(&self) {
        let mut state = self.lock();
        if state.phase == LoadPhase::Ready {
            state.phase = LoadPhase::Idle;
        }
        state.last_failure = None;
    }

    pub fn status(&self) -> ModelStatus {
        let state = self.lock();
        match (state.phase, &state.last_failure) {
            (LoadPhase::Ready, _) => ModelStatus::Ready,
            (LoadPhase::Loading, _) => ModelStatus::Loading,
            (LoadPhase::Idle, Some((_, message))) => ModelStatus::Failed(message.clone()),
            (LoadPhase::Idle, None) => ModelStatus::Unloaded,
        }
    }
}

// ============================================================================
// Built-in runtimes
// ============================================================================

/// A runtime that never loads. Every detection uses the fallback square.
#[derive(Debug, Clone)]
pub struct UnavailableRuntime {
    reason: String,
}

impl UnavailableRuntime {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnavailableRuntime {
    fn default() -> Self {
        Self::new("no detection model configured")
    }
}

impl ModelRuntime for UnavailableRuntime {
    fn load(&self) -> Result<(), String> {
        Err(self.reason.clone())
    }

    fn infer(&self, _input: &Array4<f32>) -> Result<Vec<f32>, String> {
        Err(self.reason.clone())
    }
}

/// A runtime that replays canned output.
///
/// Used for headless replays and tests. Loads can be delayed or made to
/// fail a number of times; every call to `load` is counted.
#[derive(Debug, Default)]
pub struct ScriptedRuntime {
    output: Vec<f32>,
    input_size: Option<u32>,
    load_delay: Duration,
    failing_loads: AtomicUsize,
    inference_error: Option<String>,
    loads: AtomicUsize,
    inferences: AtomicUsize,
    loaded: AtomicBool,
}

impl ScriptedRuntime {
    /// Runtime whose every inference returns `output`.
    pub fn new(output: Vec<f32>) -> Self {
        Self {
            output,
            ..Default::default()
        }
    }

    /// Runtime returning one record per `(bbox, class name, score)`.
    ///
    /// Boxes are in input-grid units. Each record carries objectness 1 and
    /// `score` for its class. Unknown class names are skipped.
    pub fn with_boxes(boxes: &[(BoundingBox, &str, f32)]) -> Self {
        let mut output = Vec::with_capacity(boxes.len() * RECORD_LEN);
        for (bbox, class, score) in boxes {
            match COCO_CLASSES.iter().position(|c| c == class) {
                Some(class_id) => output.extend(encode_record(bbox, class_id, *score)),
                None => log::warn!("Unknown class '{}' in scripted output", class),
            }
        }
        Self::new(output)
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = Some(input_size);
        self
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Fail the first `count` loads.
    pub fn failing_loads(self, count: usize) -> Self {
        self.failing_loads.store(count, Ordering::SeqCst);
        self
    }

    /// Fail every inference with `message`.
    pub fn failing_inference(mut self, message: impl Into<String>) -> Self {
        self.inference_error = Some(message.into());
        self
    }

    /// Number of times `load` was called.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of times `infer` was called.
    pub fn inference_count(&self) -> usize {
        self.inferences.load(Ordering::SeqCst)
    }
}

impl ModelRuntime for ScriptedRuntime {
    fn load(&self) -> Result<(), String> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.load_delay.is_zero() {
            std::thread::sleep(self.load_delay);
        }

        let remaining = self.failing_loads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_loads.store(remaining - 1, Ordering::SeqCst);
            return Err(format!("scripted load failure (attempt {attempt})"));
        }

        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn unload(&self) {
        self.loaded.store(false, Ordering::SeqCst);
    }

    fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>, String> {
        self.inferences.fetch_add(1, Ordering::SeqCst);
        if !self.loaded.load(Ordering::SeqCst) {
            return Err("model not loaded".to_string());
        }
        if let Some(message) = &self.inference_error {
            return Err(message.clone());
        }

        let side = self.input_size() as usize;
        if input.shape() != [1, 3, side, side] {
            return Err(format!("unexpected input shape {:?}", input.shape()));
        }
        Ok(self.output.clone())
    }

    fn input_size(&self) -> u32 {
        self.input_size.unwrap_or(DEFAULT_INPUT_SIZE)
    }
}

/// Encode one output record for a box in input-grid units.
pub fn encode_record(bbox: &BoundingBox, class_id: usize, score: f32) -> [f32; RECORD_LEN] {
    let mut record = [0.0; RECORD_LEN];
    let center = bbox.center();
    record[0] = center.x;
    record[1] = center.y;
    record[2] = bbox.width;
    record[3] = bbox.height;
    record[4] = 1.0;
    if let Some(slot) = record.get_mut(5 + class_id) {
        *slot = score;
    }
    record
}

// ============================================================================
// Tests
// ============================================================================
