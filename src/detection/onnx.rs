//! ONNX Runtime backend for YOLOv5-style exports.
//!
//! Expects a single `images` input of shape `[1, 3, S, S]` and an output of
//! shape `[1, N, 85]`.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;

use super::runtime::{DEFAULT_INPUT_SIZE, ModelRuntime};

/// Name of the model input tensor.
const INPUT_NAME: &str = "images";

/// Loads an ONNX model from disk on first use.
pub struct OnnxRuntime {
    model_path: PathBuf,
    input_size: u32,
    intra_threads: usize,
    session: Mutex<Option<Session>>,
}

impl OnnxRuntime {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            input_size: DEFAULT_INPUT_SIZE,
            intra_threads: 4,
            session: Mutex::new(None),
        }
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads;
        self
    }
}

impl ModelRuntime for OnnxRuntime {
    fn load(&self) -> Result<(), String> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.is_some() {
            return Ok(());
        }

        log::info!("Loading ONNX model: {}", self.model_path.display());
        let loaded = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(self.intra_threads))
            .and_then(|b| b.commit_from_file(&self.model_path))
            .map_err(|e| format!("{}: {}", self.model_path.display(), e))?;

        *session = Some(loaded);
        log::info!("✓ ONNX model loaded");
        Ok(())
    }

    fn unload(&self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        *session = None;
    }

    fn infer(&self, input: &Array4<f32>) -> Result<Vec<f32>, String> {
        let mut guard = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let session = guard.as_mut().ok_or("model not loaded")?;

        let data: Vec<f32> = input.iter().copied().collect();
        let input_value = Value::from_array((input.shape(), data.into_boxed_slice()))
            .map_err(|e| e.to_string())?;

        let outputs = session
            .run(ort::inputs![INPUT_NAME => input_value])
            .map_err(|e| e.to_string())?;
        let (_, output) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| e.to_string())?;

        Ok(output.to_vec())
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }
}
