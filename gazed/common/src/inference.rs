use api::{GazeModel, GazePrediction};
use glam::Vec2;
use log::warn;
use once_cell::sync::OnceCell;
use std::sync::Mutex;
use thiserror::Error;

use crate::preprocess::GazeTensor;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("gaze model is not loaded yet")]
    ModelNotReady,
    #[error("another prediction is already in flight")]
    Busy,
    #[error("tensor shape {got:?} does not match model input {expected:?}")]
    ShapeMismatch {
        got: [usize; 4],
        expected: [usize; 4],
    },
    #[error("model backend failed: {0}")]
    BackendFailure(#[source] anyhow::Error),
}

/// Runs the shared gaze model. The model is installed exactly once; until
/// then every call reports `ModelNotReady`. At most one prediction may be in
/// flight at a time: the backing session is not known to be reentrant, so a
/// concurrent caller is rejected with `Busy` instead of ever running twice.
pub struct GazeEstimator {
    model: OnceCell<Box<dyn GazeModel>>,
    in_flight: Mutex<()>,
}

impl GazeEstimator {
    pub fn new() -> Self {
        Self {
            model: OnceCell::new(),
            in_flight: Mutex::new(()),
        }
    }

    /// Install the loaded model. The slot is write-once; a second install
    /// hands the model back to the caller.
    pub fn install_model(&self, model: Box<dyn GazeModel>) -> Result<(), Box<dyn GazeModel>> {
        self.model.set(model)
    }

    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    pub fn predict(&self, tensor: &GazeTensor) -> Result<GazePrediction, InferenceError> {
        let model = self.model.get().ok_or(InferenceError::ModelNotReady)?;
        let _flight = self
            .in_flight
            .try_lock()
            .map_err(|_| InferenceError::Busy)?;

        let expected = model.input_shape();
        if tensor.shape() != expected {
            return Err(InferenceError::ShapeMismatch {
                got: tensor.shape(),
                expected,
            });
        }

        // One retry for transient backend trouble; a shape mismatch above
        // never gets here and is never retried.
        let output = match model.run(tensor.data()) {
            Ok(output) => output,
            Err(first) => {
                warn!("Gaze backend failed, retrying once: {:#}", first);
                model
                    .run(tensor.data())
                    .map_err(InferenceError::BackendFailure)?
            }
        };

        if output.len() < 2 {
            return Err(InferenceError::BackendFailure(anyhow::anyhow!(
                "model produced {} outputs, expected 2",
                output.len()
            )));
        }

        Ok(GazePrediction {
            x: output[0],
            y: output[1],
        })
    }
}

impl Default for GazeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a raw prediction so a pointer of the given size stays fully inside
/// the viewport, whatever the model produced.
pub fn clamp_to_viewport(raw: GazePrediction, viewport: Vec2, pointer_size: f32) -> Vec2 {
    let max_x = (viewport.x - pointer_size).max(0.0);
    let max_y = (viewport.y - pointer_size).max(0.0);
    Vec2::new(raw.x.clamp(0.0, max_x), raw.y.clamp(0.0, max_y))
}
