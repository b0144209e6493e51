use anyhow::{Context, Result};
use api::GazeModel;
use common::TENSOR_SHAPE;
use log::info;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Mutex;

/// ONNX-backed gaze regression model. `ort` sessions run through `&mut self`,
/// so the session sits behind its own lock; the estimator's flight guard
/// keeps it uncontended in practice.
pub struct OrtGazeModel {
    session: Mutex<Session>,
}

impl OrtGazeModel {
    pub fn load(model_path: &Path) -> Result<Self> {
        info!("Loading gaze model from {:?}...", model_path);
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load gaze model from {:?}", model_path))?;
        info!("Gaze model loaded");
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl GazeModel for OrtGazeModel {
    fn input_shape(&self) -> [usize; 4] {
        TENSOR_SHAPE
    }

    fn run(&self, input: &[f32]) -> Result<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("gaze session lock poisoned"))?;

        let shape = TENSOR_SHAPE.to_vec();
        let tensor = ort::value::Tensor::from_array((shape, input.to_vec()))?;
        let outputs = session.run(ort::inputs![tensor])?;
        let (_output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        Ok(output_data.to_vec())
    }
}
