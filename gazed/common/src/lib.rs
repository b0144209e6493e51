pub use api::{
    DetectionEvent, EyePair, EyeRegion, FaceDetection, GazeFrame, GazeModel, GazePrediction,
    PositionTag, Uploader,
};

mod capture;
pub mod config;
mod inference;
mod preprocess;
mod validity;

pub use capture::{capture_file_name, CaptureOutcome, CaptureRecord, CaptureSession};
pub use inference::{clamp_to_viewport, GazeEstimator, InferenceError};
pub use preprocess::{preprocess, GazeTensor, PreprocessError, EYE_PATCH, TENSOR_SHAPE};
pub use validity::{TimeoutTask, ValidityTracker};

/// Outbound seam for publishing gaze frames to whatever renders the pointer.
pub trait OutputAdapter: Send + Sync {
    fn initialize(&mut self) -> anyhow::Result<()>;
    fn send(&self, frame: &GazeFrame) -> anyhow::Result<()>;
}
