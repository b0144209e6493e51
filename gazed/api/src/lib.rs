use anyhow::Result;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Eye center reported by the detector, in camera-frame pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EyeAnchor {
    pub x: f32,
    pub y: f32,
}

/// Raw RGBA8 eye crop as delivered by the detector, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeRegion {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl EyeRegion {
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDetection {
    pub first_eye: Option<EyeAnchor>,
    pub second_eye: Option<EyeAnchor>,
    pub first_eye_data: Option<EyeRegion>,
    pub second_eye_data: Option<EyeRegion>,
}

/// One detector callback's worth of data. Owned transiently by whichever
/// component processes it; only the capture path caches the latest pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub faces: Vec<FaceDetection>,
}

/// Both eye buffers from a single usable detection.
#[derive(Debug, Clone, PartialEq)]
pub struct EyePair {
    pub first: EyeRegion,
    pub second: EyeRegion,
}

impl DetectionEvent {
    /// A detection is usable only when the detector saw exactly one face with
    /// both eyes localized and both pixel buffers attached. Zero or multiple
    /// faces mean no usable detection this frame.
    pub fn is_usable(&self) -> bool {
        if self.faces.len() != 1 {
            return false;
        }
        let face = &self.faces[0];
        face.first_eye.is_some()
            && face.second_eye.is_some()
            && face.first_eye_data.is_some()
            && face.second_eye_data.is_some()
    }

    /// Owned copy of both eye buffers from a usable detection.
    pub fn usable_eyes(&self) -> Option<EyePair> {
        if !self.is_usable() {
            return None;
        }
        let face = &self.faces[0];
        match (&face.first_eye_data, &face.second_eye_data) {
            (Some(first), Some(second)) => Some(EyePair {
                first: first.clone(),
                second: second.clone(),
            }),
            _ => None,
        }
    }
}

/// One of the nine on-screen targets used for labeled capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionTag {
    TopLeft,
    MidLeft,
    BottomLeft,
    TopMid,
    MidMid,
    BottomMid,
    TopRight,
    MidRight,
    BottomRight,
}

impl PositionTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionTag::TopLeft => "top-left",
            PositionTag::MidLeft => "mid-left",
            PositionTag::BottomLeft => "bottom-left",
            PositionTag::TopMid => "top-mid",
            PositionTag::MidMid => "mid-mid",
            PositionTag::BottomMid => "bottom-mid",
            PositionTag::TopRight => "top-right",
            PositionTag::MidRight => "mid-right",
            PositionTag::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for PositionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-left" => Ok(PositionTag::TopLeft),
            "mid-left" => Ok(PositionTag::MidLeft),
            "bottom-left" => Ok(PositionTag::BottomLeft),
            "top-mid" => Ok(PositionTag::TopMid),
            "mid-mid" => Ok(PositionTag::MidMid),
            "bottom-mid" => Ok(PositionTag::BottomMid),
            "top-right" => Ok(PositionTag::TopRight),
            "mid-right" => Ok(PositionTag::MidRight),
            "bottom-right" => Ok(PositionTag::BottomRight),
            _ => Err(()),
        }
    }
}

/// Raw model output, in the model's own coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GazePrediction {
    pub x: f32,
    pub y: f32,
}

/// What the presentation layer reads each update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeFrame {
    pub eyes_present: bool,
    pub raw: GazePrediction,
    pub screen: Vec2,
}

/// A loaded, shared, read-only inference artifact. Installed once at startup
/// and never reloaded; lifetime equals the daemon lifetime.
pub trait GazeModel: Send + Sync {
    fn input_shape(&self) -> [usize; 4];

    /// Run one prediction. The output is a flat vector whose first two
    /// scalars are the raw (x, y) gaze estimate.
    fn run(&self, input: &[f32]) -> Result<Vec<f32>>;
}

/// Best-effort remote persistence for capture artifacts. Local write success
/// is the durability guarantee; upload failures are logged by the caller.
pub trait Uploader: Send + Sync {
    fn upload(&self, local_path: &Path) -> Result<()>;
}
