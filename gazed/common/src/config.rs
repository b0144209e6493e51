use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub validity: ValidityConfig,
    pub inference: InferenceConfig,
    pub viewport: ViewportConfig,
    pub capture: CaptureConfig,
    pub output: OutputConfig,
    pub control: ControlConfig,
    pub max_fps: Option<f32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            validity: ValidityConfig::default(),
            inference: InferenceConfig::default(),
            viewport: ViewportConfig::default(),
            capture: CaptureConfig::default(),
            output: OutputConfig::default(),
            control: ControlConfig::default(),
            max_fps: Some(60.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub listen_port: u16,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self { listen_port: 9400 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidityConfig {
    pub invalidation_timeout_ms: u64,
    pub check_period_ms: u64,
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            invalidation_timeout_ms: 2000,
            check_period_ms: 2000,
        }
    }
}

impl ValidityConfig {
    pub fn invalidation_timeout(&self) -> Duration {
        Duration::from_millis(self.invalidation_timeout_ms)
    }

    pub fn check_period(&self) -> Duration {
        Duration::from_millis(self.check_period_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub model_path: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_path: "gaze_model.onnx".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
    pub pointer_size: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1440.0,
            height: 900.0,
            pointer_size: 40.0,
        }
    }
}

impl ViewportConfig {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub owner_tag: String,
    pub storage_dir: String,
    pub upload_url: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            owner_tag: "gazed".to_string(),
            storage_dir: "captures".to_string(),
            upload_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub send_address: String,
    pub send_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            send_address: "127.0.0.1".to_string(),
            send_port: 9401,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// 0 lets the OS pick; the chosen port is advertised over mDNS.
    pub port: u16,
    pub mdns: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            port: 0,
            mdns: true,
        }
    }
}
