//! Demo configuration: a TOML file with one table per concern, every key
//! optional.
//!
//! ```toml
//! [simulator]
//! primary_amplitude = 0.8
//!
//! [inference]
//! interval_ms = 150
//! policy      = "demo-guaranteed"   # or "raw-model"
//! model       = "weights.json"      # omit for the built-in weights
//!
//! [animation]
//! easing = 0.15
//!
//! [window]
//! width  = 1100
//! height = 640
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use emg_stream::SimulatorConfig;
use gesture_net::ModelSource;
use serde::{Deserialize, Serialize};

use crate::animator::AnimationConfig;
use crate::error::DemoError;
use crate::inference::DecisionPolicy;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub simulator: SimulatorConfig,
    pub inference: InferenceConfig,
    pub animation: AnimationConfig,
    pub window:    WindowConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Inference tick period.
    pub interval_ms: u64,
    pub policy:      DecisionPolicy,
    /// JSON weights; `None` selects the built-in template network.
    pub model:       Option<PathBuf>,
    /// Seeds both the simulator and the confidence jitter.
    pub seed:        Option<u64>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig {
            interval_ms: 150,
            policy:      DecisionPolicy::default(),
            model:       None,
            seed:        None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width:          usize,
    pub height:         usize,
    /// Minimum time between presented frames.
    pub frame_limit_ms: u64,
    pub resizable:      bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig { width: 1100, height: 640, frame_limit_ms: 16, resizable: true }
    }
}

impl DemoConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DemoError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DemoError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DemoError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, DemoError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.inference.interval_ms.max(1))
    }

    pub fn frame_limit(&self) -> Duration {
        Duration::from_millis(self.window.frame_limit_ms)
    }

    pub fn model_source(&self) -> ModelSource {
        self.inference.model.clone().map(ModelSource::File).unwrap_or_default()
    }
}
