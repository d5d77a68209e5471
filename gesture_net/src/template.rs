//! Nearest-template gesture network.
//!
//! The weights are one centroid per gesture class in feature space, a weight
//! per feature and a softmax temperature.  Scores are
//! `softmax(-Σ wₖ (xₖ - cₖ)² / T)`, so they always sum to one.
//!
//! Weight files are plain JSON:
//!
//! ```json
//! {
//!   "name": "emg-template-v1",
//!   "classes": ["REST", "FIST", "OPEN", "PINCH", "POINT"],
//!   "feature_weights": [4, 4, 4, 4, 0.5, 0.5, 0.5, 0.5],
//!   "temperature": 0.05,
//!   "centroids": [[...8 values...], ...5 rows...]
//! }
//! ```

use std::f32::consts::FRAC_2_PI;
use std::fs;
use std::path::Path;

use emg_stream::{
    channel_frequency, is_primary, Gesture, SimulatorConfig, CHANNELS, GESTURE_COUNT,
};
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NetError, NetResult};
use crate::features::{extract_features, FEATURE_COUNT};
use crate::{check_input_shape, softmax, GestureModel};

const MEAN_WEIGHT: f32 = 4.0;
const RATE_WEIGHT: f32 = 0.5;

/// Serialized weights of a [`TemplateNet`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateWeights {
    pub name:            String,
    /// Class labels in index order; must match [`Gesture::ALL`].
    pub classes:         Vec<String>,
    pub feature_weights: Vec<f32>,
    pub temperature:     f32,
    /// `GESTURE_COUNT` rows of `FEATURE_COUNT` values.
    pub centroids:       Vec<Vec<f32>>,
}

impl TemplateWeights {
    /// Check every structural invariant the forward pass relies on.
    pub fn validate(&self) -> NetResult<()> {
        let expected: Vec<&str> = Gesture::ALL.iter().map(|g| g.label()).collect();
        if self.classes.len() != GESTURE_COUNT
            || self.classes.iter().zip(&expected).any(|(a, b)| !a.eq_ignore_ascii_case(b))
        {
            return Err(NetError::invalid_weights(format!(
                "classes must be {:?}, got {:?}", expected, self.classes
            )));
        }
        if self.feature_weights.len() != FEATURE_COUNT {
            return Err(NetError::invalid_weights(format!(
                "expected {} feature weights, got {}", FEATURE_COUNT, self.feature_weights.len()
            )));
        }
        if self.feature_weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(NetError::invalid_weights("feature weights must be finite and non-negative"));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(NetError::invalid_weights("temperature must be positive"));
        }
        if self.centroids.len() != GESTURE_COUNT {
            return Err(NetError::invalid_weights(format!(
                "expected {} centroids, got {}", GESTURE_COUNT, self.centroids.len()
            )));
        }
        for (i, row) in self.centroids.iter().enumerate() {
            if row.len() != FEATURE_COUNT || row.iter().any(|v| !v.is_finite()) {
                return Err(NetError::invalid_weights(format!(
                    "centroid {} must hold {} finite values", i, FEATURE_COUNT
                )));
            }
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TemplateNet
// ════════════════════════════════════════════════════════════════════════════

/// Pre-trained template classifier.  Immutable once built.
#[derive(Clone, Debug)]
pub struct TemplateNet {
    weights: TemplateWeights,
}

impl TemplateNet {
    /// Build from weights, validating them first.
    pub fn from_weights(weights: TemplateWeights) -> NetResult<Self> {
        weights.validate()?;
        Ok(TemplateNet { weights })
    }

    /// Load a JSON weights file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> NetResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| NetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> NetResult<Self> {
        let weights: TemplateWeights = serde_json::from_str(text)?;
        Self::from_weights(weights)
    }

    /// The bundled weight set, calibrated to the default simulator.
    pub fn reference() -> Self {
        TemplateNet { weights: Self::calibrated(&SimulatorConfig::default()) }
    }

    /// Expected feature centroids for windows drawn with `cfg`.
    ///
    /// A rectified sinusoid `|a·sin|` has mean `2a/π`; uniform jitter and
    /// noise contribute half their range on average.
    pub fn calibrated(cfg: &SimulatorConfig) -> TemplateWeights {
        let centroids = Gesture::ALL
            .iter()
            .map(|&g| {
                let mut row = vec![0.0f32; FEATURE_COUNT];
                for j in 0..CHANNELS {
                    let amp = if g.is_rest() {
                        cfg.rest_amplitude
                    } else if is_primary(g, j) {
                        cfg.primary_amplitude + cfg.amplitude_jitter / 2.0
                    } else {
                        cfg.secondary_amplitude + cfg.amplitude_jitter / 2.0
                    };
                    row[j]            = amp * FRAC_2_PI + cfg.sample_noise / 2.0;
                    row[CHANNELS + j] = channel_frequency(g, j);
                }
                row
            })
            .collect();

        let mut feature_weights = vec![MEAN_WEIGHT; CHANNELS];
        feature_weights.extend(std::iter::repeat(RATE_WEIGHT).take(CHANNELS));

        TemplateWeights {
            name:        "emg-template-v1".to_string(),
            classes:     Gesture::ALL.iter().map(|g| g.label().to_string()).collect(),
            feature_weights,
            temperature: 0.05,
            centroids,
        }
    }

    pub fn weights(&self) -> &TemplateWeights { &self.weights }

    pub fn to_json_pretty(&self) -> NetResult<String> {
        Ok(serde_json::to_string_pretty(&self.weights)?)
    }

    /// Weighted squared distance from `x` to every class centroid.
    fn distances(&self, x: &[f32; FEATURE_COUNT]) -> Vec<f32> {
        let w = &self.weights.feature_weights;
        self.weights
            .centroids
            .iter()
            .map(|c| {
                x.iter()
                    .zip(c)
                    .zip(w)
                    .map(|((xi, ci), wi)| wi * (xi - ci) * (xi - ci))
                    .sum()
            })
            .collect()
    }
}

impl GestureModel for TemplateNet {
    fn name(&self) -> &str { &self.weights.name }

    fn predict(&self, input: &Array3<f32>) -> NetResult<Vec<f32>> {
        check_input_shape(input)?;
        let window   = input.index_axis(Axis(0), 0);
        let features = extract_features(window);
        if features.iter().any(|v| !v.is_finite()) {
            return Err(NetError::inference("non-finite feature in input window"));
        }

        let t = self.weights.temperature;
        let logits: Vec<f32> = self.distances(&features).iter().map(|d| -d / t).collect();
        debug!(model = %self.weights.name, ?features, "template forward pass");
        Ok(softmax(&logits))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argmax;
    use emg_stream::SignalSimulator;

    #[test]
    fn reference_weights_validate() {
        assert!(TemplateNet::reference().weights().validate().is_ok());
    }

    #[test]
    fn scores_form_a_distribution() {
        let net = TemplateNet::reference();
        let mut sim = SignalSimulator::with_seed(2);
        for g in Gesture::ALL {
            let scores = net.predict(&sim.generate(g).window.into_tensor()).unwrap();
            assert_eq!(scores.len(), GESTURE_COUNT);
            let sum: f32 = scores.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "sum={}", sum);
            assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        }
    }

    #[test]
    fn rest_is_recognised() {
        let net = TemplateNet::reference();
        let mut sim = SignalSimulator::with_seed(8);
        for _ in 0..20 {
            let scores = net.predict(&sim.generate(Gesture::Rest).window.into_tensor()).unwrap();
            assert_eq!(argmax(&scores), Some(Gesture::Rest.index()));
        }
    }

    #[test]
    fn reference_accuracy_on_simulated_windows() {
        let net = TemplateNet::reference();
        let mut sim = SignalSimulator::with_seed(21);
        let per_class = 20;
        let mut correct = 0;
        for g in Gesture::ALL {
            for _ in 0..per_class {
                let scores = net.predict(&sim.generate(g).window.into_tensor()).unwrap();
                if argmax(&scores) == Some(g.index()) { correct += 1; }
            }
        }
        let acc = correct as f32 / (per_class * GESTURE_COUNT) as f32;
        assert!(acc >= 0.8, "accuracy {}", acc);
    }

    #[test]
    fn json_roundtrip_keeps_weights() {
        let net  = TemplateNet::reference();
        let json = net.to_json_pretty().unwrap();
        let back = TemplateNet::from_json_str(&json).unwrap();
        assert_eq!(back.weights(), net.weights());
    }

    #[test]
    fn rejects_wrong_class_count() {
        let mut w = TemplateNet::reference().weights().clone();
        w.centroids.pop();
        w.classes.pop();
        assert!(matches!(TemplateNet::from_weights(w), Err(NetError::InvalidWeights(_))));
    }

    #[test]
    fn rejects_non_positive_temperature() {
        let mut w = TemplateNet::reference().weights().clone();
        w.temperature = 0.0;
        assert!(matches!(TemplateNet::from_weights(w), Err(NetError::InvalidWeights(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(TemplateNet::from_json_str("{ not json"), Err(NetError::Json(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = TemplateNet::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, NetError::Io { .. }));
    }
}
