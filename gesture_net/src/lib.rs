//! # gesture_net
//!
//! The model boundary of the EMG hand demo: a pre-trained classifier that
//! maps one `[1, 200, 4]` window to a score per gesture class.
//!
//! * [`GestureModel`]: the pure scoring function every backend implements.
//! * [`load_model`]: the load-once entry point.  It blocks; callers that
//!   must stay responsive run it on a loader thread.
//! * [`TemplateNet`]: the bundled nearest-template network, with JSON
//!   weight files.
//!
//! ## Quick start
//!
//! ```rust
//! use gesture_net::{load_model, argmax, ModelSource};
//! use emg_stream::{Gesture, SignalSimulator};
//!
//! let model  = load_model(&ModelSource::Reference).unwrap();
//! let window = SignalSimulator::with_seed(4).generate(Gesture::Rest).window;
//! let scores = model.predict(&window.into_tensor()).unwrap();
//! assert_eq!(scores.len(), 5);
//! assert_eq!(argmax(&scores), Some(Gesture::Rest.index()));
//! ```

use std::path::PathBuf;

use emg_stream::{CHANNELS, WINDOW_LEN};
use ndarray::Array3;
use tracing::info;

pub mod error;
pub mod features;
pub mod template;

pub use error::{NetError, NetResult};
pub use features::{extract_features, FEATURE_COUNT};
pub use template::{TemplateNet, TemplateWeights};

/// The only input shape any model accepts.
pub const INPUT_SHAPE: [usize; 3] = [1, WINDOW_LEN, CHANNELS];

// ════════════════════════════════════════════════════════════════════════════
// GestureModel
// ════════════════════════════════════════════════════════════════════════════

/// A loaded classifier: a pure function from window tensor to class scores.
pub trait GestureModel: Send + Sync {
    fn name(&self) -> &str;

    fn input_shape(&self) -> [usize; 3] { INPUT_SHAPE }

    /// One score per gesture class, in [`emg_stream::Gesture::ALL`] order.
    fn predict(&self, input: &Array3<f32>) -> NetResult<Vec<f32>>;
}

/// Where the classifier weights come from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ModelSource {
    /// The bundled reference weights.
    #[default]
    Reference,
    /// A JSON weights file.
    File(PathBuf),
}

/// Load a model from `source`.
pub fn load_model(source: &ModelSource) -> NetResult<Box<dyn GestureModel>> {
    let model: Box<dyn GestureModel> = match source {
        ModelSource::Reference  => Box::new(TemplateNet::reference()),
        ModelSource::File(path) => Box::new(TemplateNet::from_json_file(path)?),
    };
    info!(model = model.name(), ?source, "gesture model loaded");
    Ok(model)
}

/// Reject anything that is not exactly [`INPUT_SHAPE`].
pub fn check_input_shape(input: &Array3<f32>) -> NetResult<()> {
    if input.shape() != INPUT_SHAPE {
        return Err(NetError::ShapeMismatch {
            expected: INPUT_SHAPE.to_vec(),
            actual:   input.shape().to_vec(),
        });
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Score helpers
// ════════════════════════════════════════════════════════════════════════════

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        exps.iter().map(|e| e / sum).collect()
    } else {
        vec![1.0 / logits.len().max(1) as f32; logits.len()]
    }
}

/// Index of the largest score; `None` for an empty slice.  NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0, -400.0, 0.0]);
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn softmax_handles_huge_logits() {
        let p = softmax(&[1e30, 1e30]);
        assert!((p[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.3]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn wrong_shape_rejected() {
        let model = load_model(&ModelSource::Reference).unwrap();
        let bad = Array3::<f32>::zeros((1, 100, 4));
        match model.predict(&bad) {
            Err(NetError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, vec![1, 200, 4]);
                assert_eq!(actual, vec![1, 100, 4]);
            }
            other => panic!("expected shape mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn loads_weights_from_file() {
        let json = TemplateNet::reference().to_json_pretty().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let model = load_model(&ModelSource::File(file.path().to_path_buf())).unwrap();
        assert_eq!(model.name(), "emg-template-v1");
        assert_eq!(model.input_shape(), INPUT_SHAPE);
    }
}
