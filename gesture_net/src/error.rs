//! Error types for model loading and scoring.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for model operations.
pub type NetResult<T> = Result<T, NetError>;

/// Everything that can go wrong at the model boundary.
#[derive(Error, Debug)]
pub enum NetError {
    /// The model could not be produced from its source.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The weights file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The weights file is not valid JSON for this model.
    #[error("malformed weights: {0}")]
    Json(#[from] serde_json::Error),

    /// Weights parsed but violate the model's invariants.
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// Input tensor does not have the fixed `[1, 200, 4]` shape.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual:   Vec<usize>,
    },

    /// The forward pass itself failed.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl NetError {
    pub fn invalid_weights<S: Into<String>>(msg: S) -> Self {
        NetError::InvalidWeights(msg.into())
    }

    pub fn inference<S: Into<String>>(msg: S) -> Self {
        NetError::Inference(msg.into())
    }
}
