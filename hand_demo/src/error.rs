//! Startup errors for the demo.  Nothing raised inside the running loops
//! ends up here; those degrade in place.

use std::path::PathBuf;

use gesture_net::NetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("window error: {0}")]
    Window(String),

    /// Config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Config {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Thread spawn or other OS-level failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot serialize config: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Model(#[from] NetError),
}
