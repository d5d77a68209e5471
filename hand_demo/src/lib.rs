//! # hand_demo
//!
//! Real-time EMG gesture demo: a simulated four-channel EMG stream is scored
//! by a load-once classifier every 150 ms while an articulated 3D hand eases
//! toward the selected gesture every frame.
//!
//! ## Timing domains
//!
//! | Domain | Driven by | Does | Writes |
//! |---|---|---|---|
//! | Render tick | window refresh (~60 fps) | joint easing, idle bob/yaw, redraw | joint angles, idle offset |
//! | Inference tick | fixed 150 ms interval, own thread | simulate window, classify, time it | decision, channel energy |
//!
//! Both read the selected gesture from the shared [`state::DemoState`].
//! Closing the view cancels the worker and invalidates every in-flight
//! write through a liveness token.
//!
//! ## Gesture → pose
//!
//! | Gesture | Key | Pose |
//! |---|---|---|
//! | REST  | `1` / `R` | all fingers slightly flexed |
//! | FIST  | `2` / `F` | all fingers closed, thumb a little less |
//! | OPEN  | `3` / `O` | all fingers extended |
//! | PINCH | `4` / `P` | thumb and index closed, others relaxed |
//! | POINT | `5` / `I` | index extended, others closed |
//!
//! `Q` or `Escape` closes the window.  Gesture buttons in the side panel
//! can also be clicked.
//!
//! ## Decision policy
//!
//! * `demo-guaranteed` (default): the label is the selected gesture and
//!   confidence is held in `[0.92, 0.99]`; the model's own arg-max is still
//!   shown as `MODEL …` and logged.
//! * `raw-model`: label and confidence come straight from the model.

pub mod animator;
pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame_timing;
pub mod gesture;
pub mod hand;
pub mod inference;
pub mod kinematics;
pub mod state;
pub mod visualizer;

pub use error::DemoError;
