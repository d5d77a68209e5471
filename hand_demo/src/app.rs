//! Top-level application: the two timing domains and their shared state.
//!
//! `DemoApp` owns the `Arc<DemoState>`, the [`Animator`] (render side), the
//! [`InferenceWorker`] (inference side) and the model loader.  The render
//! loop in [`run`] drives `tick()` once per frame; the worker runs on its
//! own interval and never waits for a frame.

use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use emg_stream::{Gesture, SignalSimulator, SimulatorConfig};
use gesture_net::{load_model, GestureModel, ModelSource, NetResult, TemplateNet};
use tracing::{info, warn};

use crate::animator::Animator;
use crate::clock::{Clock, SystemClock};
use crate::config::DemoConfig;
use crate::error::DemoError;
use crate::frame_timing::FrameTiming;
use crate::gesture::GestureEvent;
use crate::inference::{
    spawn_model_loader, ClassifierAdapter, DecisionPolicy, InferenceTask, InferenceWorker,
    ModelSlot,
};
use crate::state::DemoState;
use crate::visualizer::{FrameView, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// DemoApp
// ════════════════════════════════════════════════════════════════════════════

pub struct DemoApp {
    // ── shared with the inference side ────────────────────────────────────
    state:    Arc<DemoState>,
    slot:     ModelSlot,

    // ── render side ───────────────────────────────────────────────────────
    animator: Animator,
    timing:   FrameTiming,
    clock:    Arc<dyn Clock>,
    policy:   DecisionPolicy,

    // ── background threads ────────────────────────────────────────────────
    worker:   Option<InferenceWorker>,
    loader:   Option<JoinHandle<()>>,
}

impl DemoApp {
    /// Build the app at REST without starting any thread.
    pub fn new(cfg: &DemoConfig, clock: Arc<dyn Clock>) -> Self {
        let start = Gesture::default();
        DemoApp {
            state:    Arc::new(DemoState::new(start)),
            slot:     ModelSlot::new(),
            animator: Animator::new(cfg.animation.clone(), start),
            timing:   FrameTiming::new(120, cfg.window.frame_limit_ms as f32),
            clock,
            policy:   cfg.inference.policy,
            worker:   None,
            loader:   None,
        }
    }

    /// Start loading the model and the fixed-interval inference worker.
    pub fn start(&mut self, cfg: &DemoConfig) -> Result<(), DemoError> {
        if self.worker.is_some() || self.state.is_torn_down() {
            return Ok(());
        }
        self.loader = Some(spawn_model_loader(
            model_loader(cfg),
            self.slot.clone(),
            Arc::clone(&self.state),
        )?);
        self.worker = Some(InferenceWorker::spawn(self.inference_task(cfg), cfg.interval())?);
        info!(policy = ?self.policy, interval_ms = cfg.inference.interval_ms, "demo started");
        Ok(())
    }

    /// The inference cycle wired to this app's state and model slot.
    pub fn inference_task(&self, cfg: &DemoConfig) -> InferenceTask {
        let (simulator, adapter) = match cfg.inference.seed {
            Some(seed) => (
                SignalSimulator::with_seed(seed),
                ClassifierAdapter::with_seed(cfg.inference.policy, seed.wrapping_add(1)),
            ),
            None => (SignalSimulator::new(), ClassifierAdapter::new(cfg.inference.policy)),
        };
        InferenceTask::new(
            Arc::clone(&self.state),
            self.slot.clone(),
            simulator.config(cfg.simulator.clone()),
            adapter,
            Arc::clone(&self.clock),
        )
    }

    // ── Gesture events ────────────────────────────────────────────────────

    /// Apply a user action.  Returns `false` when the demo should close.
    pub fn handle_gesture(&mut self, event: GestureEvent) -> bool {
        match event {
            GestureEvent::Select(g) => {
                self.state.select(g);
                true
            }
            GestureEvent::Quit => false,
        }
    }

    // ── Per-frame tick ────────────────────────────────────────────────────

    /// One render tick: ease every joint toward the selected pose.
    /// Does nothing once the view has been torn down.
    pub fn tick(&mut self) {
        if self.state.is_torn_down() {
            return;
        }
        self.animator.tick(self.state.gesture(), self.clock.now());
    }

    pub fn record_frame(&mut self, start: Duration, work: Duration) {
        self.timing.record(start, work);
    }

    /// Invalidate every outstanding write, then cancel the worker.  A cycle
    /// still inside the model finishes as `Stale`.  Idempotent.
    pub fn shutdown(&mut self) {
        self.state.teardown();
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        // The loader is left to finish on its own; its write is token-checked.
        drop(self.loader.take());
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn state(&self)    -> &Arc<DemoState> { &self.state }
    pub fn slot(&self)     -> &ModelSlot      { &self.slot }
    pub fn animator(&self) -> &Animator       { &self.animator }
    pub fn is_running(&self) -> bool          { self.worker.is_some() }

    pub fn frame_view(&self) -> FrameView<'_> {
        FrameView {
            hand:      self.animator.hand(),
            telemetry: self.state.snapshot(),
            timing:    self.timing.stats(),
            policy:    self.policy,
        }
    }
}

impl Drop for DemoApp {
    fn drop(&mut self) { self.shutdown(); }
}

/// Loader for the configured model.  The built-in weights are recalibrated
/// when the simulator has been retuned.
fn model_loader(cfg: &DemoConfig) -> impl FnOnce() -> NetResult<Box<dyn GestureModel>> + Send + 'static {
    let source = cfg.model_source();
    let sim    = cfg.simulator.clone();
    move || match source {
        ModelSource::Reference if sim != SimulatorConfig::default() => {
            let net = TemplateNet::from_weights(TemplateNet::calibrated(&sim))?;
            Ok(Box::new(net) as Box<dyn GestureModel>)
        }
        other => load_model(&other),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the demo until the window closes or the user quits.
///
/// Only startup can fail: window creation or spawning the background
/// threads.  Everything after that degrades in place.
pub fn run(cfg: DemoConfig) -> Result<(), DemoError> {
    // ── Input channel (window → app) ──────────────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<GestureEvent>();

    // ── Visualizer ────────────────────────────────────────────────────────
    let mut vis = Visualizer::new(&cfg.window, cfg.frame_limit(), event_tx)
        .map_err(DemoError::Window)?;

    // ── App ───────────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let mut app = DemoApp::new(&cfg, Arc::clone(&clock));
    app.start(&cfg)?;

    // ── Main loop ─────────────────────────────────────────────────────────
    'frames: while vis.is_open() {
        // 1. Window input → GestureEvents
        if !vis.poll_input() { break; }

        // 2. Drain events
        loop {
            match event_rx.try_recv() {
                Ok(evt) => {
                    if !app.handle_gesture(evt) { break 'frames; }
                }
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => break 'frames,
            }
        }

        // 3. Ease + draw
        let start = clock.now();
        app.tick();
        vis.render(&app.frame_view());
        app.record_frame(start, clock.now().saturating_sub(start));
    }

    let stats = app.frame_view().timing;
    if stats.missed > 0 {
        warn!(missed = stats.missed, frames = stats.total_frames, "frames over budget");
    }
    app.shutdown();
    info!(frames = stats.total_frames, "demo closed");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
