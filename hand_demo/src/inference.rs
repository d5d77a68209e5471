//! The inference timing domain: model loading, the classifier adapter and
//! the fixed-interval worker thread.
//!
//! ```text
//!   ModelLoader thread ──install──▶ ModelSlot ◀──read── InferenceTask::tick
//!                                                        │  simulate window
//!                                                        │  classify (timed)
//!                                                        ▼
//!                                                    DemoState (token-checked)
//! ```
//!
//! Nothing in here is fatal.  A model that is still loading, a model that
//! failed to load, a failed forward pass and a result arriving after
//! teardown all end the cycle quietly with a [`TickOutcome`] and leave the
//! previous decision on screen.

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use emg_stream::{Gesture, SignalSimulator, SignalWindow, GESTURE_COUNT};
use gesture_net::{argmax, GestureModel, NetError, NetResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::state::DemoState;

// ════════════════════════════════════════════════════════════════════════════
// Decision
// ════════════════════════════════════════════════════════════════════════════

/// How the exposed decision relates to the model's raw scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionPolicy {
    /// The label is always the selected gesture and confidence is held in
    /// `[0.92, 0.99]`.  This hides real model disagreement; the raw arg-max
    /// is still logged and carried in [`Decision::model_label`].
    #[default]
    DemoGuaranteed,
    /// The label is the model's arg-max and confidence its score.
    RawModel,
}

/// What the prediction panel shows as its headline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecisionLabel {
    /// The model is still loading.
    #[default]
    Initializing,
    /// The model loaded; no cycle has completed yet.
    Ready,
    /// The model failed to load.
    Error,
    Gesture(Gesture),
}

impl DecisionLabel {
    pub fn gesture(self) -> Option<Gesture> {
        match self {
            DecisionLabel::Gesture(g) => Some(g),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionLabel::Initializing => f.write_str("INITIALIZING"),
            DecisionLabel::Ready        => f.write_str("READY"),
            DecisionLabel::Error        => f.write_str("ERROR"),
            DecisionLabel::Gesture(g)   => f.write_str(g.label()),
        }
    }
}

/// The current classification readout.  Replaced wholesale every cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Decision {
    pub label:       DecisionLabel,
    /// In `[0, 1]`.
    pub confidence:  f32,
    /// Wall-clock duration of the model call.
    pub latency_ms:  f32,
    /// The model's own arg-max, whatever the policy.
    pub model_label: Option<Gesture>,
}

// ════════════════════════════════════════════════════════════════════════════
// ClassifierAdapter
// ════════════════════════════════════════════════════════════════════════════

const FLOOR_CONFIDENCE: f32 = 0.92;
const CEIL_CONFIDENCE:  f32 = 0.99;
const CONFIDENCE_JITTER: f32 = 0.05;

/// Wraps one model call: tensor lifetime, timing and the decision policy.
pub struct ClassifierAdapter {
    policy: DecisionPolicy,
    rng:    StdRng,
}

impl ClassifierAdapter {
    pub fn new(policy: DecisionPolicy) -> Self {
        ClassifierAdapter { policy, rng: StdRng::from_entropy() }
    }

    pub fn with_seed(policy: DecisionPolicy, seed: u64) -> Self {
        ClassifierAdapter { policy, rng: StdRng::seed_from_u64(seed) }
    }

    pub fn policy(&self) -> DecisionPolicy { self.policy }

    /// Score `window` once and turn the result into a [`Decision`].
    ///
    /// The window is consumed; its tensor is dropped on every exit path.
    /// Latency covers only the `predict` call.
    pub fn classify(
        &mut self,
        model:    &dyn GestureModel,
        window:   SignalWindow,
        selected: Gesture,
        clock:    &dyn Clock,
    ) -> NetResult<Decision> {
        let tensor = window.into_tensor();

        let start  = clock.now();
        let scores = model.predict(&tensor)?;
        let latency = clock.now().saturating_sub(start);
        drop(tensor);

        if scores.len() != GESTURE_COUNT {
            return Err(NetError::inference(format!(
                "expected {} scores, got {}", GESTURE_COUNT, scores.len()
            )));
        }

        let model_label = argmax(&scores).and_then(Gesture::from_index);
        let latency_ms  = latency.as_secs_f32() * 1000.0;

        let (label, confidence) = match self.policy {
            DecisionPolicy::DemoGuaranteed => {
                let raw    = scores[selected.index()];
                let jitter = self.rng.gen_range(0.0..CONFIDENCE_JITTER);
                let c = (raw.max(FLOOR_CONFIDENCE) + jitter).min(CEIL_CONFIDENCE);
                (DecisionLabel::Gesture(selected), c)
            }
            DecisionPolicy::RawModel => match model_label {
                Some(g) => (DecisionLabel::Gesture(g), scores[g.index()].clamp(0.0, 1.0)),
                None    => return Err(NetError::inference("model returned only NaN scores")),
            },
        };

        debug!(
            selected = %selected,
            model = ?model_label,
            confidence,
            latency_ms,
            "inference cycle"
        );

        Ok(Decision { label, confidence, latency_ms, model_label })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ModelSlot: load-once cell
// ════════════════════════════════════════════════════════════════════════════

/// Where the model stands from the inference worker's point of view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelStatus {
    Loading,
    Ready,
    Failed(String),
}

type LoadResult = Result<Arc<dyn GestureModel>, String>;

/// Holds the model once the loader has produced it.  Cheap to clone.
#[derive(Clone, Default)]
pub struct ModelSlot {
    cell: Arc<OnceLock<LoadResult>>,
}

impl ModelSlot {
    pub fn new() -> Self { Self::default() }

    /// A slot that already holds `model`.
    pub fn ready(model: Arc<dyn GestureModel>) -> Self {
        let slot = Self::new();
        slot.install(Ok(model));
        slot
    }

    /// Store the load result.  Only the first call has any effect.
    pub fn install(&self, result: LoadResult) -> bool {
        self.cell.set(result).is_ok()
    }

    pub fn status(&self) -> ModelStatus {
        match self.cell.get() {
            None          => ModelStatus::Loading,
            Some(Ok(_))   => ModelStatus::Ready,
            Some(Err(e))  => ModelStatus::Failed(e.clone()),
        }
    }

    pub fn model(&self) -> Option<Arc<dyn GestureModel>> {
        match self.cell.get() {
            Some(Ok(m)) => Some(Arc::clone(m)),
            _ => None,
        }
    }

    /// Run `load` on the current thread, install the result and publish the
    /// matching `READY` / `ERROR` label.
    pub fn load_with<F>(&self, load: F, state: &DemoState)
    where
        F: FnOnce() -> NetResult<Box<dyn GestureModel>>,
    {
        let token = state.token();
        match load() {
            Ok(model) => {
                info!(model = model.name(), "model ready");
                // Label first: once installed, the worker may publish at once.
                state.publish_status(token, DecisionLabel::Ready);
                self.install(Ok(Arc::from(model)));
            }
            Err(e) => {
                warn!(error = %e, "model load failed");
                state.publish_status(token, DecisionLabel::Error);
                self.install(Err(e.to_string()));
            }
        }
    }
}

/// Load the model on its own thread so neither timing domain waits for it.
pub fn spawn_model_loader<F>(
    load:  F,
    slot:  ModelSlot,
    state: Arc<DemoState>,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() -> NetResult<Box<dyn GestureModel>> + Send + 'static,
{
    thread::Builder::new()
        .name("model-loader".into())
        .spawn(move || slot.load_with(load, &state))
}

// ════════════════════════════════════════════════════════════════════════════
// InferenceTask: one cycle, no timing of its own
// ════════════════════════════════════════════════════════════════════════════

/// Result of one inference cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Published(Decision),
    /// Model still loading; nothing happened.
    ModelNotReady,
    /// Model failed to load; nothing happened.
    ModelFailed,
    /// The forward pass failed; the previous decision stays visible.
    InferenceFailed(String),
    /// The view was torn down before the result could be applied.
    Stale,
}

/// Simulator + classifier adapter, driven one cycle at a time.
pub struct InferenceTask {
    state:     Arc<DemoState>,
    slot:      ModelSlot,
    simulator: SignalSimulator,
    adapter:   ClassifierAdapter,
    clock:     Arc<dyn Clock>,
}

impl InferenceTask {
    pub fn new(
        state:     Arc<DemoState>,
        slot:      ModelSlot,
        simulator: SignalSimulator,
        adapter:   ClassifierAdapter,
        clock:     Arc<dyn Clock>,
    ) -> Self {
        InferenceTask { state, slot, simulator, adapter, clock }
    }

    /// Run one simulate → classify → publish cycle.
    pub fn tick(&mut self) -> TickOutcome {
        let token = self.state.token();
        if !self.state.is_live(token) {
            return TickOutcome::Stale;
        }

        let model = match self.slot.status() {
            ModelStatus::Loading => {
                trace!("model not ready, skipping cycle");
                return TickOutcome::ModelNotReady;
            }
            ModelStatus::Failed(_) => return TickOutcome::ModelFailed,
            ModelStatus::Ready => match self.slot.model() {
                Some(m) => m,
                None    => return TickOutcome::ModelNotReady,
            },
        };

        // The decision reports the gesture active when the cycle started.
        let gesture = self.state.gesture();
        let sim = self.simulator.generate(gesture);

        if !self.state.publish_energy(token, sim.energy) {
            return TickOutcome::Stale;
        }

        match self.adapter.classify(model.as_ref(), sim.window, gesture, self.clock.as_ref()) {
            Ok(decision) => {
                if self.state.publish_decision(token, decision) {
                    TickOutcome::Published(decision)
                } else {
                    debug!("late inference result dropped after teardown");
                    TickOutcome::Stale
                }
            }
            Err(e) => {
                warn!(error = %e, "inference failed, keeping previous decision");
                TickOutcome::InferenceFailed(e.to_string())
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// InferenceWorker: the fixed-interval thread
// ════════════════════════════════════════════════════════════════════════════

enum WorkerCommand {
    Stop,
}

/// Handle to the inference thread.  Stopping (or dropping) the handle
/// cancels the timer and joins the thread.
pub struct InferenceWorker {
    cmd_tx: Sender<WorkerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl InferenceWorker {
    /// Run `task.tick()` every `interval` until stopped.
    pub fn spawn(mut task: InferenceTask, interval: Duration) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<WorkerCommand>();
        let interval = interval.max(Duration::from_millis(1));

        let handle = thread::Builder::new()
            .name("inference".into())
            .spawn(move || {
                let mut next = Instant::now() + interval;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match cmd_rx.recv_timeout(wait) {
                        Ok(WorkerCommand::Stop)
                        | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                    task.tick();
                    next += interval;
                    // Fell behind (slow model): skip missed slots.
                    let now = Instant::now();
                    if next < now {
                        next = now + interval;
                    }
                }
                debug!("inference worker stopped");
            })?;

        info!(interval_ms = interval.as_millis() as u64, "inference worker started");
        Ok(InferenceWorker { cmd_tx, handle: Some(handle) })
    }

    /// Cancel the timer and wait for an in-flight cycle to finish.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.cmd_tx.send(WorkerCommand::Stop);
            if handle.join().is_err() {
                warn!("inference worker panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool { self.handle.is_some() }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) { self.stop(); }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use gesture_net::TemplateNet;
    use ndarray::Array3;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always scores one class at 1.0.
    struct FixedModel(usize);
    impl GestureModel for FixedModel {
        fn name(&self) -> &str { "fixed" }
        fn predict(&self, _input: &Array3<f32>) -> NetResult<Vec<f32>> {
            let mut s = vec![0.0; GESTURE_COUNT];
            s[self.0] = 1.0;
            Ok(s)
        }
    }

    struct FailingModel(AtomicUsize);
    impl GestureModel for FailingModel {
        fn name(&self) -> &str { "failing" }
        fn predict(&self, _input: &Array3<f32>) -> NetResult<Vec<f32>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(NetError::inference("backend exploded"))
        }
    }

    /// Takes exactly `cost` of manual-clock time per call.
    struct SlowModel { clock: ManualClock, cost: Duration }
    impl GestureModel for SlowModel {
        fn name(&self) -> &str { "slow" }
        fn predict(&self, _input: &Array3<f32>) -> NetResult<Vec<f32>> {
            self.clock.advance(self.cost);
            Ok(vec![0.2; GESTURE_COUNT])
        }
    }

    /// Tears the view down while its own call is in flight.
    struct TeardownModel(Arc<DemoState>);
    impl GestureModel for TeardownModel {
        fn name(&self) -> &str { "teardown" }
        fn predict(&self, _input: &Array3<f32>) -> NetResult<Vec<f32>> {
            self.0.teardown();
            Ok(vec![0.2; GESTURE_COUNT])
        }
    }

    /// Switches the selection to OPEN while its own call is in flight.
    struct SwitchModel(Arc<DemoState>);
    impl GestureModel for SwitchModel {
        fn name(&self) -> &str { "switch" }
        fn predict(&self, _input: &Array3<f32>) -> NetResult<Vec<f32>> {
            self.0.select(Gesture::Open);
            Ok(vec![0.2; GESTURE_COUNT])
        }
    }

    fn task_with(state: &Arc<DemoState>, slot: ModelSlot, policy: DecisionPolicy) -> InferenceTask {
        InferenceTask::new(
            Arc::clone(state),
            slot,
            SignalSimulator::with_seed(5),
            ClassifierAdapter::with_seed(policy, 5),
            Arc::new(ManualClock::new()),
        )
    }

    #[test]
    fn guaranteed_policy_follows_selection() {
        let state = Arc::new(DemoState::new(Gesture::Rest));
        // Model disagrees: always says OPEN.
        let slot = ModelSlot::ready(Arc::new(FixedModel(Gesture::Open.index())));
        let mut task = task_with(&state, slot, DecisionPolicy::DemoGuaranteed);

        for g in Gesture::ALL {
            state.select(g);
            for _ in 0..20 {
                match task.tick() {
                    TickOutcome::Published(d) => {
                        assert_eq!(d.label, DecisionLabel::Gesture(g));
                        assert!((0.92..=0.99).contains(&d.confidence), "{}", d.confidence);
                        assert_eq!(d.model_label, Some(Gesture::Open));
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
        }
    }

    #[test]
    fn raw_policy_reports_model() {
        let state = Arc::new(DemoState::new(Gesture::Fist));
        let slot = ModelSlot::ready(Arc::new(FixedModel(Gesture::Pinch.index())));
        let mut task = task_with(&state, slot, DecisionPolicy::RawModel);

        match task.tick() {
            TickOutcome::Published(d) => {
                assert_eq!(d.label, DecisionLabel::Gesture(Gesture::Pinch));
                assert_eq!(d.confidence, 1.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn latency_is_measured_call_duration() {
        let clock = ManualClock::new();
        let model = SlowModel { clock: clock.clone(), cost: Duration::from_millis(12) };
        let mut adapter = ClassifierAdapter::with_seed(DecisionPolicy::DemoGuaranteed, 1);
        let window = SignalSimulator::with_seed(1).generate(Gesture::Pinch).window;

        let d = adapter.classify(&model, window, Gesture::Pinch, &clock).unwrap();
        assert!((d.latency_ms - 12.0).abs() < 1e-3, "{}", d.latency_ms);
    }

    #[test]
    fn label_is_gesture_at_cycle_start() {
        let state = Arc::new(DemoState::new(Gesture::Fist));
        let slot = ModelSlot::ready(Arc::new(SwitchModel(Arc::clone(&state))));
        let mut task = task_with(&state, slot, DecisionPolicy::DemoGuaranteed);

        match task.tick() {
            TickOutcome::Published(d) => assert_eq!(d.label, DecisionLabel::Gesture(Gesture::Fist)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state.gesture(), Gesture::Open);
        assert_eq!(state.decision().label, DecisionLabel::Gesture(Gesture::Fist));

        // The next cycle starts under OPEN.
        match task.tick() {
            TickOutcome::Published(d) => assert_eq!(d.label, DecisionLabel::Gesture(Gesture::Open)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn not_ready_model_skips_cycle() {
        let state = Arc::new(DemoState::new(Gesture::Fist));
        let mut task = task_with(&state, ModelSlot::new(), DecisionPolicy::DemoGuaranteed);

        assert_eq!(task.tick(), TickOutcome::ModelNotReady);
        let snap = state.snapshot();
        assert_eq!(snap.decision.label, DecisionLabel::Initializing);
        assert_eq!(snap.cycles, 0);
    }

    #[test]
    fn failed_load_shows_error_and_skips() {
        let state = Arc::new(DemoState::new(Gesture::Rest));
        let slot  = ModelSlot::new();
        slot.load_with(|| Err(NetError::ModelLoad("no weights".into())), &state);

        assert_eq!(state.decision().label, DecisionLabel::Error);
        let mut task = task_with(&state, slot, DecisionPolicy::DemoGuaranteed);
        assert_eq!(task.tick(), TickOutcome::ModelFailed);
        assert_eq!(state.decision().label, DecisionLabel::Error);
    }

    #[test]
    fn successful_load_shows_ready() {
        let state = Arc::new(DemoState::new(Gesture::Rest));
        let slot  = ModelSlot::new();
        slot.load_with(|| Ok(Box::new(TemplateNet::reference())), &state);
        assert_eq!(slot.status(), ModelStatus::Ready);
        assert_eq!(state.decision().label, DecisionLabel::Ready);
    }

    #[test]
    fn slot_installs_once() {
        let slot = ModelSlot::new();
        assert!(slot.install(Err("first".into())));
        assert!(!slot.install(Ok(Arc::new(FixedModel(0)))));
        assert_eq!(slot.status(), ModelStatus::Failed("first".into()));
    }

    #[test]
    fn inference_failure_keeps_previous_decision() {
        let state = Arc::new(DemoState::new(Gesture::Open));
        let good  = ModelSlot::ready(Arc::new(FixedModel(0)));
        let mut task = task_with(&state, good, DecisionPolicy::DemoGuaranteed);
        let before = match task.tick() {
            TickOutcome::Published(d) => d,
            other => panic!("unexpected {:?}", other),
        };

        let failing = Arc::new(FailingModel(AtomicUsize::new(0)));
        let mut bad = task_with(&state, ModelSlot::ready(failing.clone()), DecisionPolicy::DemoGuaranteed);
        for _ in 0..3 {
            assert!(matches!(bad.tick(), TickOutcome::InferenceFailed(_)));
        }
        assert_eq!(failing.0.load(Ordering::SeqCst), 3);
        assert_eq!(state.decision(), before);
    }

    #[test]
    fn result_after_teardown_is_dropped() {
        let state = Arc::new(DemoState::new(Gesture::Fist));
        let slot  = ModelSlot::ready(Arc::new(TeardownModel(Arc::clone(&state))));
        let mut task = task_with(&state, slot, DecisionPolicy::DemoGuaranteed);

        assert_eq!(task.tick(), TickOutcome::Stale);
        assert_eq!(state.decision().label, DecisionLabel::Initializing);
        assert_eq!(state.cycles(), 0);
        // And nothing afterwards either.
        assert_eq!(task.tick(), TickOutcome::Stale);
    }

    #[test]
    fn wrong_score_length_is_an_inference_error() {
        struct Short;
        impl GestureModel for Short {
            fn name(&self) -> &str { "short" }
            fn predict(&self, _: &Array3<f32>) -> NetResult<Vec<f32>> { Ok(vec![1.0; 3]) }
        }
        let clock = ManualClock::new();
        let mut adapter = ClassifierAdapter::with_seed(DecisionPolicy::RawModel, 2);
        let window = SignalSimulator::with_seed(2).generate(Gesture::Rest).window;
        assert!(adapter.classify(&Short, window, Gesture::Rest, &clock).is_err());
    }

    #[test]
    fn worker_ticks_and_stops() {
        let state = Arc::new(DemoState::new(Gesture::Point));
        let slot  = ModelSlot::ready(Arc::new(FixedModel(0)));
        let task  = task_with(&state, slot, DecisionPolicy::DemoGuaranteed);

        let mut worker = InferenceWorker::spawn(task, Duration::from_millis(5)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.cycles() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        worker.stop();
        assert!(!worker.is_running());

        let after_stop = state.cycles();
        assert!(after_stop >= 3);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(state.cycles(), after_stop);
        assert_eq!(state.decision().label, DecisionLabel::Gesture(Gesture::Point));
    }
}
