//! Select FIST, run both timing domains by hand, check the readout and pose.

use std::sync::Arc;
use std::time::Duration;

use emg_stream::{ChannelEnergy, Gesture, SignalSimulator};
use gesture_net::TemplateNet;
use hand_demo::animator::{AnimationConfig, Animator};
use hand_demo::clock::{Clock, ManualClock};
use hand_demo::gesture::{GestureEvent, InputKey};
use hand_demo::hand::{pose_target, Finger};
use hand_demo::inference::{
    ClassifierAdapter, DecisionLabel, DecisionPolicy, InferenceTask, ModelSlot, TickOutcome,
};
use hand_demo::state::DemoState;

const FRAME: Duration = Duration::from_millis(16);
const INTERVAL: Duration = Duration::from_millis(150);

fn inference_task(state: &Arc<DemoState>, clock: &ManualClock, slot: ModelSlot) -> InferenceTask {
    InferenceTask::new(
        Arc::clone(state),
        slot,
        SignalSimulator::with_seed(2024),
        ClassifierAdapter::with_seed(DecisionPolicy::DemoGuaranteed, 2025),
        Arc::new(clock.clone()),
    )
}

#[test]
fn fist_selection_end_to_end() {
    let clock = ManualClock::new();
    let state = Arc::new(DemoState::new(Gesture::Rest));
    let slot  = ModelSlot::ready(Arc::new(TemplateNet::reference()));
    let mut task     = inference_task(&state, &clock, slot);
    let mut animator = Animator::new(AnimationConfig::default(), Gesture::Rest);

    // Key press → event → state.
    if let Some(GestureEvent::Select(g)) = GestureEvent::from_key(InputKey::F) {
        assert!(state.select(g));
    }
    assert_eq!(state.gesture(), Gesture::Fist);

    // Interleave: one inference cycle per ~9 frames, 60 frames total.
    let mut decisions = Vec::new();
    let mut next_inference = Duration::ZERO;
    for _ in 0..60 {
        if clock.now() >= next_inference {
            if let TickOutcome::Published(d) = task.tick() {
                decisions.push(d);
            }
            next_inference += INTERVAL;
        }
        animator.tick(state.gesture(), clock.now());
        clock.advance(FRAME);
    }
    while decisions.len() < 10 {
        match task.tick() {
            TickOutcome::Published(d) => decisions.push(d),
            other => panic!("unexpected {:?}", other),
        }
    }

    assert!(decisions.len() >= 10);
    for d in &decisions {
        assert_eq!(d.label, DecisionLabel::Gesture(Gesture::Fist));
        assert!((0.92..=0.99).contains(&d.confidence));
        assert!(d.latency_ms >= 0.0);
    }

    for f in Finger::ALL {
        let err = (animator.hand().finger(f).root_angle() - pose_target(Gesture::Fist, f)).abs();
        assert!(err < 1e-3, "{:?} off by {}", f, err);
    }
    let roots = animator.root_angles();
    assert!(roots[1..].iter().all(|&r| roots[0] < r), "thumb should flex least: {:?}", roots);

    let snap = state.snapshot();
    assert_eq!(snap.gesture, Gesture::Fist);
    assert_eq!(snap.cycles, decisions.len() as u64);
    assert_ne!(snap.energy, ChannelEnergy::default());
}

#[test]
fn nothing_is_written_after_teardown() {
    let clock = ManualClock::new();
    let state = Arc::new(DemoState::new(Gesture::Open));
    let slot  = ModelSlot::ready(Arc::new(TemplateNet::reference()));
    let mut task = inference_task(&state, &clock, slot);

    assert!(matches!(task.tick(), TickOutcome::Published(_)));
    let before = state.snapshot();

    state.teardown();
    state.select(Gesture::Fist);
    for _ in 0..5 {
        assert_eq!(task.tick(), TickOutcome::Stale);
    }

    let after = state.snapshot();
    assert_eq!(after.decision, before.decision);
    assert_eq!(after.energy, before.energy);
    assert_eq!(after.cycles, before.cycles);
}

#[test]
fn loading_model_skips_until_installed() {
    let clock = ManualClock::new();
    let state = Arc::new(DemoState::new(Gesture::Point));
    let slot  = ModelSlot::new();
    let mut task = inference_task(&state, &clock, slot.clone());

    for _ in 0..3 {
        assert_eq!(task.tick(), TickOutcome::ModelNotReady);
    }
    assert_eq!(state.decision().label, DecisionLabel::Initializing);

    slot.load_with(|| Ok(Box::new(TemplateNet::reference())), &state);
    assert_eq!(state.decision().label, DecisionLabel::Ready);
    match task.tick() {
        TickOutcome::Published(d) => assert_eq!(d.label, DecisionLabel::Gesture(Gesture::Point)),
        other => panic!("unexpected {:?}", other),
    }
}
