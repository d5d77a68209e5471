//! Shared state container for the render loop and the inference worker.
//!
//! One [`DemoState`] lives behind an `Arc` for the lifetime of the demo view.
//! Each field has a single writer:
//!
//! | Field | Written by | Read by |
//! |---|---|---|
//! | gesture | user input (app) | render loop, inference worker |
//! | decision | inference worker, model loader | render loop |
//! | energy | inference worker | render loop |
//!
//! Writers from the inference side hold a [`LivenessToken`] taken when their
//! cycle began.  [`DemoState::teardown`] invalidates every outstanding token,
//! so a model call that resolves after the view closed cannot write into it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use emg_stream::{ChannelEnergy, Gesture};
use parking_lot::Mutex;
use tracing::info;

use crate::gesture::GestureState;
use crate::inference::{Decision, DecisionLabel};

/// Proof that a write belongs to the current generation of the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LivenessToken(u64);

/// Read-only view exposed to the telemetry display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetrySnapshot {
    pub gesture:  Gesture,
    pub decision: Decision,
    pub energy:   ChannelEnergy,
    /// Number of decisions published so far.
    pub cycles:   u64,
}

#[derive(Debug, Default)]
pub struct DemoState {
    gesture:    GestureState,
    decision:   Mutex<Decision>,
    energy:     Mutex<ChannelEnergy>,
    cycles:     AtomicU64,
    generation: AtomicU64,
    torn_down:  AtomicBool,
}

impl DemoState {
    pub fn new(initial: Gesture) -> Self {
        DemoState {
            gesture: GestureState::new(initial),
            ..Default::default()
        }
    }

    // ── gesture ───────────────────────────────────────────────────────────

    pub fn gesture(&self) -> Gesture { self.gesture.get() }

    /// Apply a user selection.  Re-selecting the active gesture is a no-op
    /// and returns `false`.
    pub fn select(&self, g: Gesture) -> bool {
        let changed = self.gesture.select(g);
        if changed {
            info!(gesture = %g, "gesture selected");
        }
        changed
    }

    // ── liveness ──────────────────────────────────────────────────────────

    /// Token for a cycle starting now.
    pub fn token(&self) -> LivenessToken {
        LivenessToken(self.generation.load(Ordering::Acquire))
    }

    pub fn is_live(&self, token: LivenessToken) -> bool {
        !self.torn_down.load(Ordering::Acquire)
            && self.generation.load(Ordering::Acquire) == token.0
    }

    pub fn is_torn_down(&self) -> bool { self.torn_down.load(Ordering::Acquire) }

    /// Invalidate every outstanding token.  Idempotent.
    ///
    /// Takes both write locks so that no token check can interleave with
    /// the flip.
    pub fn teardown(&self) {
        let _d = self.decision.lock();
        let _e = self.energy.lock();
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            self.generation.fetch_add(1, Ordering::AcqRel);
            info!("demo state torn down");
        }
    }

    // ── inference-side writes ─────────────────────────────────────────────

    /// Replace the decision wholesale.  Returns `false` (and writes nothing)
    /// for a stale token.
    pub fn publish_decision(&self, token: LivenessToken, decision: Decision) -> bool {
        let mut slot = self.decision.lock();
        if !self.is_live(token) {
            return false;
        }
        *slot = decision;
        self.cycles.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Replace the per-channel energies.  Same token rule as decisions.
    pub fn publish_energy(&self, token: LivenessToken, energy: ChannelEnergy) -> bool {
        let mut slot = self.energy.lock();
        if !self.is_live(token) {
            return false;
        }
        *slot = energy;
        true
    }

    /// Show a model status (`READY` / `ERROR`) in the decision label while
    /// keeping the last confidence and latency.
    pub fn publish_status(&self, token: LivenessToken, label: DecisionLabel) -> bool {
        let mut slot = self.decision.lock();
        if !self.is_live(token) {
            return false;
        }
        slot.label = label;
        true
    }

    // ── reads ─────────────────────────────────────────────────────────────

    pub fn decision(&self) -> Decision { *self.decision.lock() }

    pub fn energy(&self) -> ChannelEnergy { *self.energy.lock() }

    pub fn cycles(&self) -> u64 { self.cycles.load(Ordering::Acquire) }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            gesture:  self.gesture(),
            decision: self.decision(),
            energy:   self.energy(),
            cycles:   self.cycles(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
