//! Per-frame pose easing and idle motion.
//!
//! Every render tick moves each joint a fixed fraction of the way toward
//! the target for the currently selected gesture:
//!
//! ```text
//!   angle ← angle + (target − angle) · easing
//! ```
//!
//! The error therefore shrinks by `(1 − easing)` per tick: geometric decay,
//! no overshoot, never exactly zero.  Selecting a gesture only changes the
//! target, so re-selecting the active one changes nothing at all.

use std::time::Duration;

use emg_stream::Gesture;
use serde::{Deserialize, Serialize};

use crate::hand::{joint_target, pose_target, Finger, HandModel, IdleOffset, FINGER_COUNT};

/// Animation tuning, read from the `[animation]` config table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Fraction of the remaining gap closed per tick, in (0, 1].
    pub easing:         f32,
    /// Peak vertical bob of the whole hand.
    pub bob_amplitude:  f32,
    /// Bob angular rate in radians per second of wall-clock time.
    pub bob_rate:       f32,
    /// Yaw added per tick.
    pub spin_per_tick:  f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            easing:        0.15,
            bob_amplitude: 0.15,
            bob_rate:      1.0,
            spin_per_tick: 0.002,
        }
    }
}

/// Owns the [`HandModel`] and is its only writer.
pub struct Animator {
    hand:   HandModel,
    easing: f32,
    config: AnimationConfig,
    ticks:  u64,
}

impl Animator {
    pub fn new(config: AnimationConfig, start: Gesture) -> Self {
        let easing = if config.easing.is_finite() {
            config.easing.clamp(f32::EPSILON, 1.0)
        } else {
            AnimationConfig::default().easing
        };
        Animator { hand: HandModel::new(start), easing, config, ticks: 0 }
    }

    /// Advance one render tick toward `gesture`'s pose.  `now` is wall-clock
    /// time since the view opened and drives the idle bob.
    pub fn tick(&mut self, gesture: Gesture, now: Duration) {
        let k = self.easing;
        for chain in self.hand.fingers_mut().iter_mut() {
            let finger = chain.finger();
            for (j, joint) in chain.joints_mut().iter_mut().enumerate() {
                let target = joint_target(gesture, finger, j);
                let angle  = joint.angle();
                joint.set_angle(angle + (target - angle) * k);
            }
        }

        let idle = self.hand.idle();
        self.hand.set_idle(IdleOffset {
            bob: (now.as_secs_f32() * self.config.bob_rate).sin() * self.config.bob_amplitude,
            yaw: idle.yaw + self.config.spin_per_tick,
        });
        self.ticks += 1;
    }

    pub fn hand(&self) -> &HandModel { &self.hand }

    pub fn ticks(&self) -> u64 { self.ticks }

    pub fn root_angles(&self) -> [f32; FINGER_COUNT] { self.hand.root_angles() }

    /// Largest root-joint distance from `gesture`'s pose.
    pub fn max_root_error(&self, gesture: Gesture) -> f32 {
        Finger::ALL
            .iter()
            .map(|&f| (self.hand.finger(f).root_angle() - pose_target(gesture, f)).abs())
            .fold(0.0, f32::max)
    }

    /// Largest distance over all fifteen joints.
    pub fn max_joint_error(&self, gesture: Gesture) -> f32 {
        let mut worst = 0.0f32;
        for chain in self.hand.fingers() {
            for (j, joint) in chain.joints().iter().enumerate() {
                let err = (joint.angle() - joint_target(gesture, chain.finger(), j)).abs();
                worst = worst.max(err);
            }
        }
        worst
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::JOINTS_PER_FINGER;

    fn frame(n: u64) -> Duration { Duration::from_millis(16 * n) }

    fn all_angles(a: &Animator) -> Vec<f32> {
        a.hand()
            .fingers()
            .iter()
            .flat_map(|c| c.joints().iter().map(|j| j.angle()))
            .collect()
    }

    #[test]
    fn error_decays_geometrically_without_overshoot() {
        let mut a = Animator::new(AnimationConfig::default(), Gesture::Open);
        let target = Gesture::Fist;

        let mut prev = a.max_joint_error(target);
        for n in 0..40 {
            a.tick(target, frame(n));
            let err = a.max_joint_error(target);
            assert!(err < prev, "tick {}: {} !< {}", n, err, prev);
            assert!(((err / prev) - 0.85).abs() < 1e-3, "ratio {}", err / prev);
            prev = err;
        }

        // Approaching from below: every joint stays on its starting side.
        for chain in a.hand().fingers() {
            for (j, joint) in chain.joints().iter().enumerate() {
                assert!(joint.angle() <= joint_target(target, chain.finger(), j) + 1e-6);
            }
        }
    }

    #[test]
    fn no_overshoot_from_above() {
        let mut a = Animator::new(AnimationConfig::default(), Gesture::Fist);
        for n in 0..100 {
            a.tick(Gesture::Open, frame(n));
            for f in Finger::ALL {
                assert!(a.hand().finger(f).root_angle() >= pose_target(Gesture::Open, f) - 1e-6);
            }
        }
    }

    #[test]
    fn fist_converges_in_sixty_ticks() {
        let mut a = Animator::new(AnimationConfig::default(), Gesture::Rest);
        for n in 0..60 {
            a.tick(Gesture::Fist, frame(n));
        }
        assert!(a.max_root_error(Gesture::Fist) < 1e-3);
        let roots = a.root_angles();
        assert!(roots[1..].iter().all(|&r| roots[0] < r));
    }

    #[test]
    fn idle_motion_runs_regardless_of_gesture() {
        let mut a = Animator::new(AnimationConfig::default(), Gesture::Rest);
        // Already at target: joints stay put, idle motion does not.
        let angles = all_angles(&a);
        for n in 0..100 {
            a.tick(Gesture::Rest, frame(n));
        }
        assert_eq!(all_angles(&a), angles);
        assert!((a.hand().idle().yaw - 0.2).abs() < 1e-4);
        assert_eq!(a.ticks(), 100);

        a.tick(Gesture::Rest, Duration::from_secs_f32(std::f32::consts::FRAC_PI_2));
        assert!((a.hand().idle().bob - 0.15).abs() < 1e-4);
    }

    #[test]
    fn bad_easing_is_clamped() {
        let cfg = AnimationConfig { easing: 4.0, ..AnimationConfig::default() };
        let mut a = Animator::new(cfg, Gesture::Rest);
        a.tick(Gesture::Fist, frame(0));
        assert!(a.max_joint_error(Gesture::Fist) < 1e-6);

        let cfg = AnimationConfig { easing: f32::NAN, ..AnimationConfig::default() };
        let mut a = Animator::new(cfg, Gesture::Rest);
        a.tick(Gesture::Fist, frame(0));
        assert!(a.max_root_error(Gesture::Fist) > 1.0);
    }

    #[test]
    fn every_joint_moves() {
        let mut a = Animator::new(AnimationConfig::default(), Gesture::Rest);
        let before = all_angles(&a);
        a.tick(Gesture::Fist, frame(0));
        let after = all_angles(&a);
        assert_eq!(after.len(), FINGER_COUNT * JOINTS_PER_FINGER);
        assert!(before.iter().zip(&after).all(|(b, a)| a > b));
    }
}
