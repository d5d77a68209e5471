//! The articulated hand: a palm, a wrist and five three-joint fingers.
//!
//! Geometry is fixed at construction.  The only mutable state is each
//! joint's flexion angle and the whole-hand idle offset, and both are
//! written exclusively by [`crate::animator::Animator`].
//!
//! Coordinates are hand-local: +y runs from wrist to fingertips, +x from
//! thumb side to pinky side, +z out of the palm toward the viewer.

use emg_stream::Gesture;
use nalgebra::Vector3;

pub const FINGER_COUNT:      usize = 5;
pub const JOINTS_PER_FINGER: usize = 3;

/// Share of a finger's pose value applied at each joint, root to tip.
pub const CURL_SHARES: [f32; JOINTS_PER_FINGER] = [1.0, 0.35, 0.2];

// ── Colours ─────────────────────────────────────────────────────────────────

pub const PALM_COLOR:   u32 = 0xFFE2E8F0;
pub const NAVY:         u32 = 0xFF1A237E;
pub const JOINT_COLOR:  u32 = 0xFF334155;
pub const THUMB_COLOR:  u32 = 0xFF00BCD4;
pub const FINGER_COLOR: u32 = 0xFFFFFFFF;

pub const JOINT_RADIUS: f32 = 0.22;

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; FINGER_COUNT] =
        [Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    pub fn index(self) -> usize { self as usize }

    pub fn label(self) -> &'static str {
        match self {
            Finger::Thumb  => "Thumb",
            Finger::Index  => "Index",
            Finger::Middle => "Middle",
            Finger::Ring   => "Ring",
            Finger::Pinky  => "Pinky",
        }
    }
}

/// Root-joint flexion target (radians) for `finger` under gesture `g`.
/// Positive curls toward the palm, negative extends past straight.
pub fn pose_target(g: Gesture, finger: Finger) -> f32 {
    match (g, finger) {
        (Gesture::Rest, _) => 0.2,

        (Gesture::Fist, Finger::Thumb) => 1.1,
        (Gesture::Fist, _)             => 1.6,

        (Gesture::Open, _) => -0.2,

        (Gesture::Pinch, Finger::Thumb | Finger::Index) => 1.3,
        (Gesture::Pinch, _)                             => 0.1,

        (Gesture::Point, Finger::Index) => -0.1,
        (Gesture::Point, _)             => 1.6,
    }
}

/// Target angle for joint `joint` (0 = root) of `finger`.
pub fn joint_target(g: Gesture, finger: Finger, joint: usize) -> f32 {
    pose_target(g, finger) * CURL_SHARES.get(joint).copied().unwrap_or(0.0)
}

// ════════════════════════════════════════════════════════════════════════════
// Geometry
// ════════════════════════════════════════════════════════════════════════════

/// Immutable rest geometry of one finger segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointGeometry {
    pub length: f32,
    /// Segment radius at the joint end.
    pub radius: f32,
    /// Segment radius at the far end (narrower on the tip).
    pub tip_radius: f32,
    pub color:  u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Joint {
    angle:    f32,
    geometry: JointGeometry,
}

impl Joint {
    fn new(geometry: JointGeometry, angle: f32) -> Self {
        Joint { angle, geometry }
    }

    pub fn angle(&self) -> f32 { self.angle }
    pub fn geometry(&self) -> &JointGeometry { &self.geometry }

    pub(crate) fn set_angle(&mut self, angle: f32) { self.angle = angle; }
}

/// One finger: an origin on the palm, a fixed roll about the palm normal
/// and three joints ordered root to tip.
#[derive(Clone, Debug, PartialEq)]
pub struct FingerChain {
    finger: Finger,
    origin: Vector3<f32>,
    roll:   f32,
    joints: [Joint; JOINTS_PER_FINGER],
}

impl FingerChain {
    fn new(finger: Finger, origin: Vector3<f32>, roll: f32, color: u32, start: Gesture) -> Self {
        const LENGTHS: [f32; JOINTS_PER_FINGER] = [0.9, 0.7, 0.6];
        let joints = std::array::from_fn(|j| {
            let tip = j + 1 == JOINTS_PER_FINGER;
            let geometry = JointGeometry {
                length:     LENGTHS[j],
                radius:     0.2,
                tip_radius: if tip { 0.12 } else { 0.18 },
                color,
            };
            Joint::new(geometry, joint_target(start, finger, j))
        });
        FingerChain { finger, origin, roll, joints }
    }

    pub fn finger(&self) -> Finger { self.finger }
    pub fn origin(&self) -> Vector3<f32> { self.origin }
    pub fn roll(&self) -> f32 { self.roll }
    pub fn joints(&self) -> &[Joint; JOINTS_PER_FINGER] { &self.joints }
    pub fn root_angle(&self) -> f32 { self.joints[0].angle }

    pub(crate) fn joints_mut(&mut self) -> &mut [Joint; JOINTS_PER_FINGER] { &mut self.joints }
}

/// Axis-aligned box in hand space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxPart {
    pub center: Vector3<f32>,
    pub size:   Vector3<f32>,
    pub color:  u32,
}

/// Tapered cylinder along hand-space y.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CylinderPart {
    pub center:        Vector3<f32>,
    pub height:        f32,
    pub top_radius:    f32,
    pub bottom_radius: f32,
    pub color:         u32,
}

/// Whole-hand liveliness motion, independent of gesture.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IdleOffset {
    /// Vertical translation.
    pub bob: f32,
    /// Accumulated yaw on top of the base orientation.
    pub yaw: f32,
}

// ════════════════════════════════════════════════════════════════════════════
// HandModel
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct HandModel {
    palm:        BoxPart,
    palm_detail: BoxPart,
    wrist:       CylinderPart,
    fingers:     [FingerChain; FINGER_COUNT],
    idle:        IdleOffset,
    base_pitch:  f32,
    base_yaw:    f32,
}

impl HandModel {
    /// Build the hand already posed for `start`.
    pub fn new(start: Gesture) -> Self {
        let v = Vector3::new;
        let fingers = [
            FingerChain::new(Finger::Thumb,  v(-1.3, -0.5, 0.2), 0.8, THUMB_COLOR,  start),
            FingerChain::new(Finger::Index,  v(-0.9,  1.4, 0.0), 0.0, FINGER_COLOR, start),
            FingerChain::new(Finger::Middle, v(-0.1,  1.5, 0.0), 0.0, FINGER_COLOR, start),
            FingerChain::new(Finger::Ring,   v( 0.7,  1.4, 0.0), 0.0, FINGER_COLOR, start),
            FingerChain::new(Finger::Pinky,  v( 1.3,  1.1, 0.0), 0.0, FINGER_COLOR, start),
        ];

        HandModel {
            palm: BoxPart {
                center: Vector3::zeros(),
                size:   v(2.2, 2.8, 0.6),
                color:  PALM_COLOR,
            },
            palm_detail: BoxPart {
                center: v(0.0, 0.0, 0.1),
                size:   v(1.5, 0.4, 0.7),
                color:  NAVY,
            },
            wrist: CylinderPart {
                center:        v(0.0, -2.0, 0.0),
                height:        1.2,
                top_radius:    0.8,
                bottom_radius: 1.0,
                color:         NAVY,
            },
            fingers,
            idle: IdleOffset::default(),
            base_pitch: -0.2,
            base_yaw:   -0.3,
        }
    }

    pub fn palm(&self) -> &BoxPart { &self.palm }
    pub fn palm_detail(&self) -> &BoxPart { &self.palm_detail }
    pub fn wrist(&self) -> &CylinderPart { &self.wrist }
    pub fn fingers(&self) -> &[FingerChain; FINGER_COUNT] { &self.fingers }
    pub fn finger(&self, f: Finger) -> &FingerChain { &self.fingers[f.index()] }
    pub fn idle(&self) -> IdleOffset { self.idle }

    /// Fixed whole-hand orientation before idle yaw: (pitch about x, yaw about y).
    pub fn base_orientation(&self) -> (f32, f32) { (self.base_pitch, self.base_yaw) }

    pub fn root_angles(&self) -> [f32; FINGER_COUNT] {
        std::array::from_fn(|i| self.fingers[i].root_angle())
    }

    pub fn joint_count(&self) -> usize { FINGER_COUNT * JOINTS_PER_FINGER }

    pub(crate) fn fingers_mut(&mut self) -> &mut [FingerChain; FINGER_COUNT] { &mut self.fingers }
    pub(crate) fn set_idle(&mut self, idle: IdleOffset) { self.idle = idle; }
}

impl Default for HandModel {
    fn default() -> Self { Self::new(Gesture::Rest) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
