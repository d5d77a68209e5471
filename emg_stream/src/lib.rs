//! # emg_stream
//!
//! Synthetic four-channel surface-EMG windows whose statistical shape is
//! driven by a selected hand [`Gesture`].
//!
//! Every call to [`SignalSimulator::generate`] draws a fresh
//! `WINDOW_LEN × CHANNELS` window plus a coarse per-channel energy vector
//! for display.  Windows are never mutated in place; each one is meant to be
//! consumed once (usually via [`SignalWindow::into_tensor`]) and dropped.
//!
//! ## Signal shape
//!
//! | Gesture | Primary channels | Amplitude |
//! |---|---|---|
//! | REST  |:      | 0.05 everywhere |
//! | FIST  | 0, 3   | 0.8 primary / 0.3 other, + jitter |
//! | OPEN  | 0, 1   | 〃 |
//! | PINCH | 1, 2   | 〃 |
//! | POINT | 3      | 〃 |
//!
//! Each sample is `|sin(i·f) · amp| + noise`, so samples are never negative.
//!
//! ## Quick start
//!
//! ```rust
//! use emg_stream::{Gesture, SignalSimulator, CHANNELS, WINDOW_LEN};
//!
//! let mut sim = SignalSimulator::with_seed(7);
//! let out = sim.generate(Gesture::Fist);
//! assert_eq!(out.window.shape(), [WINDOW_LEN, CHANNELS]);
//!
//! let tensor = out.window.into_tensor();
//! assert_eq!(tensor.shape(), &[1, WINDOW_LEN, CHANNELS]);
//! ```

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Fixed shape
// ════════════════════════════════════════════════════════════════════════════

/// Number of electrode channels in every window.
pub const CHANNELS: usize = 4;

/// Number of time steps in every window.
pub const WINDOW_LEN: usize = 200;

/// Number of gesture classes.
pub const GESTURE_COUNT: usize = 5;

// ════════════════════════════════════════════════════════════════════════════
// Gesture
// ════════════════════════════════════════════════════════════════════════════

/// One of the five hand poses the demo recognises and animates.
///
/// The discriminant is the stable class index used by the classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Gesture {
    #[default]
    Rest  = 0,
    Fist  = 1,
    Open  = 2,
    Pinch = 3,
    Point = 4,
}

impl Gesture {
    /// All gestures in class-index order.
    pub const ALL: [Gesture; GESTURE_COUNT] = [
        Gesture::Rest,
        Gesture::Fist,
        Gesture::Open,
        Gesture::Pinch,
        Gesture::Point,
    ];

    /// Stable class index (0–4).
    pub fn index(self) -> usize { self as usize }

    /// Inverse of [`Gesture::index`].
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Upper-case display label, e.g. `"PINCH"`.
    pub fn label(self) -> &'static str {
        match self {
            Gesture::Rest  => "REST",
            Gesture::Fist  => "FIST",
            Gesture::Open  => "OPEN",
            Gesture::Pinch => "PINCH",
            Gesture::Point => "POINT",
        }
    }

    pub fn is_rest(self) -> bool { self == Gesture::Rest }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned by [`Gesture::from_str`] for an unknown label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseGestureError(pub String);

impl fmt::Display for ParseGestureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown gesture \"{}\" (expected rest, fist, open, pinch or point)", self.0)
    }
}

impl std::error::Error for ParseGestureError {}

impl FromStr for Gesture {
    type Err = ParseGestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Gesture::ALL
            .iter()
            .copied()
            .find(|g| g.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseGestureError(wanted.to_string()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Per-class signal design
// ════════════════════════════════════════════════════════════════════════════

/// True if channel `j` carries the dominant activation for `g`.
///
/// Channel `j` is primary when `g == j + 1` or `g == (j + 2) mod 4`.
/// REST has no primary channel.
pub fn is_primary(g: Gesture, channel: usize) -> bool {
    let gi = g.index();
    gi != 0 && (gi == channel + 1 || gi == (channel + 2) % CHANNELS)
}

/// The primary channels for `g`, in ascending order.
pub fn primary_channels(g: Gesture) -> &'static [usize] {
    const TABLE: [&[usize]; GESTURE_COUNT] = [
        &[],        // REST
        &[0, 3],    // FIST
        &[0, 1],    // OPEN
        &[1, 2],    // PINCH
        &[3],       // POINT
    ];
    TABLE[g.index()]
}

/// Oscillation frequency (radians per sample) used for channel `j` under `g`.
///
/// `7g mod 11` is a permutation over the five classes, so for a fixed
/// channel no two gestures share a frequency.
pub fn channel_frequency(g: Gesture, channel: usize) -> f32 {
    let idx = (g.index() * 7 + channel * 3) % 11;
    0.05 + idx as f32 * 0.08
}

// ════════════════════════════════════════════════════════════════════════════
// SimulatorConfig
// ════════════════════════════════════════════════════════════════════════════

/// Amplitude and noise parameters for [`SignalSimulator`].
///
/// Negative values are treated as zero when drawing, so a bad config can
/// never produce negative samples.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Fixed amplitude for every channel while resting.
    pub rest_amplitude:      f32,
    /// Base amplitude of a primary channel.
    pub primary_amplitude:   f32,
    /// Base amplitude of a non-primary channel.
    pub secondary_amplitude: f32,
    /// Upper bound of the uniform jitter added to non-REST amplitudes.
    pub amplitude_jitter:    f32,
    /// Upper bound of the uniform additive noise on every sample.
    pub sample_noise:        f32,
    /// Display energy (0–1) reported for every channel while resting.
    pub rest_energy:         f32,
    /// Lowest display energy (0–1) while a gesture is held.
    pub active_energy_floor: f32,
    /// Width of the uniform draw above `active_energy_floor`.
    pub active_energy_span:  f32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            rest_amplitude:      0.05,
            primary_amplitude:   0.8,
            secondary_amplitude: 0.3,
            amplitude_jitter:    0.2,
            sample_noise:        0.1,
            rest_energy:         0.1,
            active_energy_floor: 0.4,
            active_energy_span:  0.6,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SignalWindow / ChannelEnergy / Simulation
// ════════════════════════════════════════════════════════════════════════════

/// One `WINDOW_LEN × CHANNELS` block of non-negative samples.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalWindow {
    samples: Array2<f32>,
}

impl SignalWindow {
    pub fn samples(&self) -> &Array2<f32> { &self.samples }

    /// `[WINDOW_LEN, CHANNELS]`.
    pub fn shape(&self) -> [usize; 2] {
        let s = self.samples.shape();
        [s[0], s[1]]
    }

    /// Mean sample value of one channel.
    pub fn channel_mean(&self, channel: usize) -> f32 {
        self.samples
            .column(channel)
            .mean()
            .unwrap_or(0.0)
    }

    /// Mean over every sample in the window.
    pub fn mean_energy(&self) -> f32 {
        self.samples.mean().unwrap_or(0.0)
    }

    /// Consume the window into the `[1, WINDOW_LEN, CHANNELS]` model input.
    pub fn into_tensor(self) -> Array3<f32> {
        self.samples.insert_axis(Axis(0))
    }
}

/// Per-channel display energy on a 0–100 scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelEnergy(pub [f32; CHANNELS]);

impl ChannelEnergy {
    pub fn mean(&self) -> f32 {
        self.0.iter().sum::<f32>() / CHANNELS as f32
    }
}

impl Default for ChannelEnergy {
    /// The idle readout shown before the first simulation tick.
    fn default() -> Self { ChannelEnergy([10.0; CHANNELS]) }
}

/// Output of one simulation tick.
#[derive(Clone, Debug)]
pub struct Simulation {
    pub gesture: Gesture,
    pub window:  SignalWindow,
    pub energy:  ChannelEnergy,
}

// ════════════════════════════════════════════════════════════════════════════
// SignalSimulator
// ════════════════════════════════════════════════════════════════════════════

/// Draws gesture-shaped windows from its own random source.
///
/// ```rust
/// use emg_stream::{Gesture, SignalSimulator, SimulatorConfig};
///
/// let mut sim = SignalSimulator::with_seed(1)
///     .config(SimulatorConfig { sample_noise: 0.0, ..SimulatorConfig::default() });
/// let rest = sim.generate(Gesture::Rest);
/// assert!(rest.window.mean_energy() < 0.06);
/// ```
pub struct SignalSimulator {
    rng:    StdRng,
    config: SimulatorConfig,
}

impl SignalSimulator {
    /// Simulator seeded from the operating system.
    pub fn new() -> Self {
        SignalSimulator {
            rng:    StdRng::from_entropy(),
            config: SimulatorConfig::default(),
        }
    }

    /// Reproducible simulator.
    pub fn with_seed(seed: u64) -> Self {
        SignalSimulator {
            rng:    StdRng::seed_from_u64(seed),
            config: SimulatorConfig::default(),
        }
    }

    /// Replace the amplitude/noise parameters.
    pub fn config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn settings(&self) -> &SimulatorConfig { &self.config }

    /// Draw a fresh window and energy vector for `gesture`.
    pub fn generate(&mut self, gesture: Gesture) -> Simulation {
        let energy = self.draw_energy(gesture);

        let freqs: [f32; CHANNELS] = std::array::from_fn(|j| channel_frequency(gesture, j));
        let noise = self.config.sample_noise.max(0.0);

        let mut samples = Array2::<f32>::zeros((WINDOW_LEN, CHANNELS));
        for ((i, j), v) in samples.indexed_iter_mut() {
            let amp  = self.amplitude(gesture, j);
            let wave = ((i as f32) * freqs[j]).sin() * amp;
            *v = wave.abs() + self.rng.gen::<f32>() * noise;
        }

        Simulation {
            gesture,
            window: SignalWindow { samples },
            energy,
        }
    }

    /// Amplitude for one sample of channel `j`, jitter included.
    fn amplitude(&mut self, gesture: Gesture, channel: usize) -> f32 {
        let c = &self.config;
        if gesture.is_rest() {
            return c.rest_amplitude.max(0.0);
        }
        let base = if is_primary(gesture, channel) {
            c.primary_amplitude
        } else {
            c.secondary_amplitude
        };
        let jitter = c.amplitude_jitter.max(0.0);
        base.max(0.0) + self.rng.gen::<f32>() * jitter
    }

    /// Coarse telemetry energies, independent of the window samples.
    fn draw_energy(&mut self, gesture: Gesture) -> ChannelEnergy {
        let c = self.config.clone();
        let mut out = [0.0f32; CHANNELS];
        for e in out.iter_mut() {
            let level = if gesture.is_rest() {
                c.rest_energy
            } else {
                c.active_energy_floor + self.rng.gen::<f32>() * c.active_energy_span.max(0.0)
            };
            *e = (level * 100.0).clamp(0.0, 100.0);
        }
        ChannelEnergy(out)
    }
}

impl Default for SignalSimulator {
    fn default() -> Self { Self::new() }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
