//! Per-channel features over one `[WINDOW_LEN, CHANNELS]` window.
//!
//! Layout of the feature vector:
//!
//! | Index | Feature |
//! |---|---|
//! | `0..CHANNELS` | mean amplitude of each channel |
//! | `CHANNELS..2·CHANNELS` | oscillation rate of each channel (rad/sample) |

use std::f32::consts::PI;

use emg_stream::CHANNELS;
use ndarray::{ArrayView1, ArrayView2};

/// Length of the vector returned by [`extract_features`].
pub const FEATURE_COUNT: usize = 2 * CHANNELS;

/// Fraction of the channel's range used as the hysteresis half-band.
const HYSTERESIS: f32 = 0.15;

/// Compute the feature vector for a `[time, channel]` view.
pub fn extract_features(window: ArrayView2<'_, f32>) -> [f32; FEATURE_COUNT] {
    let mut out = [0.0f32; FEATURE_COUNT];
    for (j, col) in window.columns().into_iter().take(CHANNELS).enumerate() {
        out[j]            = col.mean().unwrap_or(0.0);
        out[CHANNELS + j] = oscillation_rate(col);
    }
    out
}

/// Estimate the angular frequency of a rectified sinusoid.
///
/// `|sin(i·f)|` rises through its mean once every `π / f` samples, so
/// counting upward crossings (with hysteresis against additive noise) and
/// scaling by `π / len` recovers `f`.
pub fn oscillation_rate(col: ArrayView1<'_, f32>) -> f32 {
    let len = col.len();
    if len < 2 {
        return 0.0;
    }
    let mean = col.mean().unwrap_or(0.0);
    let (lo, hi) = col.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    let band  = (hi - lo) * HYSTERESIS;
    let upper = mean + band;
    let lower = mean - band;

    let mut armed     = col[0] < lower;
    let mut crossings = 0usize;
    for &v in col.iter() {
        if armed && v > upper {
            crossings += 1;
            armed = false;
        } else if v < lower {
            armed = true;
        }
    }
    crossings as f32 * PI / len as f32
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn rate_recovers_clean_frequency() {
        for &f in &[0.13f32, 0.29, 0.53] {
            let col = Array1::from_iter((0..2000).map(|i| ((i as f32) * f).sin().abs()));
            let est = oscillation_rate(col.view());
            assert!((est - f).abs() < 0.02, "f={} est={}", f, est);
        }
    }

    #[test]
    fn flat_channel_has_zero_rate() {
        let col = Array1::from_elem(200, 0.4f32);
        assert_eq!(oscillation_rate(col.view()), 0.0);
    }

    #[test]
    fn features_layout() {
        let mut w = Array2::<f32>::zeros((200, CHANNELS));
        w.column_mut(2).fill(0.5);
        let f = extract_features(w.view());
        assert_eq!(f[2], 0.5);
        assert_eq!(f[0], 0.0);
        assert_eq!(f[CHANNELS + 2], 0.0);
    }
}
