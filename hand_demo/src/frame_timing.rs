//! Rolling render-tick statistics for the status bar.
//!
//! Two numbers per frame: the interval since the previous frame (drives the
//! fps readout) and the time spent inside the tick itself (checked against
//! the frame budget).

use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug)]
pub struct FrameTiming {
    intervals:    VecDeque<f32>,
    work:         VecDeque<f32>,
    window_size:  usize,
    budget_ms:    f32,
    last_frame:   Option<Duration>,
    total_frames: u64,
    missed:       u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub fps:          f32,
    pub work_p50_ms:  f32,
    pub work_max_ms:  f32,
    pub total_frames: u64,
    /// Ticks whose own work exceeded the budget.
    pub missed:       u64,
}

impl Default for FrameTiming {
    fn default() -> Self { Self::new(120, 16.0) }
}

impl FrameTiming {
    pub fn new(window_size: usize, budget_ms: f32) -> Self {
        let window_size = window_size.max(1);
        FrameTiming {
            intervals: VecDeque::with_capacity(window_size),
            work:      VecDeque::with_capacity(window_size),
            window_size,
            budget_ms,
            last_frame: None,
            total_frames: 0,
            missed: 0,
        }
    }

    /// Record a frame that started at `start` (clock time) and took `work`.
    pub fn record(&mut self, start: Duration, work: Duration) {
        if let Some(prev) = self.last_frame {
            let dt = start.saturating_sub(prev).as_secs_f32() * 1000.0;
            push(&mut self.intervals, dt, self.window_size);
        }
        self.last_frame = Some(start);

        let work_ms = work.as_secs_f32() * 1000.0;
        push(&mut self.work, work_ms, self.window_size);

        self.total_frames += 1;
        if work_ms > self.budget_ms {
            self.missed += 1;
        }
    }

    pub fn stats(&self) -> FrameStats {
        let mean_dt = if self.intervals.is_empty() {
            0.0
        } else {
            self.intervals.iter().sum::<f32>() / self.intervals.len() as f32
        };

        let mut sorted: Vec<f32> = self.work.iter().copied().collect();
        sorted.sort_by(f32::total_cmp);

        FrameStats {
            fps:          if mean_dt > 0.0 { 1000.0 / mean_dt } else { 0.0 },
            work_p50_ms:  sorted.get(sorted.len() / 2).copied().unwrap_or(0.0),
            work_max_ms:  sorted.last().copied().unwrap_or(0.0),
            total_frames: self.total_frames,
            missed:       self.missed,
        }
    }
}

fn push(samples: &mut VecDeque<f32>, v: f32, cap: usize) {
    if samples.len() == cap {
        samples.pop_front();
    }
    samples.push_back(v);
}
