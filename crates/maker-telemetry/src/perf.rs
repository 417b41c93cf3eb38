//! Rolling tick duration tracker.

use std::collections::VecDeque;

const WINDOW: usize = 100;

/// Keeps the last [`WINDOW`] tick durations for the health report.
#[derive(Debug, Default)]
pub struct PerfTracker {
    samples: VecDeque<f64>,
}

impl PerfTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ms(&mut self, ms: f64) {
        if self.samples.len() == WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(ms);
    }

    /// Mean over the window, 0.0 before the first sample.
    pub fn avg_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
