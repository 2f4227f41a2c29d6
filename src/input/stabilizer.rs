//! Stabilization buffer for progress samples
//!
//! Keeps the last few accepted samples and blends their median with a
//! recency-weighted average. The median resists single outliers; the
//! weighted average keeps the estimate moving when input really changes.

use std::collections::VecDeque;
use tracing::trace;

use crate::config::StabilizationConfig;

/// Bounded history of recent progress samples
#[derive(Debug, Clone)]
pub struct StabilizationBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
    epsilon: f64,
    median_weight: f64,
}

impl StabilizationBuffer {
    pub fn new(config: &StabilizationConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            epsilon: config.epsilon,
            median_weight: config.median_weight.clamp(0.0, 1.0),
        }
    }

    /// Append a sample, evicting the oldest when full
    ///
    /// Returns false when the sample was dropped as noise (within epsilon of
    /// the most recent sample) or is not a number.
    pub fn push(&mut self, sample: f64) -> bool {
        if sample.is_nan() {
            return false;
        }
        let sample = sample.clamp(0.0, 1.0);

        if let Some(&latest) = self.samples.back() {
            if (sample - latest).abs() < self.epsilon {
                trace!("Stabilizer: dropping {:.3} (within epsilon of {:.3})", sample, latest);
                return false;
            }
        }

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        true
    }

    /// Blended estimate of the buffered samples
    ///
    /// 0 when empty, the sample itself when there is only one.
    pub fn estimate(&self) -> f64 {
        match self.samples.len() {
            0 => 0.0,
            1 => self.samples[0],
            _ => {
                let median = self.median();
                let weighted = self.weighted_average();
                self.median_weight * median + (1.0 - self.median_weight) * weighted
            }
        }
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    fn median(&self) -> f64 {
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    // Oldest sample has weight 1, newest has weight len
    fn weighted_average(&self) -> f64 {
        let (sum, total) = self
            .samples
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sum, total), (i, &sample)| {
                let weight = (i + 1) as f64;
                (sum + weight * sample, total + weight)
            });
        sum / total
    }
}

impl Default for StabilizationBuffer {
    fn default() -> Self {
        Self::new(&StabilizationConfig::default())
    }
}
