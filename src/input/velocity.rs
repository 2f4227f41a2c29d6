//! Pointer velocity tracking
//!
//! Derives instantaneous speed from consecutive timestamped positions. Speed
//! above the threshold marks fast motion, during which progress samples are
//! rejected so a quick swipe across the element cannot flash the portal.

use crate::platform::Millis;

/// Instantaneous pointer velocity in px/ms
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub fn speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

#[derive(Debug, Clone, Copy)]
struct PointerSample {
    x: f64,
    y: f64,
    at: Millis,
}

/// Velocity tracker over the last recorded position
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    last: Option<PointerSample>,
    threshold: f64,
}

impl VelocityTracker {
    /// Create a tracker flagging speeds above `threshold` px/ms
    pub fn new(threshold: f64) -> Self {
        Self {
            last: None,
            threshold,
        }
    }

    /// Record a position and return the velocity since the previous one
    ///
    /// The first position after a reset has zero velocity. Samples sharing
    /// a timestamp with (or older than) the previous one are measured over
    /// 1 ms, so a jump within the same millisecond reads as fast.
    pub fn record(&mut self, x: f64, y: f64, at: Millis) -> Velocity {
        let velocity = match self.last {
            Some(prev) => {
                let dt = at.saturating_sub(prev.at).max(1) as f64;
                Velocity {
                    vx: (x - prev.x) / dt,
                    vy: (y - prev.y) / dt,
                }
            }
            None => Velocity::default(),
        };

        self.last = Some(PointerSample {
            x,
            y,
            at: at.max(self.last.map_or(0, |prev| prev.at)),
        });
        velocity
    }

    /// Speed above the threshold
    pub fn is_fast(&self, velocity: &Velocity) -> bool {
        velocity.speed() > self.threshold
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Forget the previous position
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_still() {
        let mut tracker = VelocityTracker::new(0.08);
        let velocity = tracker.record(10.0, 10.0, 5);

        assert_eq!(velocity, Velocity::default());
        assert!(!tracker.is_fast(&velocity));
    }

    #[test]
    fn test_velocity_components() {
        let mut tracker = VelocityTracker::new(0.08);
        tracker.record(0.0, 0.0, 0);
        let velocity = tracker.record(30.0, -40.0, 10);

        assert_eq!(velocity.vx, 3.0);
        assert_eq!(velocity.vy, -4.0);
        assert_eq!(velocity.speed(), 5.0);
    }

    #[test]
    fn test_fast_swipe_is_gated() {
        let mut tracker = VelocityTracker::new(0.08);
        tracker.record(0.0, 0.0, 0);
        let velocity = tracker.record(100.0, 0.0, 10);

        assert!(tracker.is_fast(&velocity));
    }

    #[test]
    fn test_slow_drift_is_accepted() {
        let mut tracker = VelocityTracker::new(0.08);
        tracker.record(0.0, 0.0, 0);
        let velocity = tracker.record(100.0, 0.0, 2000);

        assert!(!tracker.is_fast(&velocity));
    }

    #[test]
    fn test_same_timestamp_reads_as_fast() {
        let mut tracker = VelocityTracker::new(0.08);
        tracker.record(0.0, 0.0, 100);
        let velocity = tracker.record(5.0, 0.0, 100);

        assert_eq!(velocity.vx, 5.0);
        assert!(tracker.is_fast(&velocity));
    }

    #[test]
    fn test_reset_forgets_previous() {
        let mut tracker = VelocityTracker::new(0.08);
        tracker.record(0.0, 0.0, 0);
        tracker.reset();

        let velocity = tracker.record(500.0, 500.0, 1);
        assert_eq!(velocity.speed(), 0.0);
    }
}
