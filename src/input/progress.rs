//! Pointer position to activation progress
//!
//! Progress grows toward the element centre: 1 at the centre, 0 at the edge
//! and anywhere outside. The raw value is eased before it is buffered.

use serde::{Deserialize, Serialize};

/// Element rectangle in the same coordinate space as pointer positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementBounds {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Elliptical distance from the centre, 1.0 on the edge
    ///
    /// Returns None for degenerate bounds.
    pub fn normalized_distance(&self, x: f64, y: f64) -> Option<f64> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return None;
        }
        let (cx, cy) = self.center();
        let dx = (x - cx) / (self.width / 2.0);
        let dy = (y - cy) / (self.height / 2.0);
        Some(dx.hypot(dy))
    }
}

/// Uneased progress for a position, in [0, 1]
pub fn raw_progress(x: f64, y: f64, bounds: &ElementBounds) -> f64 {
    match bounds.normalized_distance(x, y) {
        Some(distance) if distance.is_finite() => (1.0 - distance).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Ease-out cubic: quick initial response, settling near the centre
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Eased progress sample for a position
pub fn sample_progress(x: f64, y: f64, bounds: &ElementBounds) -> f64 {
    ease_out_cubic(raw_progress(x, y, bounds))
}
