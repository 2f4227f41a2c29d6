//! Raw input conditioning
//!
//! Turns jittery pointer positions into accepted progress samples:
//! [`velocity`] gates fast motion, [`progress`] maps positions to eased
//! progress, and [`stabilizer`] blends the accepted samples.

pub mod progress;
pub mod stabilizer;
pub mod velocity;

pub use progress::{sample_progress, ElementBounds};
pub use stabilizer::StabilizationBuffer;
pub use velocity::{Velocity, VelocityTracker};
