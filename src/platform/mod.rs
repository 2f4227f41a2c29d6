//! Host capabilities injected into the engine
//!
//! The engine never sleeps or spawns. Everything it waits for is requested
//! through [`Platform`]: a wall-clock timer per [`TimerPurpose`], one deferred
//! frame callback, and a haptic pulse. The host calls back into
//! `PortalEngine::on_timer` and `PortalEngine::on_frame` when those fire.

mod agenda;
pub mod manual;

use serde::{Deserialize, Serialize};

pub use agenda::{Agenda, Wakeup};
pub use manual::{Commit, ManualPlatform, Simulation};

/// Milliseconds on the host's monotonic clock
pub type Millis = u64;

/// The three named delays owned by the transition controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPurpose {
    /// Hover/touch must persist this long before arming
    ActivationDelay,
    /// Fixed delay from arming to a stable reveal
    Completion,
    /// Delay from retiring back to idle
    DeactivationDelay,
}

impl TimerPurpose {
    pub const ALL: [TimerPurpose; 3] = [
        TimerPurpose::ActivationDelay,
        TimerPurpose::Completion,
        TimerPurpose::DeactivationDelay,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            TimerPurpose::ActivationDelay => 0,
            TimerPurpose::Completion => 1,
            TimerPurpose::DeactivationDelay => 2,
        }
    }
}

impl std::fmt::Display for TimerPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerPurpose::ActivationDelay => write!(f, "activation-delay"),
            TimerPurpose::Completion => write!(f, "completion"),
            TimerPurpose::DeactivationDelay => write!(f, "deactivation-delay"),
        }
    }
}

/// Physical feedback patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticPattern {
    /// Short tick on reveal completion
    Light,
}

impl HapticPattern {
    /// Vibration length for hosts that only take a duration
    pub fn duration_ms(self) -> Millis {
        match self {
            HapticPattern::Light => 10,
        }
    }
}

/// Host capability used by the engine
pub trait Platform {
    /// Current monotonic time
    fn now(&self) -> Millis;

    /// Ask for one `on_frame` callback at the next display refresh
    fn request_frame(&mut self);

    /// Withdraw an outstanding frame request
    fn cancel_frame(&mut self);

    /// Arm (or re-arm) the timer for `purpose` to fire at `deadline`
    fn set_timer(&mut self, purpose: TimerPurpose, deadline: Millis);

    /// Disarm the timer for `purpose`
    fn clear_timer(&mut self, purpose: TimerPurpose);

    /// Emit a haptic pulse
    fn haptic_pulse(&mut self, pattern: HapticPattern);
}

/// Vibration primitive supplied by a real host
pub trait HapticEmitter: Send {
    fn pulse(&mut self, pattern: HapticPattern);
}

impl<F> HapticEmitter for F
where
    F: FnMut(HapticPattern) + Send,
{
    fn pulse(&mut self, pattern: HapticPattern) {
        self(pattern)
    }
}
