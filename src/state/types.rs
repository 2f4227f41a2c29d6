//! Portal state type definitions

use serde::{Deserialize, Serialize};

use super::patch::PortalPatch;

/// Visibility hint published while the portal is idle
pub const IDLE_VISIBILITY: f64 = 0.25;

/// Input discipline governing one engine instance
///
/// Fixed for the lifetime of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// Enter/leave with an activation delay
    #[default]
    Hover,
    /// Touch start/end with an activation delay
    Touch,
    /// Click toggles immediately
    Click,
}

impl std::fmt::Display for ActivationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivationMode::Hover => write!(f, "hover"),
            ActivationMode::Touch => write!(f, "touch"),
            ActivationMode::Click => write!(f, "click"),
        }
    }
}

/// Snapshot of the portal as seen by the consumer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalState {
    /// The portal has begun revealing
    pub is_active: bool,
    /// The portal has completed its reveal and is stable
    pub is_fully_activated: bool,
    /// Activation or deactivation is mid-flight
    pub is_transitioning: bool,
    /// Rendering hint for partial reveal, in [0, 1]
    pub visibility: f64,
    /// Smoothed, eased activation measure, in [0, 1]
    pub activation_progress: f64,
    /// Input discipline of the owning engine
    pub activation_mode: ActivationMode,
}

impl PortalState {
    /// Resting state for a freshly created engine
    pub fn idle(mode: ActivationMode) -> Self {
        Self {
            is_active: false,
            is_fully_activated: false,
            is_transitioning: false,
            visibility: IDLE_VISIBILITY,
            activation_progress: 0.0,
            activation_mode: mode,
        }
    }

    /// Apply a patch in place
    ///
    /// Fully activated is only kept while active, and the float fields are
    /// clamped to [0, 1]. Returns true if any field changed.
    pub fn apply(&mut self, patch: &PortalPatch) -> bool {
        let before = *self;

        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(full) = patch.is_fully_activated {
            self.is_fully_activated = full;
        }
        if let Some(transitioning) = patch.is_transitioning {
            self.is_transitioning = transitioning;
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = unit(visibility);
        }
        if let Some(progress) = patch.activation_progress {
            self.activation_progress = unit(progress);
        }
        self.is_fully_activated &= self.is_active;

        *self != before
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_baseline() {
        let state = PortalState::idle(ActivationMode::Touch);

        assert!(!state.is_active);
        assert!(!state.is_fully_activated);
        assert_eq!(state.visibility, IDLE_VISIBILITY);
        assert_eq!(state.activation_progress, 0.0);
        assert_eq!(state.activation_mode, ActivationMode::Touch);
    }

    #[test]
    fn test_apply_reports_change() {
        let mut state = PortalState::idle(ActivationMode::Hover);

        assert!(state.apply(&PortalPatch::arming()));
        assert!(state.is_active);
        assert!(state.is_transitioning);

        // Same patch again changes nothing
        assert!(!state.apply(&PortalPatch::arming()));
    }

    #[test]
    fn test_fully_activated_requires_active() {
        let mut state = PortalState::idle(ActivationMode::Hover);

        state.apply(&PortalPatch {
            is_fully_activated: Some(true),
            ..PortalPatch::default()
        });

        assert!(!state.is_fully_activated);
    }

    #[test]
    fn test_apply_clamps_floats() {
        let mut state = PortalState::idle(ActivationMode::Hover);

        state.apply(&PortalPatch {
            visibility: Some(1.7),
            activation_progress: Some(f64::NAN),
            ..PortalPatch::default()
        });

        assert_eq!(state.visibility, 1.0);
        assert_eq!(state.activation_progress, 0.0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(PortalState::idle(ActivationMode::Click)).unwrap();

        assert_eq!(json["isActive"], false);
        assert_eq!(json["activationMode"], "click");
    }
}
