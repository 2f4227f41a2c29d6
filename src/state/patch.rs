//! Partial state updates merged by the update scheduler

use serde::{Deserialize, Serialize};

use super::types::IDLE_VISIBILITY;

/// Visibility hint gained across the pre-activation progress range
const PROGRESS_VISIBILITY_SPAN: f64 = 0.35;

/// A set of state-field changes not yet committed
///
/// `None` leaves the field untouched. Merging is last-write-wins per field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_fully_activated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_transitioning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_progress: Option<f64>,
}

impl PortalPatch {
    /// Activation has started revealing
    pub fn arming() -> Self {
        Self {
            is_active: Some(true),
            is_transitioning: Some(true),
            visibility: Some(0.6),
            activation_progress: Some(0.8),
            ..Self::default()
        }
    }

    /// Reveal completed
    pub fn stable() -> Self {
        Self {
            is_fully_activated: Some(true),
            is_transitioning: Some(false),
            visibility: Some(1.0),
            activation_progress: Some(1.0),
            ..Self::default()
        }
    }

    /// Retraction has started
    pub fn retiring() -> Self {
        Self {
            is_fully_activated: Some(false),
            is_transitioning: Some(true),
            visibility: Some(0.4),
            activation_progress: Some(0.6),
            ..Self::default()
        }
    }

    /// Back to rest
    pub fn idle() -> Self {
        Self {
            is_active: Some(false),
            is_fully_activated: Some(false),
            is_transitioning: Some(false),
            visibility: Some(IDLE_VISIBILITY),
            activation_progress: Some(0.0),
        }
    }

    /// Pre-activation feedback for a smoothed progress value
    pub fn progress(progress: f64) -> Self {
        let progress = progress.clamp(0.0, 1.0);
        Self {
            visibility: Some(IDLE_VISIBILITY + PROGRESS_VISIBILITY_SPAN * progress),
            activation_progress: Some(progress),
            ..Self::default()
        }
    }

    /// Merge a later patch into this one; fields set in `later` win
    pub fn merge(&mut self, later: PortalPatch) {
        self.is_active = later.is_active.or(self.is_active);
        self.is_fully_activated = later.is_fully_activated.or(self.is_fully_activated);
        self.is_transitioning = later.is_transitioning.or(self.is_transitioning);
        self.visibility = later.visibility.or(self.visibility);
        self.activation_progress = later.activation_progress.or(self.activation_progress);
    }

    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_later_fields_win() {
        let mut patch = PortalPatch::progress(0.2);
        patch.merge(PortalPatch::arming());

        assert_eq!(patch.is_active, Some(true));
        assert_eq!(patch.activation_progress, Some(0.8));
        assert_eq!(patch.visibility, Some(0.6));
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let mut patch = PortalPatch::retiring();
        patch.merge(PortalPatch {
            visibility: Some(0.3),
            ..PortalPatch::default()
        });

        assert_eq!(patch.is_transitioning, Some(true));
        assert_eq!(patch.is_fully_activated, Some(false));
        assert_eq!(patch.visibility, Some(0.3));
    }

    #[test]
    fn test_progress_visibility_hint() {
        let patch = PortalPatch::progress(1.0);
        assert_eq!(patch.visibility, Some(0.6));

        let patch = PortalPatch::progress(-3.0);
        assert_eq!(patch.visibility, Some(IDLE_VISIBILITY));
        assert_eq!(patch.activation_progress, Some(0.0));
    }

    #[test]
    fn test_empty() {
        assert!(PortalPatch::default().is_empty());
        assert!(!PortalPatch::idle().is_empty());
    }
}
