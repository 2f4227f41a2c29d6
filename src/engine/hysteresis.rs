//! Two-threshold activation classifier
//!
//! Activation needs progress at or above the threshold; deactivation needs
//! progress below `threshold - hysteresis`. Between the two nothing changes,
//! which stops the portal flapping while input lingers at the boundary.

/// Outcome of one classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decision {
    pub should_activate: bool,
    pub should_deactivate: bool,
}

/// Hysteresis classifier with fixed thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisClassifier {
    threshold: f64,
    hysteresis: f64,
}

impl HysteresisClassifier {
    pub fn new(threshold: f64, hysteresis: f64) -> Self {
        Self {
            threshold,
            hysteresis,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Progress below which an active portal retires
    pub fn floor(&self) -> f64 {
        self.threshold - self.hysteresis
    }

    pub fn classify(&self, progress: f64, currently_active: bool) -> Decision {
        classify(progress, currently_active, self.threshold, self.hysteresis)
    }
}

/// Classify a progress value against the activation thresholds
///
/// Activation is only reported while inactive, deactivation only while
/// active.
pub fn classify(progress: f64, currently_active: bool, threshold: f64, hysteresis: f64) -> Decision {
    Decision {
        should_activate: !currently_active && progress >= threshold,
        should_deactivate: currently_active && progress < threshold - hysteresis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_activation_at_threshold() {
        let classifier = HysteresisClassifier::new(0.5, 0.12);

        assert!(classifier.classify(0.5, false).should_activate);
        assert!(!classifier.classify(0.49, false).should_activate);
    }

    #[test]
    fn test_deactivation_below_floor() {
        let classifier = HysteresisClassifier::new(0.5, 0.12);

        assert!(classifier.classify(0.37, true).should_deactivate);
        assert!(!classifier.classify(0.39, true).should_deactivate);
        assert!(!classifier.classify(0.45, true).should_deactivate);
    }

    #[test]
    fn test_decisions_respect_current_state() {
        let classifier = HysteresisClassifier::new(0.5, 0.12);

        assert_eq!(classifier.classify(0.9, true), Decision::default());
        assert_eq!(classifier.classify(0.1, false), Decision::default());
    }

    proptest! {
        #[test]
        fn prop_deadband_never_flaps(
            threshold in 0.2f64..1.0,
            fraction in 0.05f64..0.95,
            position in 0.0f64..1.0,
            active in any::<bool>(),
            repeats in 1usize..20,
        ) {
            let hysteresis = threshold * fraction;
            let floor = threshold - hysteresis;
            let progress = floor + (threshold - floor) * position;
            prop_assume!(progress > floor && progress < threshold);

            let mut is_active = active;
            for _ in 0..repeats {
                let decision = classify(progress, is_active, threshold, hysteresis);
                if decision.should_activate {
                    is_active = true;
                }
                if decision.should_deactivate {
                    is_active = false;
                }
            }

            prop_assert_eq!(is_active, active);
        }
    }
}
