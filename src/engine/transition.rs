//! Transition timer controller
//!
//! Owns the activation-delay, completion, and deactivation-delay timers and
//! the phase machine they drive:
//!
//! ```text
//! Idle ──(delayed input)──► AwaitingDelay ──(timer)──┐
//!  │                            │ (release)          │
//!  │◄───────────────────────────┘                    ▼
//!  └──(immediate input)──────────────────────► Transitioning
//!                                                    │ (completion timer, or
//!                                                    │  progress + min duration)
//!                                                    ▼
//!  Idle ◄──(deactivation timer)── Retiring ◄──── Stable
//!                                    │              ▲
//!                                    └─(re-arm)─────┘
//! ```
//!
//! The controller never touches the host directly. Each call appends
//! [`Effect`]s that the engine applies in order.

use tracing::{debug, warn};

use crate::config::PortalConfig;
use crate::platform::{Millis, TimerPurpose};
use crate::state::PortalPatch;

/// What started the current activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationSource {
    Hover,
    Touch,
    Click,
    /// Continuous pointer progress crossed the threshold
    Pointer,
}

/// Where the controller is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing revealed, no activation pending
    Idle,
    /// Qualifying input seen; waiting out the activation delay
    AwaitingDelay {
        requested_at: Millis,
        source: ActivationSource,
    },
    /// Revealing
    Transitioning { armed_at: Millis },
    /// Fully revealed
    Stable { armed_at: Millis },
    /// Retracting; returns to Idle at `deadline`
    Retiring { armed_at: Millis, deadline: Millis },
}

impl Phase {
    /// Revealing or revealed, and not on the way out
    pub fn is_engaged(&self) -> bool {
        matches!(self, Phase::Transitioning { .. } | Phase::Stable { .. })
    }

    /// Anything other than the resting phases
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Phase::Transitioning { .. } | Phase::Stable { .. } | Phase::Retiring { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::AwaitingDelay { .. } => "awaiting-delay",
            Phase::Transitioning { .. } => "transitioning",
            Phase::Stable { .. } => "stable",
            Phase::Retiring { .. } => "retiring",
        }
    }
}

/// Side effect requested by the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Schedule(PortalPatch),
    SetTimer(TimerPurpose, Millis),
    ClearTimer(TimerPurpose),
    HapticPulse,
    /// An activation started
    Activated,
    /// An activation fully retracted
    Deactivated,
}

/// Effect buffer filled by one controller call
pub type Effects = Vec<Effect>;

/// Delays and limits the controller works with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionTimings {
    pub activation_delay_ms: Millis,
    pub completion_delay_ms: Millis,
    pub min_activation_duration_ms: Millis,
    pub deactivation_delay_ms: Millis,
    pub release_delay_cap_ms: Millis,
    pub completion_progress: f64,
}

impl From<&PortalConfig> for TransitionTimings {
    fn from(config: &PortalConfig) -> Self {
        Self {
            activation_delay_ms: config.activation_delay_ms,
            completion_delay_ms: config.completion_delay_ms,
            min_activation_duration_ms: config.min_activation_duration_ms,
            deactivation_delay_ms: config.deactivation_delay_ms,
            release_delay_cap_ms: config.release_delay_cap_ms,
            completion_progress: config.completion_progress,
        }
    }
}

impl TransitionTimings {
    /// Retirement delay for a release mid-activation at `progress`
    pub fn release_delay(&self, progress: f64) -> Millis {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        let proportional = (progress * self.deactivation_delay_ms as f64).round() as Millis;
        proportional.min(self.release_delay_cap_ms)
    }
}

/// Phase machine plus its three timers
#[derive(Debug, Clone)]
pub struct TransitionController {
    timings: TransitionTimings,
    phase: Phase,
    source: Option<ActivationSource>,
    timers: [Option<Millis>; 3],
    activation_started_at: Option<Millis>,
    pulsed: bool,
}

impl TransitionController {
    pub fn new(timings: TransitionTimings) -> Self {
        Self {
            timings,
            phase: Phase::Idle,
            source: None,
            timers: [None; 3],
            activation_started_at: None,
            pulsed: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source(&self) -> Option<ActivationSource> {
        self.source
    }

    pub fn timings(&self) -> &TransitionTimings {
        &self.timings
    }

    /// When the current activation armed
    pub fn activation_started_at(&self) -> Option<Millis> {
        self.activation_started_at
    }

    /// Deadline of the outstanding timer for `purpose`
    pub fn timer(&self, purpose: TimerPurpose) -> Option<Millis> {
        self.timers[purpose.index()]
    }

    /// Outstanding timers and their deadlines
    pub fn pending_timers(&self) -> Vec<(TimerPurpose, Millis)> {
        TimerPurpose::ALL
            .iter()
            .filter_map(|&purpose| self.timer(purpose).map(|at| (purpose, at)))
            .collect()
    }

    /// Qualifying input
    ///
    /// With `delayed`, an idle controller waits out the activation delay
    /// before arming; otherwise it arms at once. A retiring controller goes
    /// straight back to stable.
    pub fn request_activation(
        &mut self,
        now: Millis,
        source: ActivationSource,
        delayed: bool,
        fx: &mut Effects,
    ) {
        match self.phase {
            Phase::Idle if delayed => {
                self.cancel_timer(TimerPurpose::DeactivationDelay, fx);
                let deadline = now + self.timings.activation_delay_ms;
                self.start_timer(TimerPurpose::ActivationDelay, deadline, fx);
                self.phase = Phase::AwaitingDelay {
                    requested_at: now,
                    source,
                };
                debug!("Portal: {:?} input, arming at {}ms", source, deadline);
            }
            Phase::Idle | Phase::AwaitingDelay { .. } if !delayed => self.arm(now, source, fx),
            Phase::Retiring { .. } => self.resume(now, source, fx),
            _ => {}
        }
    }

    /// Disqualifying input
    ///
    /// `progress` is the best current activation estimate; it sets the
    /// shortened retirement delay when released mid-activation.
    pub fn request_deactivation(&mut self, now: Millis, progress: f64, fx: &mut Effects) {
        match self.phase {
            Phase::AwaitingDelay { source, .. } => {
                self.cancel_timer(TimerPurpose::ActivationDelay, fx);
                self.phase = Phase::Idle;
                debug!("Portal: {:?} released before activation delay", source);
            }
            Phase::Transitioning { armed_at } => {
                let delay = self.timings.release_delay(progress);
                self.retire(now, armed_at, delay, fx);
            }
            Phase::Stable { armed_at } => {
                self.retire(now, armed_at, self.timings.deactivation_delay_ms, fx);
            }
            Phase::Idle | Phase::Retiring { .. } => {}
        }
    }

    /// Click toggle: retract an engaged portal, otherwise arm immediately
    pub fn toggle(&mut self, now: Millis, progress: f64, fx: &mut Effects) {
        if self.phase.is_engaged() {
            self.request_deactivation(now, progress, fx);
        } else {
            self.request_activation(now, ActivationSource::Click, false, fx);
        }
    }

    /// Continuous progress path to completion
    pub fn on_progress(&mut self, progress: f64, now: Millis, fx: &mut Effects) {
        if let Phase::Transitioning { armed_at } = self.phase {
            let held = now.saturating_sub(armed_at);
            if progress >= self.timings.completion_progress
                && held >= self.timings.min_activation_duration_ms
            {
                debug!("Portal: progress {:.3} completed activation after {}ms", progress, held);
                self.complete(fx);
            }
        }
    }

    /// Deliver a timer
    ///
    /// Returns false if no timer of that purpose is outstanding or it is not
    /// yet due; nothing changes in that case.
    pub fn on_timer(&mut self, purpose: TimerPurpose, now: Millis, fx: &mut Effects) -> bool {
        let Some(deadline) = self.timer(purpose) else {
            return false;
        };
        if now < deadline {
            return false;
        }
        self.timers[purpose.index()] = None;

        match (purpose, self.phase) {
            (TimerPurpose::ActivationDelay, Phase::AwaitingDelay { source, .. }) => {
                self.arm(now, source, fx)
            }
            (TimerPurpose::Completion, Phase::Transitioning { .. }) => self.complete(fx),
            (TimerPurpose::DeactivationDelay, Phase::Retiring { .. }) => self.finish_retirement(fx),
            (purpose, phase) => {
                warn!("Portal: {} timer fired in phase {}", purpose, phase.name());
            }
        }
        true
    }

    /// Cancel every outstanding timer
    pub fn cancel_all(&mut self, fx: &mut Effects) {
        for purpose in TimerPurpose::ALL {
            self.cancel_timer(purpose, fx);
        }
    }

    fn arm(&mut self, now: Millis, source: ActivationSource, fx: &mut Effects) {
        self.cancel_timer(TimerPurpose::ActivationDelay, fx);
        self.cancel_timer(TimerPurpose::DeactivationDelay, fx);

        self.phase = Phase::Transitioning { armed_at: now };
        self.source = Some(source);
        self.activation_started_at = Some(now);
        self.pulsed = false;

        fx.push(Effect::Schedule(PortalPatch::arming()));
        fx.push(Effect::Activated);
        self.start_timer(
            TimerPurpose::Completion,
            now + self.timings.completion_delay_ms,
            fx,
        );
        debug!("Portal: armed by {:?} at {}ms", source, now);
    }

    fn complete(&mut self, fx: &mut Effects) {
        let Phase::Transitioning { armed_at } = self.phase else {
            return;
        };
        self.cancel_timer(TimerPurpose::Completion, fx);
        self.phase = Phase::Stable { armed_at };
        fx.push(Effect::Schedule(PortalPatch::stable()));
        self.pulse_once(fx);
        debug!("Portal: fully activated");
    }

    fn resume(&mut self, now: Millis, source: ActivationSource, fx: &mut Effects) {
        self.cancel_timer(TimerPurpose::DeactivationDelay, fx);
        let armed_at = self.activation_started_at.unwrap_or(now);
        self.phase = Phase::Stable { armed_at };
        self.source = Some(source);
        fx.push(Effect::Schedule(PortalPatch::stable()));
        self.pulse_once(fx);
        debug!("Portal: retirement cancelled by {:?}, back to stable", source);
    }

    fn retire(&mut self, now: Millis, armed_at: Millis, delay: Millis, fx: &mut Effects) {
        self.cancel_timer(TimerPurpose::Completion, fx);
        self.cancel_timer(TimerPurpose::ActivationDelay, fx);

        let deadline = now + delay;
        self.phase = Phase::Retiring { armed_at, deadline };
        fx.push(Effect::Schedule(PortalPatch::retiring()));
        self.start_timer(TimerPurpose::DeactivationDelay, deadline, fx);
        debug!("Portal: retiring, idle in {}ms", delay);
    }

    fn finish_retirement(&mut self, fx: &mut Effects) {
        self.phase = Phase::Idle;
        self.source = None;
        self.activation_started_at = None;
        self.pulsed = false;
        fx.push(Effect::Schedule(PortalPatch::idle()));
        fx.push(Effect::Deactivated);
        debug!("Portal: idle");
    }

    fn pulse_once(&mut self, fx: &mut Effects) {
        if !self.pulsed {
            self.pulsed = true;
            fx.push(Effect::HapticPulse);
        }
    }

    fn start_timer(&mut self, purpose: TimerPurpose, deadline: Millis, fx: &mut Effects) {
        self.cancel_timer(purpose, fx);
        self.timers[purpose.index()] = Some(deadline);
        fx.push(Effect::SetTimer(purpose, deadline));
    }

    fn cancel_timer(&mut self, purpose: TimerPurpose, fx: &mut Effects) {
        if self.timers[purpose.index()].take().is_some() {
            fx.push(Effect::ClearTimer(purpose));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> TransitionController {
        TransitionController::new(TransitionTimings::from(&PortalConfig::default()))
    }

    fn patches(fx: &Effects) -> Vec<PortalPatch> {
        fx.iter()
            .filter_map(|effect| match effect {
                Effect::Schedule(patch) => Some(*patch),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_delayed_request_waits() {
        let mut ctl = controller();
        let mut fx = Effects::new();

        ctl.request_activation(0, ActivationSource::Hover, true, &mut fx);

        assert!(matches!(ctl.phase(), Phase::AwaitingDelay { requested_at: 0, .. }));
        assert_eq!(fx, vec![Effect::SetTimer(TimerPurpose::ActivationDelay, 500)]);
        assert!(patches(&fx).is_empty());
    }

    #[test]
    fn test_early_timer_is_ignored() {
        let mut ctl = controller();
        let mut fx = Effects::new();
        ctl.request_activation(0, ActivationSource::Hover, true, &mut fx);
        fx.clear();

        assert!(!ctl.on_timer(TimerPurpose::ActivationDelay, 499, &mut fx));
        assert!(!ctl.on_timer(TimerPurpose::Completion, 600, &mut fx));
        assert!(fx.is_empty());
    }

    #[test]
    fn test_full_cycle() {
        let mut ctl = controller();
        let mut fx = Effects::new();

        ctl.request_activation(0, ActivationSource::Touch, true, &mut fx);
        fx.clear();

        assert!(ctl.on_timer(TimerPurpose::ActivationDelay, 500, &mut fx));
        assert_eq!(ctl.phase(), Phase::Transitioning { armed_at: 500 });
        assert_eq!(patches(&fx), vec![PortalPatch::arming()]);
        assert!(fx.contains(&Effect::Activated));
        assert_eq!(ctl.timer(TimerPurpose::Completion), Some(900));
        fx.clear();

        assert!(ctl.on_timer(TimerPurpose::Completion, 900, &mut fx));
        assert_eq!(ctl.phase(), Phase::Stable { armed_at: 500 });
        assert_eq!(fx, vec![Effect::Schedule(PortalPatch::stable()), Effect::HapticPulse]);
        fx.clear();

        ctl.request_deactivation(1000, 1.0, &mut fx);
        assert_eq!(
            ctl.phase(),
            Phase::Retiring {
                armed_at: 500,
                deadline: 1300
            }
        );
        fx.clear();

        assert!(ctl.on_timer(TimerPurpose::DeactivationDelay, 1300, &mut fx));
        assert_eq!(ctl.phase(), Phase::Idle);
        assert_eq!(ctl.activation_started_at(), None);
        assert_eq!(patches(&fx), vec![PortalPatch::idle()]);
        assert!(fx.contains(&Effect::Deactivated));
        assert!(ctl.pending_timers().is_empty());
    }

    #[test]
    fn test_release_mid_activation_shortens_delay() {
        let mut ctl = controller();
        let mut fx = Effects::new();
        ctl.request_activation(0, ActivationSource::Pointer, false, &mut fx);

        ctl.request_deactivation(50, 0.6, &mut fx);
        assert_eq!(ctl.timer(TimerPurpose::DeactivationDelay), Some(200));
        assert_eq!(ctl.timer(TimerPurpose::Completion), None);
    }

    #[test]
    fn test_release_delay_formula() {
        let timings = TransitionTimings::from(&PortalConfig::default());

        assert_eq!(timings.release_delay(0.6), 150);
        assert_eq!(timings.release_delay(0.3), 90);
        assert_eq!(timings.release_delay(f64::NAN), 0);
    }

    #[test]
    fn test_rearm_while_retiring_skips_idle() {
        let mut ctl = controller();
        let mut fx = Effects::new();
        ctl.request_activation(0, ActivationSource::Click, false, &mut fx);
        ctl.on_timer(TimerPurpose::Completion, 400, &mut fx);
        ctl.request_deactivation(500, 1.0, &mut fx);
        fx.clear();

        ctl.request_activation(600, ActivationSource::Click, false, &mut fx);

        assert_eq!(ctl.phase(), Phase::Stable { armed_at: 0 });
        assert_eq!(fx, vec![
            Effect::ClearTimer(TimerPurpose::DeactivationDelay),
            Effect::Schedule(PortalPatch::stable()),
        ]);
        assert!(ctl.pending_timers().is_empty());
    }

    #[test]
    fn test_resume_pulses_if_never_completed() {
        let mut ctl = controller();
        let mut fx = Effects::new();
        ctl.request_activation(0, ActivationSource::Pointer, false, &mut fx);
        ctl.request_deactivation(50, 0.6, &mut fx);
        fx.clear();

        ctl.request_activation(80, ActivationSource::Pointer, false, &mut fx);
        assert!(fx.contains(&Effect::HapticPulse));
    }

    #[test]
    fn test_progress_completion_needs_min_duration() {
        let mut ctl = controller();
        let mut fx = Effects::new();
        ctl.request_activation(1000, ActivationSource::Pointer, false, &mut fx);
        fx.clear();

        ctl.on_progress(0.99, 1100, &mut fx);
        assert_eq!(ctl.phase(), Phase::Transitioning { armed_at: 1000 });

        ctl.on_progress(0.97, 1130, &mut fx);
        assert_eq!(ctl.phase(), Phase::Transitioning { armed_at: 1000 });

        ctl.on_progress(0.99, 1140, &mut fx);
        assert_eq!(ctl.phase(), Phase::Stable { armed_at: 1000 });
        assert!(fx.contains(&Effect::ClearTimer(TimerPurpose::Completion)));
        assert!(fx.contains(&Effect::HapticPulse));
    }

    #[test]
    fn test_restarting_timer_cancels_previous() {
        let mut ctl = controller();
        let mut fx = Effects::new();

        ctl.start_timer(TimerPurpose::Completion, 10, &mut fx);
        ctl.start_timer(TimerPurpose::Completion, 20, &mut fx);

        assert_eq!(fx, vec![
            Effect::SetTimer(TimerPurpose::Completion, 10),
            Effect::ClearTimer(TimerPurpose::Completion),
            Effect::SetTimer(TimerPurpose::Completion, 20),
        ]);
        assert_eq!(ctl.pending_timers(), vec![(TimerPurpose::Completion, 20)]);
    }

    #[test]
    fn test_toggle() {
        let mut ctl = controller();
        let mut fx = Effects::new();

        ctl.toggle(0, 0.0, &mut fx);
        assert_eq!(ctl.phase(), Phase::Transitioning { armed_at: 0 });

        ctl.toggle(100, 0.8, &mut fx);
        assert!(matches!(ctl.phase(), Phase::Retiring { deadline: 250, .. }));

        ctl.toggle(150, 0.6, &mut fx);
        assert_eq!(ctl.phase(), Phase::Stable { armed_at: 0 });
    }

    #[test]
    fn test_at_most_one_timer_outstanding() {
        let mut ctl = controller();
        let mut fx = Effects::new();

        ctl.request_activation(0, ActivationSource::Hover, true, &mut fx);
        assert_eq!(ctl.pending_timers().len(), 1);
        ctl.on_timer(TimerPurpose::ActivationDelay, 500, &mut fx);
        assert_eq!(ctl.pending_timers().len(), 1);
        ctl.request_deactivation(600, 0.8, &mut fx);
        assert_eq!(ctl.pending_timers().len(), 1);
        ctl.request_activation(650, ActivationSource::Hover, true, &mut fx);
        assert_eq!(ctl.pending_timers().len(), 0);
    }
}
