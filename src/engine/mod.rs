//! Portal activation engine
//!
//! Wires raw input to the leaf components and publishes [`PortalState`]:
//!
//! ```text
//! input ─► velocity gate ─► stabilizer ─► hysteresis ─► transitions ─► scheduler ─► state
//! ```
//!
//! One engine per portal. It owns its buffer, timers, and pending patch and
//! shares nothing. The host supplies time, timers, frames, and haptics
//! through [`Platform`], and calls back via [`PortalEngine::on_timer`] and
//! [`PortalEngine::on_frame`].

pub mod hysteresis;
pub mod scheduler;
pub mod transition;


use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::PortalConfig;
use crate::input::{sample_progress, ElementBounds, StabilizationBuffer, VelocityTracker};
use crate::platform::{HapticPattern, Millis, Platform, TimerPurpose};
use crate::state::{ActivationMode, PortalPatch, PortalState};

pub use hysteresis::{classify, Decision, HysteresisClassifier};
pub use scheduler::{ScheduleOutcome, UpdateScheduler};
pub use transition::{
    ActivationSource, Effect, Effects, Phase, TransitionController, TransitionTimings,
};

/// Callback invoked with the current state snapshot
pub type HookFn = Box<dyn FnMut(&PortalState) + Send>;

/// Optional activation callbacks
///
/// `on_activate` runs when an activation arms, `on_deactivate` when a
/// retirement completes.
#[derive(Default)]
pub struct PortalHooks {
    on_activate: Option<HookFn>,
    on_deactivate: Option<HookFn>,
}

impl PortalHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_activate(mut self, hook: impl FnMut(&PortalState) + Send + 'static) -> Self {
        self.on_activate = Some(Box::new(hook));
        self
    }

    pub fn on_deactivate(mut self, hook: impl FnMut(&PortalState) + Send + 'static) -> Self {
        self.on_deactivate = Some(Box::new(hook));
        self
    }
}

impl std::fmt::Debug for PortalHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalHooks")
            .field("on_activate", &self.on_activate.is_some())
            .field("on_deactivate", &self.on_deactivate.is_some())
            .finish()
    }
}

/// One input event, timestamped by the host clock on dispatch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum PortalInput {
    Enter,
    Leave,
    TouchStart,
    TouchEnd,
    Click,
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64, bounds: ElementBounds },
    PointerUp,
}

/// Gesture-driven activation controller for one portal
pub struct PortalEngine<P: Platform> {
    config: PortalConfig,
    platform: P,
    hooks: PortalHooks,
    state: PortalState,
    scheduler: UpdateScheduler,
    transitions: TransitionController,
    classifier: HysteresisClassifier,
    stabilizer: StabilizationBuffer,
    velocity: VelocityTracker,
    pointer_down: bool,
    destroyed: bool,
}

impl<P: Platform> PortalEngine<P> {
    /// Create an engine; the configuration is sanitized first
    pub fn new(config: PortalConfig, platform: P) -> Self {
        Self::with_hooks(config, platform, PortalHooks::default())
    }

    pub fn with_hooks(config: PortalConfig, platform: P, hooks: PortalHooks) -> Self {
        let config = config.sanitized();
        info!(
            "Portal engine created ({} mode, threshold {:.2}, hysteresis {:.2})",
            config.activation_mode, config.activation_threshold, config.deactivation_hysteresis
        );

        Self {
            state: PortalState::idle(config.activation_mode),
            scheduler: UpdateScheduler::new(config.frame_interval_ms),
            transitions: TransitionController::new(TransitionTimings::from(&config)),
            classifier: HysteresisClassifier::new(
                config.activation_threshold,
                config.deactivation_hysteresis,
            ),
            stabilizer: StabilizationBuffer::new(&config.stabilization),
            velocity: VelocityTracker::new(config.velocity_threshold),
            pointer_down: false,
            destroyed: false,
            config,
            platform,
            hooks,
        }
    }

    /// Last committed snapshot
    pub fn state(&self) -> PortalState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.transitions.phase()
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn mode(&self) -> ActivationMode {
        self.config.activation_mode
    }

    /// Current blended estimate of the stabilization buffer
    pub fn smoothed_progress(&self) -> f64 {
        self.stabilizer.estimate()
    }

    pub fn buffered_samples(&self) -> usize {
        self.stabilizer.len()
    }

    /// Outstanding timers and their deadlines
    pub fn pending_timers(&self) -> Vec<(TimerPurpose, Millis)> {
        self.transitions.pending_timers()
    }

    /// Patch waiting for the next frame, if any
    pub fn pending_patch(&self) -> Option<&PortalPatch> {
        self.scheduler.pending()
    }

    /// Number of state commits so far
    pub fn commit_count(&self) -> u64 {
        self.scheduler.commits()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // =========================================================================
    // Discrete input
    // =========================================================================

    pub fn on_enter(&mut self) {
        if self.accepts(ActivationMode::Hover, "enter") {
            self.activate_after_delay(ActivationSource::Hover);
        }
    }

    pub fn on_leave(&mut self) {
        if self.accepts(ActivationMode::Hover, "leave") {
            self.release();
        }
    }

    pub fn on_touch_start(&mut self) {
        if self.accepts(ActivationMode::Touch, "touch_start") {
            self.stabilizer.clear();
            self.activate_after_delay(ActivationSource::Touch);
        }
    }

    pub fn on_touch_end(&mut self) {
        if self.accepts(ActivationMode::Touch, "touch_end") {
            self.release();
        }
    }

    pub fn on_click(&mut self) {
        if self.accepts(ActivationMode::Click, "click") {
            let now = self.platform.now();
            let progress = self.release_progress();
            let mut fx = Effects::new();
            self.transitions.toggle(now, progress, &mut fx);
            self.apply(fx, now);
        }
    }

    // =========================================================================
    // Continuous input
    // =========================================================================

    /// Start of a pointer interaction; clears the sample history
    pub fn on_pointer_down(&mut self, x: f64, y: f64, at: Millis) {
        if self.destroyed {
            return;
        }
        self.stabilizer.clear();
        self.velocity.reset();
        self.velocity.record(x, y, at);
        self.pointer_down = true;
        trace!("Portal: pointer down at ({:.1}, {:.1})", x, y);
    }

    /// Pointer position update at time `at`
    ///
    /// Samples arriving during fast motion never reach the stabilizer. Only
    /// accepted samples can change the activation decision, and pointer
    /// progress never resumes a retirement it did not cause.
    pub fn on_pointer_move(&mut self, x: f64, y: f64, at: Millis, bounds: ElementBounds) {
        if self.destroyed {
            return;
        }

        let velocity = self.velocity.record(x, y, at);
        if self.velocity.is_fast(&velocity) {
            trace!(
                "Portal: rejecting sample, speed {:.3} px/ms above {:.3}",
                velocity.speed(),
                self.velocity.threshold()
            );
            return;
        }

        let accepted = self.stabilizer.push(sample_progress(x, y, &bounds));
        let progress = self.stabilizer.estimate();
        let mut fx = Effects::new();

        if accepted {
            self.classify_progress(progress, at, &mut fx);
        }
        self.transitions.on_progress(progress, at, &mut fx);

        // Once active, the phase machine owns the published progress
        if accepted && !self.transitions.phase().is_active() {
            fx.push(Effect::Schedule(PortalPatch::progress(progress)));
        }

        self.apply(fx, at);
    }

    /// End of a pointer interaction
    ///
    /// Retracts only an activation that pointer progress started.
    pub fn on_pointer_up(&mut self) {
        if self.destroyed {
            return;
        }
        self.velocity.reset();
        self.pointer_down = false;

        if self.transitions.source() == Some(ActivationSource::Pointer)
            && self.transitions.phase().is_engaged()
        {
            let now = self.platform.now();
            let progress = self.release_progress();
            let mut fx = Effects::new();
            self.transitions.request_deactivation(now, progress, &mut fx);
            self.apply(fx, now);
        }
    }

    pub fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    /// Route an input event; pointer events are stamped with the host clock
    pub fn dispatch(&mut self, input: PortalInput) {
        match input {
            PortalInput::Enter => self.on_enter(),
            PortalInput::Leave => self.on_leave(),
            PortalInput::TouchStart => self.on_touch_start(),
            PortalInput::TouchEnd => self.on_touch_end(),
            PortalInput::Click => self.on_click(),
            PortalInput::PointerDown { x, y } => {
                let now = self.platform.now();
                self.on_pointer_down(x, y, now);
            }
            PortalInput::PointerMove { x, y, bounds } => {
                let now = self.platform.now();
                self.on_pointer_move(x, y, now, bounds);
            }
            PortalInput::PointerUp => self.on_pointer_up(),
        }
    }

    // =========================================================================
    // Host callbacks
    // =========================================================================

    /// Timer callback from the host
    ///
    /// Stale or early callbacks (cancelled timer, destroyed engine) are ignored.
    pub fn on_timer(&mut self, purpose: TimerPurpose) {
        if self.destroyed {
            trace!("Portal: {} timer after destroy ignored", purpose);
            return;
        }
        let now = self.platform.now();
        let mut fx = Effects::new();
        if !self.transitions.on_timer(purpose, now, &mut fx) {
            debug!("Portal: stale {} timer at {}ms ignored", purpose, now);
            return;
        }
        self.apply(fx, now);
    }

    /// Frame callback from the host; flushes the pending patch
    pub fn on_frame(&mut self) {
        if self.destroyed {
            trace!("Portal: frame after destroy ignored");
            return;
        }
        let now = self.platform.now();
        match self.scheduler.on_frame(now) {
            Some(patch) => self.commit(patch, now),
            None => trace!("Portal: frame with nothing pending"),
        }
    }

    /// Tear down: cancel every timer and frame, drop buffers
    ///
    /// Every later call is a no-op. Also runs on drop.
    pub fn destroy(&mut self) {
        if self.teardown() {
            info!("Portal engine destroyed");
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn accepts(&self, mode: ActivationMode, input: &str) -> bool {
        if self.destroyed {
            trace!("Portal: {} after destroy ignored", input);
            return false;
        }
        if self.config.activation_mode != mode {
            trace!(
                "Portal: {} ignored in {} mode",
                input,
                self.config.activation_mode
            );
            return false;
        }
        true
    }

    // Returns false if already torn down
    fn teardown(&mut self) -> bool {
        if self.destroyed {
            return false;
        }

        let mut fx = Effects::new();
        self.transitions.cancel_all(&mut fx);
        for effect in fx {
            if let Effect::ClearTimer(purpose) = effect {
                self.platform.clear_timer(purpose);
            }
        }
        if self.scheduler.cancel() {
            self.platform.cancel_frame();
        }
        self.stabilizer.clear();
        self.velocity.reset();
        self.pointer_down = false;
        self.destroyed = true;
        true
    }

    fn classify_progress(&mut self, progress: f64, at: Millis, fx: &mut Effects) {
        let phase = self.transitions.phase();
        let decision = self.classifier.classify(progress, phase.is_engaged());

        if decision.should_activate {
            let pointer_owned = self.transitions.source() == Some(ActivationSource::Pointer);
            if matches!(phase, Phase::Retiring { .. }) && !pointer_owned {
                trace!("Portal: pointer progress ignored while a discrete release retires");
                return;
            }
            self.transitions
                .request_activation(at, ActivationSource::Pointer, false, fx);
        } else if decision.should_deactivate {
            debug!(
                "Portal: progress {:.3} fell below {:.3}",
                progress,
                self.classifier.floor()
            );
            self.transitions.request_deactivation(at, progress, fx);
        }
    }

    fn activate_after_delay(&mut self, source: ActivationSource) {
        let now = self.platform.now();
        let mut fx = Effects::new();
        self.transitions.request_activation(now, source, true, &mut fx);
        self.apply(fx, now);
    }

    fn release(&mut self) {
        let now = self.platform.now();
        let progress = self.release_progress();
        let mut fx = Effects::new();
        self.transitions.request_deactivation(now, progress, &mut fx);
        self.apply(fx, now);
    }

    // Smoothed progress when continuous input is present, published otherwise
    fn release_progress(&self) -> f64 {
        if self.stabilizer.is_empty() {
            self.state.activation_progress
        } else {
            self.stabilizer.estimate()
        }
    }

    fn apply(&mut self, fx: Effects, now: Millis) {
        for effect in fx {
            match effect {
                Effect::Schedule(patch) => match self.scheduler.schedule(patch, now) {
                    ScheduleOutcome::Commit(patch) => self.commit(patch, now),
                    ScheduleOutcome::RequestFrame => self.platform.request_frame(),
                    ScheduleOutcome::Merged => {}
                },
                Effect::SetTimer(purpose, deadline) => self.platform.set_timer(purpose, deadline),
                Effect::ClearTimer(purpose) => self.platform.clear_timer(purpose),
                Effect::HapticPulse => {
                    if self.config.haptic_feedback_enabled {
                        self.platform.haptic_pulse(HapticPattern::Light);
                    }
                }
                Effect::Activated => {
                    if let Some(hook) = self.hooks.on_activate.as_mut() {
                        hook(&self.state);
                    }
                }
                Effect::Deactivated => {
                    self.stabilizer.clear();
                    if let Some(hook) = self.hooks.on_deactivate.as_mut() {
                        hook(&self.state);
                    }
                }
            }
        }
    }

    fn commit(&mut self, patch: PortalPatch, now: Millis) {
        if self.state.apply(&patch) {
            debug!(
                "Portal: commit at {}ms active={} full={} transitioning={} visibility={:.2} progress={:.2}",
                now,
                self.state.is_active,
                self.state.is_fully_activated,
                self.state.is_transitioning,
                self.state.visibility,
                self.state.activation_progress
            );
        }
    }
}

impl<P: Platform> Drop for PortalEngine<P> {
    fn drop(&mut self) {
        if self.teardown() {
            debug!("Portal engine dropped");
        }
    }
}

impl<P: Platform> std::fmt::Debug for PortalEngine<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalEngine")
            .field("mode", &self.config.activation_mode)
            .field("phase", &self.transitions.phase())
            .field("state", &self.state)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
