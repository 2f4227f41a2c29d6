//! Manually driven host for tests and replay
//!
//! [`ManualPlatform`] is a fake clock plus an [`Agenda`]. [`Simulation`]
//! owns an engine on top of it and delivers due timers and frames in
//! timestamp order as time is advanced.

use tracing::trace;

use super::{Agenda, HapticPattern, Millis, Platform, TimerPurpose, Wakeup};
use crate::config::PortalConfig;
use crate::engine::{PortalEngine, PortalHooks, PortalInput};
use crate::state::PortalState;

/// Fake host: time only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualPlatform {
    now: Millis,
    agenda: Agenda,
    haptics: Vec<(Millis, HapticPattern)>,
    frame_requests: u64,
}

impl ManualPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at `now`
    pub fn starting_at(now: Millis) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    /// Move the clock forward; never moves it back
    pub fn set_now(&mut self, now: Millis) {
        self.now = self.now.max(now);
    }

    pub fn advance(&mut self, by: Millis) {
        self.now += by;
    }

    pub fn agenda(&self) -> &Agenda {
        &self.agenda
    }

    pub fn agenda_mut(&mut self) -> &mut Agenda {
        &mut self.agenda
    }

    /// Every haptic pulse and when it fired
    pub fn haptics(&self) -> &[(Millis, HapticPattern)] {
        &self.haptics
    }

    pub fn frame_requests(&self) -> u64 {
        self.frame_requests
    }
}

impl Platform for ManualPlatform {
    fn now(&self) -> Millis {
        self.now
    }

    fn request_frame(&mut self) {
        self.frame_requests += 1;
        self.agenda.request_frame(self.now);
    }

    fn cancel_frame(&mut self) {
        self.agenda.cancel_frame();
    }

    fn set_timer(&mut self, purpose: TimerPurpose, deadline: Millis) {
        self.agenda.set_timer(purpose, deadline);
    }

    fn clear_timer(&mut self, purpose: TimerPurpose) {
        self.agenda.clear_timer(purpose);
    }

    fn haptic_pulse(&mut self, pattern: HapticPattern) {
        self.haptics.push((self.now, pattern));
    }
}

/// A committed state change observed during a simulation
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Commit {
    pub at_ms: Millis,
    pub state: PortalState,
}

/// Engine on a manual clock with a deterministic event loop
#[derive(Debug)]
pub struct Simulation {
    engine: PortalEngine<ManualPlatform>,
    commits: Vec<Commit>,
    seen: u64,
}

impl Simulation {
    pub fn new(config: PortalConfig) -> Self {
        Self::with_hooks(config, PortalHooks::default())
    }

    pub fn with_hooks(config: PortalConfig, hooks: PortalHooks) -> Self {
        Self {
            engine: PortalEngine::with_hooks(config, ManualPlatform::new(), hooks),
            commits: Vec::new(),
            seen: 0,
        }
    }

    pub fn now(&self) -> Millis {
        self.engine.platform().now()
    }

    pub fn engine(&self) -> &PortalEngine<ManualPlatform> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PortalEngine<ManualPlatform> {
        &mut self.engine
    }

    pub fn state(&self) -> PortalState {
        self.engine.state()
    }

    /// Every commit so far, in order
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn haptics(&self) -> &[(Millis, HapticPattern)] {
        self.engine.platform().haptics()
    }

    /// Run the host loop up to and including `target`
    pub fn advance_to(&mut self, target: Millis) {
        let interval = self.engine.config().frame_interval_ms;

        while let Some((at, wakeup)) = self.engine.platform().agenda().next_wakeup(interval) {
            if at > target {
                break;
            }

            let platform = self.engine.platform_mut();
            platform.set_now(at);
            platform.agenda_mut().take(wakeup);
            trace!("Simulation: {:?} at {}ms", wakeup, at);

            match wakeup {
                Wakeup::Timer(purpose) => self.engine.on_timer(purpose),
                Wakeup::Frame => self.engine.on_frame(),
            }
            self.record();
        }

        self.engine.platform_mut().set_now(target);
    }

    pub fn advance(&mut self, by: Millis) {
        let target = self.now() + by;
        self.advance_to(target);
    }

    /// Advance to `at`, then run `f` against the engine
    pub fn at(&mut self, at: Millis, f: impl FnOnce(&mut PortalEngine<ManualPlatform>)) {
        self.advance_to(at);
        f(&mut self.engine);
        self.record();
    }

    /// Advance to `at`, then dispatch `input`
    pub fn dispatch(&mut self, at: Millis, input: PortalInput) {
        self.at(at, |engine| engine.dispatch(input));
    }

    pub fn destroy(&mut self) {
        self.engine.destroy();
    }

    fn record(&mut self) {
        let count = self.engine.commit_count();
        if count > self.seen {
            self.seen = count;
            self.commits.push(Commit {
                at_ms: self.now(),
                state: self.engine.state(),
            });
        }
    }
}
