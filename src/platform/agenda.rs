//! Outstanding timer and frame requests, as seen by a host

use super::{Millis, TimerPurpose};

/// Something the host owes the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    Timer(TimerPurpose),
    Frame,
}

/// Bookkeeping of what a host has been asked to deliver
///
/// Hosts record requests here and poll [`next_wakeup`](Self::next_wakeup) to
/// decide when to call back into the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Agenda {
    timers: [Option<Millis>; 3],
    frame_requested_at: Option<Millis>,
}

impl Agenda {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_timer(&mut self, purpose: TimerPurpose, deadline: Millis) {
        self.timers[purpose.index()] = Some(deadline);
    }

    pub fn clear_timer(&mut self, purpose: TimerPurpose) {
        self.timers[purpose.index()] = None;
    }

    pub fn timer(&self, purpose: TimerPurpose) -> Option<Millis> {
        self.timers[purpose.index()]
    }

    /// Record a frame request; repeated requests keep the first
    pub fn request_frame(&mut self, now: Millis) {
        self.frame_requested_at.get_or_insert(now);
    }

    pub fn cancel_frame(&mut self) {
        self.frame_requested_at = None;
    }

    pub fn frame_requested(&self) -> bool {
        self.frame_requested_at.is_some()
    }

    /// Nothing outstanding
    pub fn is_empty(&self) -> bool {
        self.frame_requested_at.is_none() && self.timers.iter().all(Option::is_none)
    }

    /// Earliest due wakeup and its time
    ///
    /// A frame requested at `t` is delivered at the next multiple of
    /// `frame_interval` after `t`. On ties timers come first so that their
    /// patches land in the same frame.
    pub fn next_wakeup(&self, frame_interval: Millis) -> Option<(Millis, Wakeup)> {
        let timers = TimerPurpose::ALL
            .iter()
            .filter_map(|&purpose| self.timer(purpose).map(|at| (at, Wakeup::Timer(purpose))));

        let frame = self
            .frame_requested_at
            .map(|requested| (next_frame_boundary(requested, frame_interval), Wakeup::Frame));

        timers
            .chain(frame)
            .min_by_key(|&(at, wakeup)| (at, matches!(wakeup, Wakeup::Frame)))
    }

    /// Remove a wakeup before delivering it
    pub fn take(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::Timer(purpose) => self.clear_timer(purpose),
            Wakeup::Frame => self.cancel_frame(),
        }
    }
}

/// First frame boundary strictly after `at`
pub fn next_frame_boundary(at: Millis, frame_interval: Millis) -> Millis {
    let interval = frame_interval.max(1);
    (at / interval + 1) * interval
}
