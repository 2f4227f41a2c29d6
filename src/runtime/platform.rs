//! Platform backed by the tokio clock

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::platform::{Agenda, HapticEmitter, HapticPattern, Millis, Platform, TimerPurpose};

/// Host capabilities inside a tokio task
///
/// Time is measured from the moment the platform was created. Timer and
/// frame requests are recorded in an [`Agenda`] that the actor loop sleeps on.
pub struct TokioPlatform {
    epoch: Instant,
    agenda: Agenda,
    haptics: Option<Box<dyn HapticEmitter>>,
}

impl TokioPlatform {
    pub fn new(haptics: Option<Box<dyn HapticEmitter>>) -> Self {
        Self {
            epoch: Instant::now(),
            agenda: Agenda::new(),
            haptics,
        }
    }

    pub fn agenda(&self) -> &Agenda {
        &self.agenda
    }

    pub fn agenda_mut(&mut self) -> &mut Agenda {
        &mut self.agenda
    }

    /// Tokio instant for an engine timestamp
    pub fn instant_at(&self, at: Millis) -> Instant {
        self.epoch + Duration::from_millis(at)
    }
}

impl Platform for TokioPlatform {
    fn now(&self) -> Millis {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(Millis::MAX)
    }

    fn request_frame(&mut self) {
        let now = self.now();
        self.agenda.request_frame(now);
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
        match self.haptics.as_mut() {
            Some(emitter) => emitter.pulse(pattern),
            None => trace!("No haptic emitter, dropping {:?} pulse", pattern),
        }
    }
}

impl std::fmt::Debug for TokioPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioPlatform")
            .field("agenda", &self.agenda)
            .field("haptics", &self.haptics.is_some())
            .finish()
    }
}
