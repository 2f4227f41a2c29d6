//! Frame-coalesced state commits
//!
//! Every state change goes through [`UpdateScheduler::schedule`]. A patch is
//! committed immediately when at least one frame interval has passed since
//! the last commit; otherwise it waits for the next frame callback. Patches
//! arriving while one is pending are merged into it, so consumers see at
//! most one transition per frame and no patch is ever dropped.

use tracing::trace;

use crate::platform::Millis;
use crate::state::PortalPatch;

/// What the caller must do after scheduling a patch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduleOutcome {
    /// Apply this patch now
    Commit(PortalPatch),
    /// Patch is pending; request one frame callback
    RequestFrame,
    /// Patch was merged into the pending one; a frame is already requested
    Merged,
}

/// Single-slot pending patch plus commit timing
#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    pending: Option<PortalPatch>,
    last_commit: Option<Millis>,
    min_interval: Millis,
    commits: u64,
}

impl UpdateScheduler {
    pub fn new(min_interval: Millis) -> Self {
        Self {
            pending: None,
            last_commit: None,
            min_interval,
            commits: 0,
        }
    }

    /// Schedule a patch at time `now`
    pub fn schedule(&mut self, patch: PortalPatch, now: Millis) -> ScheduleOutcome {
        if let Some(pending) = self.pending.as_mut() {
            pending.merge(patch);
            trace!("Scheduler: merged patch into pending frame");
            return ScheduleOutcome::Merged;
        }

        let too_soon = self
            .last_commit
            .is_some_and(|last| now.saturating_sub(last) < self.min_interval);

        if too_soon {
            self.pending = Some(patch);
            ScheduleOutcome::RequestFrame
        } else {
            self.mark_committed(now);
            ScheduleOutcome::Commit(patch)
        }
    }

    /// Frame callback: hand back the merged pending patch, if any
    pub fn on_frame(&mut self, now: Millis) -> Option<PortalPatch> {
        let patch = self.pending.take()?;
        self.mark_committed(now);
        Some(patch)
    }

    /// Drop the pending patch; true if a frame request is now stale
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn pending(&self) -> Option<&PortalPatch> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_commit(&self) -> Option<Millis> {
        self.last_commit
    }

    /// Total commits handed out
    pub fn commits(&self) -> u64 {
        self.commits
    }

    fn mark_committed(&mut self, now: Millis) {
        self.last_commit = Some(now);
        self.commits += 1;
    }
}
