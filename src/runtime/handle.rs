//! PortalHandle - public API for a spawned portal
//!
//! Input methods are fire-and-forget and never block. State is read from a
//! watch channel that the actor updates after every commit.

use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;

use super::actor::PortalActor;
use super::PortalCommand;
use crate::config::PortalConfig;
use crate::engine::{PortalHooks, PortalInput};
use crate::input::ElementBounds;
use crate::platform::HapticEmitter;
use crate::state::PortalState;

/// Cloneable handle to a running [`PortalActor`]
///
/// The actor stops on [`PortalHandle::shutdown`] or once every handle is
/// dropped; either way its timers are cancelled.
#[derive(Debug, Clone)]
pub struct PortalHandle {
    cmd_tx: mpsc::UnboundedSender<PortalCommand>,
    state_rx: watch::Receiver<PortalState>,
}

impl PortalHandle {
    pub(crate) fn new(
        cmd_tx: mpsc::UnboundedSender<PortalCommand>,
        state_rx: watch::Receiver<PortalState>,
    ) -> Self {
        Self { cmd_tx, state_rx }
    }

    /// Spawn a portal actor on the current runtime
    pub fn spawn(
        config: PortalConfig,
        hooks: PortalHooks,
        haptics: Option<Box<dyn HapticEmitter>>,
    ) -> Self {
        PortalActor::spawn(config, hooks, haptics)
    }

    // =========================================================================
    // Input (fire-and-forget)
    // =========================================================================

    /// Send any input; dropped silently once the actor has stopped
    pub fn dispatch(&self, input: PortalInput) {
        let _ = self.cmd_tx.send(PortalCommand::Input(input));
    }

    pub fn enter(&self) {
        self.dispatch(PortalInput::Enter);
    }

    pub fn leave(&self) {
        self.dispatch(PortalInput::Leave);
    }

    pub fn touch_start(&self) {
        self.dispatch(PortalInput::TouchStart);
    }

    pub fn touch_end(&self) {
        self.dispatch(PortalInput::TouchEnd);
    }

    pub fn click(&self) {
        self.dispatch(PortalInput::Click);
    }

    pub fn pointer_down(&self, x: f64, y: f64) {
        self.dispatch(PortalInput::PointerDown { x, y });
    }

    pub fn pointer_move(&self, x: f64, y: f64, bounds: ElementBounds) {
        self.dispatch(PortalInput::PointerMove { x, y, bounds });
    }

    pub fn pointer_up(&self) {
        self.dispatch(PortalInput::PointerUp);
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Most recently published state
    pub fn state(&self) -> PortalState {
        *self.state_rx.borrow()
    }

    /// Receiver notified on every published change
    pub fn subscribe(&self) -> watch::Receiver<PortalState> {
        self.state_rx.clone()
    }

    /// Stream of published states, starting with the current one
    pub fn changes(&self) -> WatchStream<PortalState> {
        WatchStream::new(self.state_rx.clone())
    }

    /// Stop the actor and cancel its timers
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(PortalCommand::Shutdown);
    }

    /// True once the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HapticPattern;
    use crate::state::ActivationMode;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::{sleep, Instant};
    use tokio_stream::StreamExt;

    fn spawn(mode: ActivationMode) -> PortalHandle {
        PortalHandle::spawn(PortalConfig::for_mode(mode), PortalHooks::new(), None)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_activates_on_tokio_clock() {
        let pulses = Arc::new(Mutex::new(Vec::new()));
        let emitter = {
            let pulses = pulses.clone();
            move |pattern: HapticPattern| pulses.lock().unwrap().push(pattern)
        };
        let handle = PortalHandle::spawn(
            PortalConfig::for_mode(ActivationMode::Hover),
            PortalHooks::new(),
            Some(Box::new(emitter)),
        );

        handle.enter();
        sleep(Duration::from_millis(450)).await;
        assert!(!handle.state().is_active);

        sleep(Duration::from_millis(100)).await;
        let state = handle.state();
        assert!(state.is_active);
        assert!(state.is_transitioning);

        sleep(Duration::from_millis(400)).await;
        assert!(handle.state().is_fully_activated);
        assert_eq!(*pulses.lock().unwrap(), vec![HapticPattern::Light]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_each_commit() {
        let handle = spawn(ActivationMode::Click);
        let mut rx = handle.subscribe();
        let start = Instant::now();

        handle.click();

        rx.changed().await.unwrap();
        let armed = *rx.borrow_and_update();
        assert!(armed.is_active);
        assert!(!armed.is_fully_activated);

        rx.changed().await.unwrap();
        let stable = *rx.borrow_and_update();
        assert!(stable.is_fully_activated);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400));
        assert!(elapsed < Duration::from_millis(420));
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_stream_starts_with_current_state() {
        let handle = spawn(ActivationMode::Touch);
        let mut changes = handle.changes();

        let first = changes.next().await.unwrap();
        assert_eq!(first, PortalState::idle(ActivationMode::Touch));

        handle.touch_start();
        let armed = changes.next().await.unwrap();
        assert!(armed.is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_before_delay_stays_idle() {
        let handle = spawn(ActivationMode::Touch);

        handle.touch_start();
        sleep(Duration::from_millis(100)).await;
        handle.touch_end();
        sleep(Duration::from_secs(2)).await;

        assert_eq!(handle.state(), PortalState::idle(ActivationMode::Touch));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pointer_input_through_handle() {
        let handle = spawn(ActivationMode::Hover);
        let bounds = ElementBounds::new(0.0, 0.0, 200.0, 200.0);

        handle.pointer_down(100.0, 100.0);
        sleep(Duration::from_millis(500)).await;
        handle.pointer_move(100.0, 100.0, bounds);
        sleep(Duration::from_millis(1)).await;
        assert!(handle.state().is_active);

        handle.pointer_up();
        sleep(Duration::from_millis(500)).await;
        assert!(!handle.state().is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_actor() {
        let handle = spawn(ActivationMode::Hover);
        let mut rx = handle.subscribe();

        handle.enter();
        handle.shutdown();

        // The sender is dropped once the actor exits
        while rx.changed().await.is_ok() {}
        assert!(handle.is_closed());

        handle.enter();
        sleep(Duration::from_secs(1)).await;
        assert!(!handle.state().is_active);
    }
}
