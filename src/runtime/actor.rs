//! PortalActor - owns one engine inside a tokio task
//!
//! The run loop waits on two things at once: the next command and the next
//! agenda wakeup. Every turn ends by publishing the committed state, so
//! watchers only ever see whole frames.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use super::handle::PortalHandle;
use super::platform::TokioPlatform;
use super::PortalCommand;
use crate::config::PortalConfig;
use crate::engine::{PortalEngine, PortalHooks};
use crate::platform::{HapticEmitter, Wakeup};
use crate::state::PortalState;

/// Idle sleep when nothing is scheduled; the select guard disables it
const IDLE_PARK: Duration = Duration::from_secs(3600);

pub struct PortalActor {
    engine: PortalEngine<TokioPlatform>,
    command_rx: mpsc::UnboundedReceiver<PortalCommand>,
    state_tx: watch::Sender<PortalState>,
}

impl PortalActor {
    /// Spawn the actor and return a handle to it
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: PortalConfig,
        hooks: PortalHooks,
        haptics: Option<Box<dyn HapticEmitter>>,
    ) -> PortalHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let engine = PortalEngine::with_hooks(config, TokioPlatform::new(haptics), hooks);
        let (state_tx, state_rx) = watch::channel(engine.state());

        let actor = PortalActor {
            engine,
            command_rx: cmd_rx,
            state_tx,
        };
        tokio::spawn(actor.run());

        info!("PortalActor spawned");
        PortalHandle::new(cmd_tx, state_rx)
    }

    async fn run(mut self) {
        debug!("PortalActor run loop started");

        loop {
            let interval = self.engine.config().frame_interval_ms;
            let next = self.engine.platform().agenda().next_wakeup(interval);
            let deadline = match next {
                Some((at, _)) => self.engine.platform().instant_at(at),
                None => Instant::now() + IDLE_PARK,
            };

            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(PortalCommand::Input(input)) => {
                        trace!(?input, "Processing input");
                        self.engine.dispatch(input);
                    }
                    Some(PortalCommand::Shutdown) => {
                        debug!("PortalActor received shutdown");
                        break;
                    }
                    None => {
                        debug!("All portal handles dropped");
                        break;
                    }
                },
                _ = tokio::time::sleep_until(deadline), if next.is_some() => {
                    if let Some((_, wakeup)) = next {
                        self.wake(wakeup);
                    }
                }
            }

            self.publish();
        }

        self.engine.destroy();
        self.publish();
        info!(
            "PortalActor stopped after {} commits",
            self.engine.commit_count()
        );
    }

    fn wake(&mut self, wakeup: Wakeup) {
        self.engine.platform_mut().agenda_mut().take(wakeup);
        match wakeup {
            Wakeup::Timer(purpose) => self.engine.on_timer(purpose),
            Wakeup::Frame => self.engine.on_frame(),
        }
    }

    fn publish(&self) {
        let state = self.engine.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}
