//! Tokio host for the portal engine
//!
//! [`PortalHandle::spawn`] moves an engine into its own task. Input goes in
//! over an unbounded command channel; committed state comes out over a
//! watch channel. Timers and frames are served from the engine's agenda by
//! sleeping until the next wakeup.

mod actor;
mod handle;
mod platform;

pub use actor::PortalActor;
pub use handle::PortalHandle;
pub use platform::TokioPlatform;

use crate::engine::PortalInput;

/// Messages accepted by the portal actor
#[derive(Debug)]
pub(crate) enum PortalCommand {
    Input(PortalInput),
    Shutdown,
}
