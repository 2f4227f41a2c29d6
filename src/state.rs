//! Published portal state
//!
//! [`PortalState`] is the immutable snapshot handed to consumers on every
//! committed update. [`PortalPatch`] is the partial update the scheduler
//! merges and flushes into it.

mod patch;
mod types;

pub use patch::PortalPatch;
pub use types::{ActivationMode, PortalState, IDLE_VISIBILITY};
