//! Portal activation engine
//!
//! Turns raw hover, touch, click, and pointer input into a stable
//! [`PortalState`] for a revealable UI element. Noisy continuous input is
//! smoothed and gated, activation uses hysteresis, and every transition is
//! timed so that fast passes and jitter never cause flicker.
//!
//! The [`PortalEngine`] is host-agnostic: it is driven through the
//! [`Platform`] trait. [`Simulation`] runs it on a manual clock and
//! [`PortalHandle`] runs it inside a tokio task.

pub mod config;
pub mod engine;
pub mod input;
pub mod platform;
pub mod runtime;
pub mod script;
pub mod state;

pub use config::{ConfigError, PortalConfig, StabilizationConfig};
pub use engine::{ActivationSource, Phase, PortalEngine, PortalHooks, PortalInput};
pub use input::ElementBounds;
pub use platform::{
    Commit, HapticEmitter, HapticPattern, ManualPlatform, Millis, Platform, Simulation,
    TimerPurpose,
};
pub use runtime::PortalHandle;
pub use script::{GestureScript, ScriptError};
pub use state::{ActivationMode, PortalPatch, PortalState};
