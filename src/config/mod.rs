//! Configuration for the portal activation engine
//!
//! Loads [`PortalConfig`] from YAML or JSON and clamps it into a safe range.
//! Invalid values never fail construction: [`PortalConfig::sanitized`]
//! replaces them and logs what it changed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::warn;

use crate::platform::Millis;
use crate::state::ActivationMode;

/// Errors raised while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config {path}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse JSON config {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Root engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub activation_mode: ActivationMode,
    #[serde(default = "default_activation_threshold")]
    pub activation_threshold: f64,
    #[serde(default = "default_deactivation_hysteresis")]
    pub deactivation_hysteresis: f64,
    #[serde(default = "default_activation_delay_ms")]
    pub activation_delay_ms: Millis,
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: Millis,
    #[serde(default = "default_min_activation_duration_ms")]
    pub min_activation_duration_ms: Millis,
    #[serde(default = "default_deactivation_delay_ms")]
    pub deactivation_delay_ms: Millis,
    /// Upper bound on the retirement delay after a mid-activation release
    #[serde(default = "default_release_delay_cap_ms")]
    pub release_delay_cap_ms: Millis,
    /// Smoothed progress at which continuous input completes the reveal
    #[serde(default = "default_completion_progress")]
    pub completion_progress: f64,
    /// Pointer speed (px/ms) above which progress samples are rejected
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: f64,
    /// Minimum spacing between two commits
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: Millis,
    #[serde(default = "default_true")]
    pub haptic_feedback_enabled: bool,
    #[serde(default)]
    pub stabilization: StabilizationConfig,
}

/// Stabilization buffer tuning
///
/// The blend coefficients and epsilon were tuned by hand for mouse and touch
/// input; treat them as knobs rather than constants.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StabilizationConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Samples closer than this to the most recent one are dropped
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Share of the median in the blended estimate (rest is weighted average)
    #[serde(default = "default_median_weight")]
    pub median_weight: f64,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            epsilon: default_epsilon(),
            median_weight: default_median_weight(),
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            activation_mode: ActivationMode::default(),
            activation_threshold: default_activation_threshold(),
            deactivation_hysteresis: default_deactivation_hysteresis(),
            activation_delay_ms: default_activation_delay_ms(),
            completion_delay_ms: default_completion_delay_ms(),
            min_activation_duration_ms: default_min_activation_duration_ms(),
            deactivation_delay_ms: default_deactivation_delay_ms(),
            release_delay_cap_ms: default_release_delay_cap_ms(),
            completion_progress: default_completion_progress(),
            velocity_threshold: default_velocity_threshold(),
            frame_interval_ms: default_frame_interval_ms(),
            haptic_feedback_enabled: default_true(),
            stabilization: StabilizationConfig::default(),
        }
    }
}

impl PortalConfig {
    /// Default configuration for the given activation mode
    pub fn for_mode(mode: ActivationMode) -> Self {
        Self {
            activation_mode: mode,
            ..Self::default()
        }
    }

    /// Load configuration from a file
    ///
    /// `.json` files are parsed as JSON, everything else as YAML. The result
    /// is returned as written; call [`sanitized`](Self::sanitized) before use.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        if is_json(path) {
            serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
        } else {
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    /// Progress below which an active portal retires
    pub fn deactivation_floor(&self) -> f64 {
        self.activation_threshold - self.deactivation_hysteresis
    }

    /// Clamp every field into a usable range
    ///
    /// A hysteresis at or above the threshold would make deactivation
    /// impossible; it falls back to the default when that fits, otherwise to
    /// half the threshold.
    pub fn sanitized(mut self) -> Self {
        let threshold = finite_or(self.activation_threshold, default_activation_threshold());
        if !(threshold > 0.0 && threshold <= 1.0) {
            let clamped = threshold.clamp(f64::EPSILON, 1.0);
            warn!(
                "activation_threshold {} out of range, clamped to {}",
                self.activation_threshold, clamped
            );
            self.activation_threshold = clamped;
        } else {
            self.activation_threshold = threshold;
        }

        let hysteresis = finite_or(self.deactivation_hysteresis, default_deactivation_hysteresis());
        if hysteresis < 0.0 || hysteresis >= self.activation_threshold {
            let fallback = if default_deactivation_hysteresis() < self.activation_threshold {
                default_deactivation_hysteresis()
            } else {
                self.activation_threshold / 2.0
            };
            warn!(
                "deactivation_hysteresis {} invalid for threshold {}, using {}",
                self.deactivation_hysteresis, self.activation_threshold, fallback
            );
            self.deactivation_hysteresis = fallback;
        } else {
            self.deactivation_hysteresis = hysteresis;
        }

        let completion = finite_or(self.completion_progress, default_completion_progress());
        let completion = completion.clamp(self.activation_threshold, 1.0);
        if completion != self.completion_progress {
            warn!(
                "completion_progress {} clamped to {}",
                self.completion_progress, completion
            );
            self.completion_progress = completion;
        }

        if !(self.velocity_threshold.is_finite() && self.velocity_threshold > 0.0) {
            warn!(
                "velocity_threshold {} invalid, using {}",
                self.velocity_threshold,
                default_velocity_threshold()
            );
            self.velocity_threshold = default_velocity_threshold();
        }

        if self.frame_interval_ms == 0 {
            warn!(
                "frame_interval_ms cannot be 0, using {}",
                default_frame_interval_ms()
            );
            self.frame_interval_ms = default_frame_interval_ms();
        }

        self.stabilization = self.stabilization.sanitized();
        self
    }
}

impl StabilizationConfig {
    fn sanitized(mut self) -> Self {
        if self.capacity == 0 {
            warn!("stabilization capacity cannot be 0, using 1");
            self.capacity = 1;
        }

        let epsilon = finite_or(self.epsilon, default_epsilon()).max(0.0);
        if epsilon != self.epsilon {
            warn!("stabilization epsilon {} clamped to {}", self.epsilon, epsilon);
            self.epsilon = epsilon;
        }

        let weight = finite_or(self.median_weight, default_median_weight()).clamp(0.0, 1.0);
        if weight != self.median_weight {
            warn!(
                "stabilization median_weight {} clamped to {}",
                self.median_weight, weight
            );
            self.median_weight = weight;
        }

        self
    }
}

pub(crate) fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

// Default value functions
fn default_activation_threshold() -> f64 { 0.5 }
fn default_deactivation_hysteresis() -> f64 { 0.12 }
fn default_activation_delay_ms() -> Millis { 500 }
fn default_completion_delay_ms() -> Millis { 400 }
fn default_min_activation_duration_ms() -> Millis { 120 }
fn default_deactivation_delay_ms() -> Millis { 300 }
fn default_release_delay_cap_ms() -> Millis { 150 }
fn default_completion_progress() -> f64 { 0.98 }
fn default_velocity_threshold() -> f64 { 0.08 }
fn default_frame_interval_ms() -> Millis { 16 }
fn default_true() -> bool { true }
fn default_capacity() -> usize { 5 }
fn default_epsilon() -> f64 { 0.03 }
fn default_median_weight() -> f64 { 0.7 }
