//! Gesture scripts
//!
//! A script is a list of timestamped input events, optionally with the
//! configuration to run them against. Scripts are replayed through a
//! [`Simulation`], so a replay is deterministic and independent of wall time.
//!
//! ```yaml
//! config:
//!   activation_mode: hover
//! events:
//!   - { at_ms: 0, input: enter }
//!   - { at_ms: 1200, input: leave }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::config::{is_json, PortalConfig};
use crate::engine::PortalInput;
use crate::input::ElementBounds;
use crate::platform::{Millis, Simulation};

/// How long a replay keeps running after the last event by default
pub const SETTLE_MS: Millis = 2000;

/// Errors raised while loading a gesture script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML script {path}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse JSON script {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("event {index} at {at_ms}ms comes before the previous event at {previous_ms}ms")]
    OutOfOrder {
        index: usize,
        at_ms: Millis,
        previous_ms: Millis,
    },
}

/// One scripted step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum ScriptAction {
    Enter,
    Leave,
    TouchStart,
    TouchEnd,
    Click,
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64, bounds: ElementBounds },
    PointerUp,
    /// Tear the engine down
    Destroy,
}

impl ScriptAction {
    /// Engine input for this step; None for `destroy`
    pub fn input(self) -> Option<PortalInput> {
        let input = match self {
            ScriptAction::Enter => PortalInput::Enter,
            ScriptAction::Leave => PortalInput::Leave,
            ScriptAction::TouchStart => PortalInput::TouchStart,
            ScriptAction::TouchEnd => PortalInput::TouchEnd,
            ScriptAction::Click => PortalInput::Click,
            ScriptAction::PointerDown { x, y } => PortalInput::PointerDown { x, y },
            ScriptAction::PointerMove { x, y, bounds } => PortalInput::PointerMove { x, y, bounds },
            ScriptAction::PointerUp => PortalInput::PointerUp,
            ScriptAction::Destroy => return None,
        };
        Some(input)
    }
}

/// A step and when it happens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptEvent {
    pub at_ms: Millis,
    #[serde(flatten)]
    pub action: ScriptAction,
}

/// Timestamped input sequence for replay
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureScript {
    #[serde(default)]
    pub config: Option<PortalConfig>,
    /// Stop the replay here instead of settling after the last event
    #[serde(default)]
    pub until_ms: Option<Millis>,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
}

impl GestureScript {
    /// Load and validate a script; `.json` is JSON, anything else YAML
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .map_err(|source| ScriptError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let script: GestureScript = if is_json(path) {
            serde_json::from_str(&contents).map_err(|source| ScriptError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|source| ScriptError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };

        script.validate()?;
        debug!(
            "Loaded gesture script {} ({} events)",
            path.display(),
            script.events.len()
        );
        Ok(script)
    }

    /// Check that event timestamps never go backwards
    pub fn validate(&self) -> Result<(), ScriptError> {
        for (index, pair) in self.events.windows(2).enumerate() {
            if pair[1].at_ms < pair[0].at_ms {
                return Err(ScriptError::OutOfOrder {
                    index: index + 1,
                    at_ms: pair[1].at_ms,
                    previous_ms: pair[0].at_ms,
                });
            }
        }
        Ok(())
    }

    /// Where a replay stops unless told otherwise
    pub fn end_ms(&self) -> Millis {
        self.until_ms.unwrap_or_else(|| {
            self.events
                .last()
                .map_or(0, |event| event.at_ms)
                .saturating_add(SETTLE_MS)
        })
    }

    /// Replay every event up to `until` (default [`end_ms`](Self::end_ms))
    pub fn replay(&self, config: PortalConfig, until: Option<Millis>) -> Simulation {
        let end = until.unwrap_or_else(|| self.end_ms());
        let mut sim = Simulation::new(config);

        for event in self.events.iter().take_while(|event| event.at_ms <= end) {
            match event.action.input() {
                Some(input) => sim.dispatch(event.at_ms, input),
                None => sim.at(event.at_ms, |engine| engine.destroy()),
            }
        }
        sim.advance_to(end);

        info!(
            "Replayed {} events to {}ms: {} commits",
            self.events.len(),
            end,
            sim.commits().len()
        );
        sim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActivationMode;
    use tempfile::TempDir;

    const HOVER_SCRIPT: &str = r#"
config:
  activation_mode: hover
events:
  - { at_ms: 0, input: enter }
  - { at_ms: 1200, input: leave }
"#;

    #[test]
    fn test_parse_yaml_events() {
        let script: GestureScript = serde_yaml::from_str(
            r#"
events:
  - at_ms: 0
    input: pointer_down
    x: 100
    y: 100
  - at_ms: 40
    input: pointer_move
    x: 101.5
    y: 100
    bounds: { left: 0, top: 0, width: 200, height: 200 }
  - at_ms: 90
    input: destroy
"#,
        )
        .unwrap();

        assert!(script.config.is_none());
        assert_eq!(script.events.len(), 3);
        assert_eq!(
            script.events[0].action,
            ScriptAction::PointerDown { x: 100.0, y: 100.0 }
        );
        assert_eq!(
            script.events[1].action.input(),
            Some(PortalInput::PointerMove {
                x: 101.5,
                y: 100.0,
                bounds: ElementBounds::new(0.0, 0.0, 200.0, 200.0),
            })
        );
        assert_eq!(script.events[2].action.input(), None);
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        let script: GestureScript = serde_yaml::from_str(
            r#"
events:
  - { at_ms: 100, input: click }
  - { at_ms: 50, input: click }
"#,
        )
        .unwrap();

        assert!(matches!(
            script.validate(),
            Err(ScriptError::OutOfOrder {
                index: 1,
                at_ms: 50,
                previous_ms: 100
            })
        ));
    }

    #[test]
    fn test_end_defaults_to_settle_after_last_event() {
        let script: GestureScript = serde_yaml::from_str(HOVER_SCRIPT).unwrap();
        assert_eq!(script.end_ms(), 1200 + SETTLE_MS);

        let bounded = GestureScript {
            until_ms: Some(700),
            ..script
        };
        assert_eq!(bounded.end_ms(), 700);
        assert_eq!(GestureScript::default().end_ms(), SETTLE_MS);
    }

    #[test]
    fn test_replay_hover_cycle() {
        let script: GestureScript = serde_yaml::from_str(HOVER_SCRIPT).unwrap();
        let config = script.config.clone().unwrap();
        let sim = script.replay(config, None);

        let times: Vec<Millis> = sim.commits().iter().map(|commit| commit.at_ms).collect();
        assert_eq!(times, vec![500, 900, 1200, 1500]);
        assert_eq!(sim.haptics().len(), 1);
        assert!(!sim.state().is_active);
    }

    #[test]
    fn test_replay_stops_at_until() {
        let script: GestureScript = serde_yaml::from_str(HOVER_SCRIPT).unwrap();
        let sim = script.replay(PortalConfig::for_mode(ActivationMode::Hover), Some(600));

        assert_eq!(sim.commits().len(), 1);
        assert!(sim.state().is_transitioning);
    }

    #[test]
    fn test_replay_destroy_step() {
        let script: GestureScript = serde_yaml::from_str(
            r#"
events:
  - { at_ms: 0, input: enter }
  - { at_ms: 200, input: destroy }
  - { at_ms: 300, input: enter }
"#,
        )
        .unwrap();
        let sim = script.replay(PortalConfig::default(), None);

        assert!(sim.engine().is_destroyed());
        assert!(sim.commits().is_empty());
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let temp_dir = TempDir::new().unwrap();

        let yaml_path = temp_dir.path().join("hover.yaml");
        std::fs::write(&yaml_path, HOVER_SCRIPT).unwrap();
        let script = GestureScript::load(&yaml_path).await.unwrap();
        assert_eq!(script.events.len(), 2);

        let json_path = temp_dir.path().join("click.json");
        std::fs::write(
            &json_path,
            r#"{"events": [{"at_ms": 0, "input": "click"}, {"at_ms": 10, "input": "click"}]}"#,
        )
        .unwrap();
        let script = GestureScript::load(&json_path).await.unwrap();
        assert_eq!(script.events[1].action, ScriptAction::Click);
    }

    #[tokio::test]
    async fn test_load_rejects_unordered_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.yaml");
        std::fs::write(
            &path,
            "events:\n  - { at_ms: 10, input: click }\n  - { at_ms: 5, input: click }\n",
        )
        .unwrap();

        assert!(matches!(
            GestureScript::load(&path).await,
            Err(ScriptError::OutOfOrder { .. })
        ));
        assert!(matches!(
            GestureScript::load(temp_dir.path().join("missing.yaml")).await,
            Err(ScriptError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn test_bundled_scripts_replay() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scripts");

        let hover = GestureScript::load(dir.join("hover.yaml")).await.unwrap();
        let sim = hover.replay(hover.config.clone().unwrap_or_default(), None);
        assert_eq!(sim.haptics().len(), 1);

        let quick = GestureScript::load(dir.join("quick-pass.yaml")).await.unwrap();
        let sim = quick.replay(quick.config.clone().unwrap_or_default(), None);
        assert!(sim.commits().is_empty());

        let click = GestureScript::load(dir.join("click-toggle.json")).await.unwrap();
        let sim = click.replay(click.config.clone().unwrap_or_default(), None);
        assert!(sim.commits()[..4].iter().all(|commit| commit.state.is_active));
        assert!(!sim.state().is_active);

        let pointer = GestureScript::load(dir.join("pointer-release.yaml")).await.unwrap();
        let sim = pointer.replay(pointer.config.clone().unwrap_or_default(), None);
        let last = sim.commits().last().unwrap();
        assert_eq!(last.at_ms, 1250);
        assert!(!last.state.is_active);
    }
}
