use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Operator action replayed at a scripted instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ScriptCommand {
    /// Start the examination.
    Start,
    /// Freeze the stimulus.
    Pause,
    /// Continue a frozen stimulus.
    Resume,
    /// The subject reports seeing the stimulus.
    Detect,
    /// The camera turns to a new orientation.
    View {
        /// Pitch in degrees.
        pitch_deg: f64,
        /// Yaw in degrees.
        yaw_deg: f64,
    },
}

/// Command scheduled at `at_secs` after the replay begins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScriptEvent {
    pub(crate) at_secs: f64,
    pub(crate) command: ScriptCommand,
}

/// Time-ordered list of operator actions.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Script {
    events: Vec<ScriptEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptFile {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEvent {
    at_secs: f64,
    action: RawAction,
    pitch_deg: Option<f64>,
    yaw_deg: Option<f64>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawAction {
    Start,
    Pause,
    Resume,
    Detect,
    View,
}

impl Script {
    /// Reads and parses a script file.
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to parse script {}", path.display()))
    }

    /// Parses a script, ordering events by time.
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self, ScriptError> {
        let file: ScriptFile = toml::from_str(contents)?;
        let mut events = file
            .events
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.into_event(index))
            .collect::<Result<Vec<_>, _>>()?;
        events.sort_by(|left, right| left.at_secs.total_cmp(&right.at_secs));
        Ok(Self { events })
    }

    /// Events in replay order.
    pub(crate) fn events(&self) -> &[ScriptEvent] {
        &self.events
    }
}

impl RawEvent {
    fn into_event(self, index: usize) -> Result<ScriptEvent, ScriptError> {
        if !self.at_secs.is_finite() || self.at_secs < 0.0 {
            return Err(ScriptError::InvalidTime {
                index,
                at_secs: self.at_secs,
            });
        }

        let command = match (self.action, self.pitch_deg, self.yaw_deg) {
            (RawAction::View, Some(pitch_deg), Some(yaw_deg)) => {
                ScriptCommand::View { pitch_deg, yaw_deg }
            }
            (RawAction::View, _, _) => return Err(ScriptError::MissingViewAngles { index }),
            (_, Some(_), _) | (_, _, Some(_)) => {
                return Err(ScriptError::UnexpectedViewAngles { index })
            }
            (RawAction::Start, None, None) => ScriptCommand::Start,
            (RawAction::Pause, None, None) => ScriptCommand::Pause,
            (RawAction::Resume, None, None) => ScriptCommand::Resume,
            (RawAction::Detect, None, None) => ScriptCommand::Detect,
        };

        Ok(ScriptEvent {
            at_secs: self.at_secs,
            command,
        })
    }
}

/// Reasons a script is rejected.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ScriptError {
    /// The TOML could not be parsed.
    #[error("malformed script")]
    Parse(#[from] toml::de::Error),
    /// Event times must be finite and not negative.
    #[error("event {index} has invalid time {at_secs}")]
    InvalidTime { index: usize, at_secs: f64 },
    /// View events need both angles.
    #[error("view event {index} needs pitch_deg and yaw_deg")]
    MissingViewAngles { index: usize },
    /// Only view events carry angles.
    #[error("event {index} carries angles but is not a view event")]
    UnexpectedViewAngles { index: usize },
}
