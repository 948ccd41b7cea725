#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the kinetic perimetry engine.
//!
//! This crate defines the data model that connects the pure geometry systems,
//! the stimulus sequencer, the recenter animator and the adapters. Systems
//! take an immutable [`PerimetryConfig`] at construction time, receive the
//! current [`Timestamp`] explicitly on every time-dependent call and report
//! failures through [`PerimetryError`]. The only channel through which one
//! system mutates another is the narrow [`StimulusControl`] trait.

mod config;
mod response;
mod size;
mod time;

use std::fmt;

pub use config::{ConfigError, ConfigLoadError, PerimetryConfig, SWEEP_DEG};
pub use response::{PolarResponse, ResponseLog, ResponseRecord};
pub use size::{EnabledSizes, StimulusSize};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};

/// Unit-agnostic direction or position in 3D space.
pub type Direction3 = glam::DVec3;

/// Proper 3×3 rotation matrix.
pub type RotationMatrix = glam::DMat3;

/// Lifecycle of the stimulus sequencer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SequencerStatus {
    /// Constructed or reset; waiting for `start`.
    Ready,
    /// Stimulus is sweeping along the active meridian.
    Running,
    /// Stimulus is frozen at the snapshot taken when pausing.
    Paused,
    /// Every enabled stimulus size has been examined.
    Done,
}

impl fmt::Display for SequencerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// Phase of the focus marker recentering animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecenterPhase {
    /// Marker rests at its target.
    Idle,
    /// View changed recently; waiting for it to settle.
    Waiting,
    /// Marker is travelling along the great circle towards its target.
    Moving,
}

/// Operations that drive the sequencer lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Begin the examination.
    Start,
    /// Freeze the stimulus.
    Pause,
    /// Continue after a pause.
    Resume,
    /// Record a subject response.
    Detect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Detect => "detect",
        };
        f.write_str(label)
    }
}

/// Failures reported by the perimetry systems.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PerimetryError {
    /// A zero-length or non-finite vector was used where a direction is required.
    #[error("direction must be a finite, non-zero vector")]
    InvalidDirection,
    /// The configuration cannot drive an examination.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    /// The requested operation is not permitted in the current state.
    #[error("cannot {operation} while the sequencer is {status}")]
    InvalidTransition {
        /// Operation that was rejected.
        operation: Operation,
        /// State the sequencer was in when the operation was requested.
        status: SequencerStatus,
    },
}

/// Narrow channel through which the recenter animator drives the sequencer.
///
/// These three calls are the only mutations of the sequencer that originate
/// outside of it. Implementors must not expose any other write access to
/// cooperating systems.
pub trait StimulusControl {
    /// Freezes the stimulus; pausing an already paused stimulus is a no-op.
    fn pause(&mut self, now: Timestamp) -> Result<(), PerimetryError>;

    /// Continues a paused stimulus from where it was frozen.
    fn resume(&mut self, now: Timestamp) -> Result<(), PerimetryError>;

    /// Rebuilds the alignment transform so the field center faces `focus`.
    fn retarget(&mut self, focus: Direction3) -> Result<(), PerimetryError>;
}
