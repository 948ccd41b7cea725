#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-frame orchestration of the stimulus sequencer and the focus marker.
//!
//! Every frame runs in a fixed order: lifecycle commands, view-change
//! notification, recenter update, detection and finally the stimulus read.
//! The recenter animator may pause, resume or realign the sequencer, so the
//! stimulus is always read after it has had its say for the frame.

use kinetic_perimetry_core::{
    Direction3, PerimetryConfig, PerimetryError, RecenterPhase, ResponseLog, ResponseRecord,
    SequencerStatus, StimulusSize, Timestamp,
};
use kinetic_perimetry_system_recenter::RecenterAnimator;
use kinetic_perimetry_system_sequencer::{StimulusFrame, StimulusSequencer};
use rand::Rng;

/// Camera orientation reported by the host, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewAngles {
    /// Rotation about the horizontal axis.
    pub pitch_deg: f64,
    /// Rotation about the vertical axis.
    pub yaw_deg: f64,
}

impl ViewAngles {
    /// Creates a view from pitch and yaw.
    #[must_use]
    pub const fn new(pitch_deg: f64, yaw_deg: f64) -> Self {
        Self { pitch_deg, yaw_deg }
    }
}

/// Input gathered by the host for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionInput {
    /// Current camera orientation, if the host tracks one.
    pub view: Option<ViewAngles>,
    /// Start the examination.
    pub start: bool,
    /// Freeze the stimulus.
    pub pause: bool,
    /// Continue a frozen stimulus.
    pub resume: bool,
    /// The subject reported seeing the stimulus.
    pub detect: bool,
}

/// Everything a renderer needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionFrame {
    /// Stimulus to draw, if any.
    pub stimulus: Option<StimulusFrame>,
    /// Position of the focus marker.
    pub focus_position: Direction3,
    /// Pulsed size of the focus marker.
    pub focus_scale: f64,
    /// Phase of the recentering animation.
    pub recenter_phase: RecenterPhase,
    /// Sequencer status after the frame.
    pub status: SequencerStatus,
    /// Response recorded on this frame.
    pub detection: Option<ResponseRecord>,
    /// Commands refused on this frame.
    pub rejected: Vec<PerimetryError>,
}

/// One examination session driven frame by frame.
#[derive(Debug)]
pub struct Session<R> {
    sequencer: StimulusSequencer,
    animator: RecenterAnimator,
    last_view: ViewAngles,
    rng: R,
}

impl<R> Session<R>
where
    R: Rng,
{
    /// Creates a session in the `ready` state.
    ///
    /// `rng` supplies every random meridian order drawn by the session. An
    /// invalid configuration is reported here, before any frame is animated.
    pub fn new(config: &PerimetryConfig, rng: R) -> Result<Self, PerimetryError> {
        let animator = RecenterAnimator::new(config)?;
        Ok(Self {
            sequencer: StimulusSequencer::new(config),
            animator,
            last_view: ViewAngles::default(),
            rng,
        })
    }

    /// Stimulus sequencer driven by the session.
    #[must_use]
    pub fn sequencer(&self) -> &StimulusSequencer {
        &self.sequencer
    }

    /// Focus marker animator driven by the session.
    #[must_use]
    pub fn animator(&self) -> &RecenterAnimator {
        &self.animator
    }

    /// Responses recorded so far.
    #[must_use]
    pub fn response_log(&self) -> &ResponseLog {
        self.sequencer.response_log()
    }

    /// Stimulus size to draw at `now`, if any.
    pub fn current_size(&mut self, now: Timestamp) -> Option<StimulusSize> {
        self.sequencer.current_size(now)
    }

    /// Returns the sequencer to `ready`, keeping the response log.
    pub fn reset(&mut self) {
        self.sequencer.reset();
    }

    /// Runs one frame at `now`.
    pub fn step(&mut self, input: &SessionInput, now: Timestamp) -> SessionFrame {
        let mut rejected = Vec::new();

        if input.start {
            match self.sequencer.start(now, &mut self.rng) {
                Ok(size) => tracing::debug!(size = size.label(), "start accepted"),
                Err(error) => rejected.push(error),
            }
        }
        if input.pause {
            record(self.sequencer.pause(now), &mut rejected);
        }
        if input.resume {
            record(self.sequencer.resume(now), &mut rejected);
        }

        if let Some(view) = input.view {
            if view != self.last_view {
                self.last_view = view;
                record(
                    self.animator.notify_view_changed(
                        view.pitch_deg,
                        view.yaw_deg,
                        now,
                        &mut self.sequencer,
                    ),
                    &mut rejected,
                );
            }
        }
        record(self.animator.update(now, &mut self.sequencer), &mut rejected);

        let detection = if input.detect {
            match self.sequencer.detect(now) {
                Ok(record) => Some(record),
                Err(error) => {
                    rejected.push(error);
                    None
                }
            }
        } else {
            None
        };

        for error in &rejected {
            tracing::warn!(%error, "command rejected");
        }

        SessionFrame {
            stimulus: self.sequencer.update(now),
            focus_position: self.animator.position(),
            focus_scale: self.animator.marker_size() * self.animator.pulse_scale(now),
            recenter_phase: self.animator.phase(),
            status: self.sequencer.status(),
            detection,
            rejected,
        }
    }
}

fn record(result: Result<(), PerimetryError>, rejected: &mut Vec<PerimetryError>) {
    if let Err(error) = result {
        rejected.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetic_perimetry_core::{EnabledSizes, Operation};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn session() -> Session<ChaCha8Rng> {
        let config = PerimetryConfig {
            meridians_deg: vec![0.0, 180.0],
            enabled_sizes: EnabledSizes::only(StimulusSize::IV),
            randomize_meridians: false,
            ..PerimetryConfig::default()
        };
        Session::new(&config, ChaCha8Rng::seed_from_u64(5)).expect("valid configuration")
    }

    #[test]
    fn idle_session_draws_nothing() {
        let mut session = session();
        let frame = session.step(&SessionInput::default(), Timestamp::ZERO);

        assert_eq!(frame.stimulus, None);
        assert_eq!(frame.status, SequencerStatus::Ready);
        assert_eq!(frame.recenter_phase, RecenterPhase::Idle);
        assert!(frame.rejected.is_empty());
        assert!((frame.focus_scale - 0.75).abs() < 1e-12);
    }

    #[test]
    fn refused_commands_are_reported_not_dropped() {
        let mut session = session();
        let frame = session.step(
            &SessionInput {
                detect: true,
                resume: true,
                ..SessionInput::default()
            },
            Timestamp::ZERO,
        );

        assert_eq!(
            frame.rejected,
            vec![
                PerimetryError::InvalidTransition {
                    operation: Operation::Resume,
                    status: SequencerStatus::Ready,
                },
                PerimetryError::InvalidTransition {
                    operation: Operation::Detect,
                    status: SequencerStatus::Ready,
                },
            ]
        );
        assert!(session.response_log().is_empty());
    }

    #[test]
    fn unchanged_view_does_not_trigger_recentering() {
        let mut session = session();
        let input = SessionInput {
            view: Some(ViewAngles::default()),
            start: true,
            ..SessionInput::default()
        };
        let frame = session.step(&input, Timestamp::ZERO);

        assert_eq!(frame.status, SequencerStatus::Running);
        assert_eq!(frame.recenter_phase, RecenterPhase::Idle);
    }
}
