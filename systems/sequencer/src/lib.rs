#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Time-driven state machine that sweeps the stimulus ("meteoroid") across
//! meridians and stimulus sizes and records subject responses.
//!
//! The active meridian and the progress along it are recomputed on every
//! read from the wall-clock time elapsed since the sweep started, never from
//! frame counts, so the motion is independent of the frame rate. A single
//! read that jumps further than one meridian's sweep time advances by several
//! meridians at once; no accumulated per-frame state is kept that could drift.

use std::time::Duration;

use kinetic_perimetry_core::{
    ConfigError, Direction3, Operation, PerimetryConfig, PerimetryError, PolarResponse,
    ResponseLog, ResponseRecord, RotationMatrix, SequencerStatus, StimulusControl, StimulusSize,
    Timestamp, SWEEP_DEG,
};
use kinetic_perimetry_system_alignment::compute_alignment;
use kinetic_perimetry_system_calibration::ResponseCalibrator;
use kinetic_perimetry_system_stimulus_path::{position_on_sphere, MeridianLine};
use rand::{seq::SliceRandom, Rng};

/// One meridian sweep in the examination schedule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledMeridian {
    /// Stimulus size shown during the sweep.
    pub size: StimulusSize,
    /// Meridian swept, in degrees.
    pub meridian_deg: f64,
}

/// Stimulus state sampled at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StimulusFrame {
    /// Position to draw, after applying the alignment transform.
    pub position: Direction3,
    /// Position on the unrotated stimulus sphere.
    pub raw_position: Direction3,
    /// Stimulus size to draw.
    pub size: StimulusSize,
    /// Calibrated subject-relative coordinates of the stimulus.
    pub response: PolarResponse,
    /// Meridian being swept.
    pub meridian_deg: f64,
    /// Sweep progress, `0` at the outer edge and `1` at the field center.
    pub progress: f64,
}

#[derive(Clone, Copy, Debug)]
struct PausedSnapshot {
    frame: StimulusFrame,
    within_meridian_secs: f64,
}

/// Kinetic stimulus sequencer.
///
/// Owns its status, timing, working meridian schedule and the response log.
/// Other systems may only drive it through [`StimulusControl`].
#[derive(Debug)]
pub struct StimulusSequencer {
    config: PerimetryConfig,
    calibrator: ResponseCalibrator,
    alignment: RotationMatrix,
    status: SequencerStatus,
    schedule: Vec<ScheduledMeridian>,
    meridian_index: usize,
    running_since: Option<Timestamp>,
    paused: Option<PausedSnapshot>,
    current_size: Option<StimulusSize>,
    log: ResponseLog,
}

impl StimulusSequencer {
    /// Creates a sequencer in the `ready` state.
    ///
    /// The configuration is validated by [`StimulusSequencer::start`].
    #[must_use]
    pub fn new(config: &PerimetryConfig) -> Self {
        let field_center = Direction3::new(0.0, 0.0, -config.sphere_radius);
        let alignment = compute_alignment(config.thales_point(), field_center)
            .unwrap_or(RotationMatrix::IDENTITY);

        Self {
            config: config.clone(),
            calibrator: ResponseCalibrator::from_config(config),
            alignment,
            status: SequencerStatus::Ready,
            schedule: Vec::new(),
            meridian_index: 0,
            running_since: None,
            paused: None,
            current_size: None,
            log: ResponseLog::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> SequencerStatus {
        self.status
    }

    /// Responses recorded so far, in detection order.
    #[must_use]
    pub fn response_log(&self) -> &ResponseLog {
        &self.log
    }

    /// Rotation applied to raw stimulus positions.
    #[must_use]
    pub fn alignment(&self) -> RotationMatrix {
        self.alignment
    }

    /// Configuration the sequencer was built from.
    #[must_use]
    pub fn config(&self) -> &PerimetryConfig {
        &self.config
    }

    /// Working schedule of the running examination, all size passes in order.
    #[must_use]
    pub fn schedule(&self) -> &[ScheduledMeridian] {
        &self.schedule
    }

    /// Starts the examination with the largest enabled stimulus size.
    ///
    /// Every size pass sweeps the configured meridians
    /// `repetitions_per_size` times; with randomization enabled each
    /// repetition is an independent permutation drawn from `rng`.
    pub fn start<R>(&mut self, now: Timestamp, rng: &mut R) -> Result<StimulusSize, PerimetryError>
    where
        R: Rng + ?Sized,
    {
        if self.status != SequencerStatus::Ready {
            return Err(self.rejected(Operation::Start));
        }
        self.config.validate()?;
        let first = self
            .config
            .enabled_sizes
            .first_enabled_from(StimulusSize::V)
            .ok_or(ConfigError::NoEnabledSize)?;

        self.schedule = build_schedule(&self.config, first, rng);
        self.meridian_index = 0;
        self.running_since = Some(now);
        self.paused = None;
        self.current_size = Some(first);
        self.status = SequencerStatus::Running;

        tracing::info!(
            size = first.label(),
            sweeps = self.schedule.len(),
            "perimetry started"
        );
        Ok(first)
    }

    /// Samples the stimulus at `now`.
    ///
    /// While running this advances through meridians and size passes as time
    /// dictates and may finish the examination. While paused it returns the
    /// frozen snapshot. In `ready` and `done` there is nothing to draw.
    pub fn update(&mut self, now: Timestamp) -> Option<StimulusFrame> {
        match self.status {
            SequencerStatus::Running => self.advance(now),
            SequencerStatus::Paused => self.paused.map(|snapshot| snapshot.frame),
            SequencerStatus::Ready | SequencerStatus::Done => None,
        }
    }

    /// Position to draw at `now`, if any.
    pub fn current_position(&mut self, now: Timestamp) -> Option<Direction3> {
        self.update(now).map(|frame| frame.position)
    }

    /// Stimulus size to draw at `now`, if any.
    pub fn current_size(&mut self, now: Timestamp) -> Option<StimulusSize> {
        self.update(now).map(|frame| frame.size)
    }

    /// Freezes the stimulus at its position at `now`.
    ///
    /// Completed meridians are folded into the stored index and the time
    /// already spent on the active one is kept for [`StimulusSequencer::resume`].
    /// Pausing while paused is a no-op.
    pub fn pause(&mut self, now: Timestamp) -> Result<(), PerimetryError> {
        match self.status {
            SequencerStatus::Paused => return Ok(()),
            SequencerStatus::Running => {}
            SequencerStatus::Ready | SequencerStatus::Done => {
                return Err(self.rejected(Operation::Pause));
            }
        }

        let Some(frame) = self.advance(now) else {
            return Err(self.rejected(Operation::Pause));
        };
        let (steps, within_meridian_secs) = self.sweep_position(now).unwrap_or((0, 0.0));

        self.meridian_index += steps;
        self.paused = Some(PausedSnapshot {
            frame,
            within_meridian_secs,
        });
        self.running_since = None;
        self.status = SequencerStatus::Paused;

        tracing::debug!(
            meridian = frame.meridian_deg,
            progress = frame.progress,
            "stimulus paused"
        );
        Ok(())
    }

    /// Continues a paused stimulus from its frozen position.
    pub fn resume(&mut self, now: Timestamp) -> Result<(), PerimetryError> {
        if self.status != SequencerStatus::Paused {
            return Err(self.rejected(Operation::Resume));
        }

        let within = self
            .paused
            .take()
            .map_or(0.0, |snapshot| snapshot.within_meridian_secs);
        let rewind = Duration::try_from_secs_f64(within).unwrap_or(Duration::ZERO);
        self.running_since = Some(now.saturating_sub(rewind));
        self.status = SequencerStatus::Running;

        tracing::debug!(within_meridian_secs = within, "stimulus resumed");
        Ok(())
    }

    /// Records that the subject saw the stimulus at `now`.
    ///
    /// The response is calibrated from the paused snapshot, appended to the
    /// log, and the sweep continues with the next meridian from its outer
    /// edge.
    pub fn detect(&mut self, now: Timestamp) -> Result<ResponseRecord, PerimetryError> {
        if self.status != SequencerStatus::Running {
            return Err(self.rejected(Operation::Detect));
        }
        if self.pause(now).is_err() {
            return Err(self.rejected(Operation::Detect));
        }
        let Some(snapshot) = self.paused.as_mut() else {
            return Err(self.rejected(Operation::Detect));
        };

        let record = ResponseRecord {
            response: snapshot.frame.response,
            size: snapshot.frame.size,
            meridian_deg: snapshot.frame.meridian_deg,
        };
        snapshot.within_meridian_secs = 0.0;
        self.log.append(record);
        self.meridian_index += 1;
        self.resume(now)?;

        tracing::info!(
            theta = record.response.theta_deg(),
            phi = record.response.phi_deg(),
            size = record.size.label(),
            meridian = record.meridian_deg,
            "stimulus detected"
        );
        Ok(record)
    }

    /// Points the field center at `focus`.
    pub fn retarget(&mut self, focus: Direction3) -> Result<(), PerimetryError> {
        self.alignment = compute_alignment(self.config.thales_point(), focus)?;
        Ok(())
    }

    /// Returns to `ready`, discarding timing and schedule but keeping the log.
    pub fn reset(&mut self) {
        self.clear_timing();
        self.status = SequencerStatus::Ready;
    }

    /// Configured meridians, in configuration order.
    #[must_use]
    pub fn meridians(&self) -> &[f64] {
        &self.config.meridians_deg
    }

    /// Display polyline of `meridian_deg` on the stimulus sphere, aligned.
    pub fn meridian_line(&self, meridian_deg: f64) -> impl Iterator<Item = Direction3> {
        let alignment = self.alignment;
        MeridianLine::new(
            meridian_deg,
            self.config.sphere_radius,
            self.config.meridian_line_samples,
        )
        .map(move |point| alignment * point)
    }

    fn advance(&mut self, now: Timestamp) -> Option<StimulusFrame> {
        let (steps, within) = self.sweep_position(now)?;
        let index = self.meridian_index.saturating_add(steps);
        let Some(entry) = self.schedule.get(index).copied() else {
            self.finish();
            return None;
        };

        if self.current_size != Some(entry.size) {
            tracing::info!(size = entry.size.label(), "advancing to next stimulus size");
            self.current_size = Some(entry.size);
        }

        let progress =
            (within * self.config.stimulus_speed_deg_per_sec / SWEEP_DEG).clamp(0.0, 1.0);
        Some(self.frame_for(entry, progress))
    }

    fn sweep_position(&self, now: Timestamp) -> Option<(usize, f64)> {
        let since = self.running_since?;
        let elapsed = now.saturating_duration_since(since).as_secs_f64();
        let seconds_per_meridian = self.config.seconds_per_meridian();
        let steps = (elapsed / seconds_per_meridian).floor();
        let within = elapsed - steps * seconds_per_meridian;
        Some((steps as usize, within.max(0.0)))
    }

    fn frame_for(&self, entry: ScheduledMeridian, progress: f64) -> StimulusFrame {
        let raw_position = position_on_sphere(entry.meridian_deg, progress, self.config.sphere_radius);
        StimulusFrame {
            position: self.alignment * raw_position,
            raw_position,
            size: entry.size,
            response: self.calibrator.calibrate(raw_position),
            meridian_deg: entry.meridian_deg,
            progress,
        }
    }

    fn finish(&mut self) {
        self.clear_timing();
        self.status = SequencerStatus::Done;
        tracing::info!(responses = self.log.len(), "perimetry done");
    }

    fn clear_timing(&mut self) {
        self.schedule.clear();
        self.meridian_index = 0;
        self.running_since = None;
        self.paused = None;
        self.current_size = None;
    }

    fn rejected(&self, operation: Operation) -> PerimetryError {
        PerimetryError::InvalidTransition {
            operation,
            status: self.status,
        }
    }
}

impl StimulusControl for StimulusSequencer {
    fn pause(&mut self, now: Timestamp) -> Result<(), PerimetryError> {
        StimulusSequencer::pause(self, now)
    }

    fn resume(&mut self, now: Timestamp) -> Result<(), PerimetryError> {
        StimulusSequencer::resume(self, now)
    }

    fn retarget(&mut self, focus: Direction3) -> Result<(), PerimetryError> {
        StimulusSequencer::retarget(self, focus)
    }
}

fn build_schedule<R>(
    config: &PerimetryConfig,
    first: StimulusSize,
    rng: &mut R,
) -> Vec<ScheduledMeridian>
where
    R: Rng + ?Sized,
{
    let mut schedule = Vec::new();
    let mut candidate = Some(first);

    while let Some(size) = candidate {
        if config.enabled_sizes.is_enabled(size) {
            for _ in 0..config.repetitions_per_size {
                let mut pass = config.meridians_deg.clone();
                if config.randomize_meridians {
                    pass.shuffle(rng);
                }
                schedule.extend(
                    pass.into_iter()
                        .map(|meridian_deg| ScheduledMeridian { size, meridian_deg }),
                );
            }
        } else {
            tracing::debug!(size = size.label(), "skipping disabled stimulus size");
        }
        candidate = size.successor();
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetic_perimetry_core::EnabledSizes;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn config() -> PerimetryConfig {
        PerimetryConfig {
            meridians_deg: vec![0.0, 90.0, 180.0],
            enabled_sizes: EnabledSizes::only(StimulusSize::IV).with(StimulusSize::II, true),
            repetitions_per_size: 2,
            randomize_meridians: true,
            ..PerimetryConfig::default()
        }
    }

    #[test]
    fn schedule_contains_every_meridian_once_per_pass() {
        let config = config();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let schedule = build_schedule(&config, StimulusSize::IV, &mut rng);

        assert_eq!(schedule.len(), 12);
        for pass in schedule.chunks(3) {
            let size = pass[0].size;
            assert!(pass.iter().all(|entry| entry.size == size));
            let mut meridians: Vec<_> = pass.iter().map(|entry| entry.meridian_deg).collect();
            meridians.sort_by(f64::total_cmp);
            assert_eq!(meridians, vec![0.0, 90.0, 180.0]);
        }
        assert!(schedule[..6].iter().all(|entry| entry.size == StimulusSize::IV));
        assert!(schedule[6..].iter().all(|entry| entry.size == StimulusSize::II));
    }

    #[test]
    fn schedule_is_reproducible_for_a_seed() {
        let config = config();
        let first = build_schedule(&config, StimulusSize::IV, &mut ChaCha8Rng::seed_from_u64(99));
        let second = build_schedule(&config, StimulusSize::IV, &mut ChaCha8Rng::seed_from_u64(99));

        assert_eq!(first, second);
    }

    #[test]
    fn schedule_keeps_configured_order_without_randomization() {
        let config = PerimetryConfig {
            randomize_meridians: false,
            repetitions_per_size: 1,
            ..config()
        };
        let schedule = build_schedule(&config, StimulusSize::IV, &mut ChaCha8Rng::seed_from_u64(1));
        let meridians: Vec<_> = schedule.iter().map(|entry| entry.meridian_deg).collect();

        assert_eq!(meridians, vec![0.0, 90.0, 180.0, 0.0, 90.0, 180.0]);
    }

    #[test]
    fn new_sequencer_has_identity_alignment_for_default_thales_point() {
        let sequencer = StimulusSequencer::new(&PerimetryConfig::default());

        assert!(sequencer
            .alignment()
            .abs_diff_eq(RotationMatrix::IDENTITY, 1e-12));
        assert_eq!(sequencer.status(), SequencerStatus::Ready);
    }
}
