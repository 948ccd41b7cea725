#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Focus marker that follows the subject's view direction.
//!
//! A view change pauses the stimulus and starts a debounce wait. Once the view
//! has rested for the configured wait duration the marker travels along the
//! great circle towards the new direction at constant angular velocity,
//! pushing each intermediate position to the stimulus as its alignment
//! target. Arrival pushes the final target and resumes the stimulus.

use std::f64::consts::TAU;

use glam::DQuat;
use kinetic_perimetry_core::{
    Direction3, PerimetryConfig, PerimetryError, RecenterPhase, StimulusControl, Timestamp,
};

/// Angular separations below this (radians) skip interpolation.
pub const SLERP_EPSILON: f64 = 1e-5;

/// Unit view direction for a camera `pitch_deg` / `yaw_deg` pair.
///
/// Zero pitch and yaw look down the negative Z axis; positive yaw turns
/// towards positive X and positive pitch towards negative Y.
#[must_use]
pub fn view_direction(pitch_deg: f64, yaw_deg: f64) -> Direction3 {
    let (sin_pitch, cos_pitch) = pitch_deg.to_radians().sin_cos();
    let (sin_yaw, cos_yaw) = yaw_deg.to_radians().sin_cos();
    Direction3::new(cos_pitch * sin_yaw, -sin_pitch, -cos_pitch * cos_yaw)
}

/// Great-circle interpolation between the directions of `from` and `to`.
///
/// Returns a unit vector. Nearly identical directions snap to `to`; exactly
/// opposite directions turn about an arbitrary perpendicular axis.
#[must_use]
pub fn slerp_direction(from: Direction3, to: Direction3, t: f64) -> Direction3 {
    let from = from.normalize_or_zero();
    let to = to.normalize_or_zero();
    let omega = from.dot(to).clamp(-1.0, 1.0).acos();
    if omega < SLERP_EPSILON {
        return to;
    }

    let sin_omega = omega.sin();
    if sin_omega < SLERP_EPSILON {
        let axis = from.any_orthonormal_vector();
        return DQuat::from_axis_angle(axis, omega * t) * from;
    }

    (from * ((1.0 - t) * omega).sin() + to * (t * omega).sin()) / sin_omega
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Idle,
    Waiting { since: Timestamp },
    Moving { from: Direction3, since: Timestamp },
}

/// Debounced recentering animation of the focus marker.
#[derive(Clone, Debug)]
pub struct RecenterAnimator {
    distance: f64,
    wait_secs: f64,
    move_secs: f64,
    marker_size: f64,
    pulse_frequency_hz: f64,
    pulse_magnitude: f64,
    position: Direction3,
    target: Direction3,
    state: State,
    holds_stimulus: bool,
}

impl RecenterAnimator {
    /// Creates an idle animator with the marker straight ahead.
    ///
    /// The animator reacts to view changes before any examination starts, so
    /// the configuration is validated here.
    pub fn new(config: &PerimetryConfig) -> Result<Self, PerimetryError> {
        config.validate()?;
        let straight_ahead = Direction3::new(0.0, 0.0, -config.focus_distance);
        Ok(Self {
            distance: config.focus_distance,
            wait_secs: config.wait_duration_secs,
            move_secs: config.move_duration_secs,
            marker_size: config.focus_marker_size,
            pulse_frequency_hz: config.focus_pulse_frequency_hz,
            pulse_magnitude: config.focus_pulse_magnitude,
            position: straight_ahead,
            target: straight_ahead,
            state: State::Idle,
            holds_stimulus: false,
        })
    }

    /// Current marker position, at the focus distance from the subject.
    #[must_use]
    pub fn position(&self) -> Direction3 {
        self.position
    }

    /// Direction the marker is heading to.
    #[must_use]
    pub fn target(&self) -> Direction3 {
        self.target
    }

    /// Current animation phase.
    #[must_use]
    pub fn phase(&self) -> RecenterPhase {
        match self.state {
            State::Idle => RecenterPhase::Idle,
            State::Waiting { .. } => RecenterPhase::Waiting,
            State::Moving { .. } => RecenterPhase::Moving,
        }
    }

    /// Base size of the marker.
    #[must_use]
    pub fn marker_size(&self) -> f64 {
        self.marker_size
    }

    /// Pulse factor applied to the marker size at `now`.
    #[must_use]
    pub fn pulse_scale(&self, now: Timestamp) -> f64 {
        1.0 + self.pulse_magnitude * (TAU * self.pulse_frequency_hz * now.as_secs_f64()).sin()
    }

    /// Reacts to a new camera orientation.
    pub fn notify_view_changed(
        &mut self,
        pitch_deg: f64,
        yaw_deg: f64,
        now: Timestamp,
        control: &mut dyn StimulusControl,
    ) -> Result<(), PerimetryError> {
        self.notify_direction_changed(view_direction(pitch_deg, yaw_deg), now, control)
    }

    /// Pauses the stimulus and restarts the debounce wait towards `direction`.
    ///
    /// Repeated notifications replace the target and reset the wait, so a
    /// stale move is never completed.
    pub fn notify_direction_changed(
        &mut self,
        direction: Direction3,
        now: Timestamp,
        control: &mut dyn StimulusControl,
    ) -> Result<(), PerimetryError> {
        let length = direction.length();
        if !length.is_finite() || length == 0.0 {
            return Err(PerimetryError::InvalidDirection);
        }

        match control.pause(now) {
            Ok(()) => self.holds_stimulus = true,
            Err(error @ PerimetryError::InvalidTransition { .. }) => {
                tracing::warn!(%error, "stimulus not paused for recentering");
            }
            Err(error) => return Err(error),
        }

        self.target = direction / length * self.distance;
        self.state = State::Waiting { since: now };
        tracing::debug!(focus = ?self.target, "view changed");
        Ok(())
    }

    /// Advances the animation to `now`.
    pub fn update(
        &mut self,
        now: Timestamp,
        control: &mut dyn StimulusControl,
    ) -> Result<(), PerimetryError> {
        match self.state {
            State::Idle => Ok(()),
            State::Waiting { since } => {
                if now.saturating_duration_since(since).as_secs_f64() > self.wait_secs {
                    self.state = State::Moving {
                        from: self.position,
                        since: now,
                    };
                    tracing::debug!("focus marker moving");
                }
                Ok(())
            }
            State::Moving { from, since } => {
                let t = now.saturating_duration_since(since).as_secs_f64() / self.move_secs;
                if t >= 1.0 {
                    self.arrive(now, control)
                } else {
                    self.position = slerp_direction(from, self.target, t) * self.distance;
                    control.retarget(self.position)
                }
            }
        }
    }

    fn arrive(
        &mut self,
        now: Timestamp,
        control: &mut dyn StimulusControl,
    ) -> Result<(), PerimetryError> {
        self.position = self.target;
        self.state = State::Idle;
        control.retarget(self.position)?;

        if std::mem::take(&mut self.holds_stimulus) {
            match control.resume(now) {
                Ok(()) => {}
                Err(error @ PerimetryError::InvalidTransition { .. }) => {
                    tracing::warn!(%error, "stimulus not resumed after recentering");
                }
                Err(error) => return Err(error),
            }
        }

        tracing::info!(position = ?self.position, "focus marker recentered");
        Ok(())
    }
}
