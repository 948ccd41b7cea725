#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Converts raw stimulus positions into subject-relative polar coordinates.
//!
//! The offset from the thales point (the examined eye's optical center) is
//! min-max normalized against the sphere radius and scaled to ±90°. Off-axis
//! viewing is not corrected; the mapping is the planar approximation of the
//! underlying geometric model and assumes the thales point and radius used
//! for calibration match those used while measuring.

use kinetic_perimetry_core::{Direction3, PerimetryConfig, PolarResponse};

/// Half extent of the examined field in degrees.
pub const FIELD_HALF_EXTENT_DEG: f64 = 90.0;

/// Rescales `value` from `[-radius, radius]` to `[-1, 1]`.
#[must_use]
pub fn min_max_normalize(value: f64, radius: f64) -> f64 {
    2.0 * ((value + radius) / (radius + radius)) - 1.0
}

/// Polar response of `raw_position` relative to `thales_point`.
#[must_use]
pub fn to_polar(raw_position: Direction3, thales_point: Direction3, radius: f64) -> PolarResponse {
    let offset = raw_position - thales_point;
    PolarResponse::new(
        min_max_normalize(offset.y, radius) * FIELD_HALF_EXTENT_DEG,
        min_max_normalize(offset.x, radius) * FIELD_HALF_EXTENT_DEG,
    )
}

/// Calibrator bound to one session's thales point and sphere radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResponseCalibrator {
    thales_point: Direction3,
    radius: f64,
}

impl ResponseCalibrator {
    /// Creates a calibrator for the provided geometry.
    #[must_use]
    pub const fn new(thales_point: Direction3, radius: f64) -> Self {
        Self {
            thales_point,
            radius,
        }
    }

    /// Creates a calibrator from the session configuration.
    #[must_use]
    pub fn from_config(config: &PerimetryConfig) -> Self {
        Self::new(config.thales_point(), config.sphere_radius)
    }

    /// Polar response of an unrotated stimulus position.
    #[must_use]
    pub fn calibrate(&self, raw_position: Direction3) -> PolarResponse {
        to_polar(raw_position, self.thales_point, self.radius)
    }
}
