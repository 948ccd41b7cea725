#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Maps sweep progress along a meridian onto the stimulus sphere.
//!
//! Progress `0` sits on the equator (the outer edge of the examined field) and
//! progress `1` at the pole `(0, 0, -radius)`, the field center. Only the
//! lower hemisphere is used: colatitude spans `[π/2, π]`.

use std::f64::consts::FRAC_PI_2;

use kinetic_perimetry_core::Direction3;

/// Samples used by [`meridian_line`].
pub const DEFAULT_LINE_SAMPLES: usize = 100;

/// Colatitude reached at `progress`, clamped to the outer hemisphere.
#[must_use]
pub fn colatitude(progress: f64) -> f64 {
    progress.clamp(0.0, 1.0) * FRAC_PI_2 + FRAC_PI_2
}

/// Point on a sphere of `radius` along `meridian_deg` at sweep `progress`.
#[must_use]
pub fn position_on_sphere(meridian_deg: f64, progress: f64, radius: f64) -> Direction3 {
    let theta = colatitude(progress);
    let phi = meridian_deg.to_radians();
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();

    Direction3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta) * radius
}

/// Unit-sphere polyline of `meridian_deg` with [`DEFAULT_LINE_SAMPLES`] points.
#[must_use]
pub fn meridian_line(meridian_deg: f64) -> MeridianLine {
    MeridianLine::new(meridian_deg, 1.0, DEFAULT_LINE_SAMPLES)
}

/// Restartable polyline sampling a meridian from the outer edge to the pole.
///
/// Cloning yields a fresh traversal; nothing is cached, so callers rotate the
/// points after the fact whenever the alignment changes.
#[derive(Clone, Debug, PartialEq)]
pub struct MeridianLine {
    meridian_deg: f64,
    radius: f64,
    samples: usize,
    next: usize,
}

impl MeridianLine {
    /// Creates a polyline with `samples` points on a sphere of `radius`.
    #[must_use]
    pub const fn new(meridian_deg: f64, radius: f64, samples: usize) -> Self {
        Self {
            meridian_deg,
            radius,
            samples,
            next: 0,
        }
    }

    fn progress_at(&self, index: usize) -> f64 {
        if self.samples <= 1 {
            0.0
        } else {
            index as f64 / (self.samples - 1) as f64
        }
    }
}

impl Iterator for MeridianLine {
    type Item = Direction3;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.samples {
            return None;
        }
        let point = position_on_sphere(self.meridian_deg, self.progress_at(self.next), self.radius);
        self.next += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.samples.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MeridianLine {}
