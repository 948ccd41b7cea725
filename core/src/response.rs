use serde::{Deserialize, Serialize};

use crate::StimulusSize;

/// Subject-relative polar coordinates of a detected stimulus, in degrees.
///
/// Both components lie in the normalized ±90 range: `theta_deg` follows the
/// vertical axis and `phi_deg` the horizontal axis of the visual field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarResponse {
    theta_deg: f64,
    phi_deg: f64,
}

impl PolarResponse {
    /// Creates a response from its vertical and horizontal components.
    #[must_use]
    pub const fn new(theta_deg: f64, phi_deg: f64) -> Self {
        Self { theta_deg, phi_deg }
    }

    /// Vertical component.
    #[must_use]
    pub const fn theta_deg(&self) -> f64 {
        self.theta_deg
    }

    /// Horizontal component.
    #[must_use]
    pub const fn phi_deg(&self) -> f64 {
        self.phi_deg
    }

    /// Distance from the field center.
    #[must_use]
    pub fn eccentricity_deg(&self) -> f64 {
        self.theta_deg.hypot(self.phi_deg)
    }
}

/// Single entry of the response log.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Calibrated position at the instant of detection.
    pub response: PolarResponse,
    /// Stimulus size that was shown.
    pub size: StimulusSize,
    /// Meridian the stimulus was sweeping along.
    pub meridian_deg: f64,
}

/// Append-only, detection-ordered record of subject responses ("Goldmann sheet").
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseLog {
    records: Vec<ResponseRecord>,
}

impl ResponseLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record after every previously recorded one.
    pub fn append(&mut self, record: ResponseRecord) {
        self.records.push(record);
    }

    /// Number of recorded responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no response has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over records in detection order.
    pub fn iter(&self) -> impl Iterator<Item = &ResponseRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(theta: f64, size: StimulusSize) -> ResponseRecord {
        ResponseRecord {
            response: PolarResponse::new(theta, 0.0),
            size,
            meridian_deg: 90.0,
        }
    }

    #[test]
    fn eccentricity_is_euclidean_distance_from_center() {
        let response = PolarResponse::new(30.0, -40.0);
        assert!((response.eccentricity_deg() - 50.0).abs() < 1e-12);
        assert_eq!(PolarResponse::default().eccentricity_deg(), 0.0);
    }

    #[test]
    fn log_preserves_detection_order() {
        let mut log = ResponseLog::new();
        log.append(record(10.0, StimulusSize::V));
        log.append(record(-5.0, StimulusSize::IV));
        log.append(record(2.5, StimulusSize::IV));

        let thetas: Vec<_> = log.iter().map(|entry| entry.response.theta_deg()).collect();
        assert_eq!(thetas, vec![10.0, -5.0, 2.5]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn log_keeps_full_precision_through_json() {
        let mut log = ResponseLog::new();
        log.append(record(0.1 + 0.2, StimulusSize::II));

        let json = serde_json::to_string(&log).expect("serialize");
        let restored: ResponseLog = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, log);
    }
}
