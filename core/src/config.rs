use serde::{Deserialize, Serialize};

use crate::{Direction3, EnabledSizes};

/// Colatitude swept by the stimulus from the outer edge to the field center.
pub const SWEEP_DEG: f64 = 90.0;

const FULL_TURN_DEG: f64 = 360.0;

/// Immutable parameters for an examination session.
///
/// Built once, validated by [`PerimetryConfig::validate`] and handed by
/// reference to every component constructor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerimetryConfig {
    /// Radius of the stimulus sphere in world units.
    pub sphere_radius: f64,
    /// Angular speed of the stimulus in degrees per second.
    pub stimulus_speed_deg_per_sec: f64,
    /// Seconds the view must rest before the focus marker starts moving.
    pub wait_duration_secs: f64,
    /// Seconds the focus marker takes to travel to its new target.
    pub move_duration_secs: f64,
    /// Meridians examined in every pass, in degrees. Must be unique modulo 360.
    pub meridians_deg: Vec<f64>,
    /// Stimulus sizes taking part in the examination.
    pub enabled_sizes: EnabledSizes,
    /// Whether every pass draws a fresh random meridian order.
    pub randomize_meridians: bool,
    /// How many times the meridian set is swept per stimulus size.
    pub repetitions_per_size: u32,
    /// Distance of the focus marker from the subject.
    pub focus_distance: f64,
    /// Optical center of the examined eye; defaults to `(0, 0, -sphere_radius)`.
    pub thales_point: Option<Direction3>,
    /// Number of samples in each displayed meridian polyline.
    pub meridian_line_samples: usize,
    /// Base size of the focus marker.
    pub focus_marker_size: f64,
    /// Pulse frequency of the focus marker in Hz.
    pub focus_pulse_frequency_hz: f64,
    /// Relative pulse amplitude of the focus marker.
    pub focus_pulse_magnitude: f64,
}

impl Default for PerimetryConfig {
    fn default() -> Self {
        Self {
            sphere_radius: 50.0,
            stimulus_speed_deg_per_sec: 10.0,
            wait_duration_secs: 1.0,
            move_duration_secs: 2.0,
            meridians_deg: vec![45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0, 0.0],
            enabled_sizes: EnabledSizes::default(),
            randomize_meridians: true,
            repetitions_per_size: 2,
            focus_distance: 25.0,
            thales_point: None,
            meridian_line_samples: 100,
            focus_marker_size: 0.75,
            focus_pulse_frequency_hz: 0.5,
            focus_pulse_magnitude: 0.3,
        }
    }
}

impl PerimetryConfig {
    /// Parses a configuration from TOML and validates it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Seconds needed to sweep one meridian from the outer edge to the center.
    #[must_use]
    pub fn seconds_per_meridian(&self) -> f64 {
        SWEEP_DEG / self.stimulus_speed_deg_per_sec
    }

    /// Resolved optical center of the examined eye.
    #[must_use]
    pub fn thales_point(&self) -> Direction3 {
        self.thales_point
            .unwrap_or_else(|| Direction3::new(0.0, 0.0, -self.sphere_radius))
    }

    /// Checks every invariant the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive(self.sphere_radius, ConfigError::NonPositiveRadius)?;
        ensure_positive(self.stimulus_speed_deg_per_sec, ConfigError::NonPositiveSpeed)?;
        ensure_positive(self.move_duration_secs, ConfigError::NonPositiveMoveDuration)?;
        ensure_positive(self.focus_distance, ConfigError::NonPositiveFocusDistance)?;
        if !self.wait_duration_secs.is_finite() || self.wait_duration_secs < 0.0 {
            return Err(ConfigError::NegativeWaitDuration(self.wait_duration_secs));
        }

        if self.meridians_deg.is_empty() {
            return Err(ConfigError::EmptyMeridians);
        }
        for (index, meridian) in self.meridians_deg.iter().enumerate() {
            if !meridian.is_finite() {
                return Err(ConfigError::NonFiniteMeridian(*meridian));
            }
            let angle = meridian.rem_euclid(FULL_TURN_DEG);
            if self.meridians_deg[..index]
                .iter()
                .any(|earlier| earlier.rem_euclid(FULL_TURN_DEG) == angle)
            {
                return Err(ConfigError::DuplicateMeridian(*meridian));
            }
        }

        if !self.enabled_sizes.any() {
            return Err(ConfigError::NoEnabledSize);
        }
        if self.repetitions_per_size == 0 {
            return Err(ConfigError::ZeroRepetitions);
        }
        if self.meridian_line_samples < 2 {
            return Err(ConfigError::TooFewLineSamples(self.meridian_line_samples));
        }
        if let Some(point) = self.thales_point {
            if !point.is_finite() || point.length_squared() == 0.0 {
                return Err(ConfigError::InvalidThalesPoint);
            }
        }
        Ok(())
    }
}

fn ensure_positive(value: f64, error: fn(f64) -> ConfigError) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(error(value))
    }
}

/// Configuration defects detected by [`PerimetryConfig::validate`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Sphere radius must be positive and finite.
    #[error("sphere radius must be positive (received {0})")]
    NonPositiveRadius(f64),
    /// Stimulus speed must be positive and finite.
    #[error("stimulus speed must be positive (received {0} deg/s)")]
    NonPositiveSpeed(f64),
    /// Focus marker travel time must be positive and finite.
    #[error("move duration must be positive (received {0} s)")]
    NonPositiveMoveDuration(f64),
    /// Focus marker distance must be positive and finite.
    #[error("focus distance must be positive (received {0})")]
    NonPositiveFocusDistance(f64),
    /// Wait duration must be zero or positive and finite.
    #[error("wait duration must not be negative (received {0} s)")]
    NegativeWaitDuration(f64),
    /// At least one meridian is required.
    #[error("meridian list is empty")]
    EmptyMeridians,
    /// Meridians must be finite angles.
    #[error("meridian {0} is not a finite angle")]
    NonFiniteMeridian(f64),
    /// Every meridian direction may appear only once.
    #[error("meridian {0} is listed more than once")]
    DuplicateMeridian(f64),
    /// At least one stimulus size must be enabled.
    #[error("no stimulus size is enabled")]
    NoEnabledSize,
    /// Each size must be swept at least once.
    #[error("repetitions per size must be at least one")]
    ZeroRepetitions,
    /// Meridian polylines need both endpoints.
    #[error("meridian lines need at least two samples (received {0})")]
    TooFewLineSamples(usize),
    /// Thales point must be finite and away from the origin.
    #[error("thales point must be finite and non-zero")]
    InvalidThalesPoint,
}

/// Failures while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    /// The TOML text could not be parsed.
    #[error("failed to parse perimetry configuration")]
    Parse(#[from] toml::de::Error),
    /// The parsed configuration violates an invariant.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StimulusSize;

    #[test]
    fn default_configuration_is_valid() {
        let config = PerimetryConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert!((config.seconds_per_meridian() - 9.0).abs() < 1e-12);
        assert_eq!(config.thales_point(), Direction3::new(0.0, 0.0, -50.0));
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config = PerimetryConfig::from_toml_str(
            r#"
            stimulus_speed_deg_per_sec = 5.0
            meridians_deg = [0.0, 180.0]
            randomize_meridians = false

            [enabled_sizes]
            V = true
            "#,
        )
        .expect("valid configuration");

        assert_eq!(config.stimulus_speed_deg_per_sec, 5.0);
        assert_eq!(config.meridians_deg, vec![0.0, 180.0]);
        assert!(config.enabled_sizes.is_enabled(StimulusSize::V));
        assert!(!config.enabled_sizes.is_enabled(StimulusSize::III));
        assert_eq!(config.sphere_radius, 50.0);
    }

    #[test]
    fn explicit_thales_point_is_honoured() {
        let config =
            PerimetryConfig::from_toml_str("thales_point = [1.0, 2.0, -40.0]").expect("valid");
        assert_eq!(config.thales_point(), Direction3::new(1.0, 2.0, -40.0));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = PerimetryConfig::from_toml_str("meteor_colour = 3").expect_err("unknown key");
        assert!(matches!(error, ConfigLoadError::Parse(_)));
    }

    #[test]
    fn validation_reports_each_defect() {
        let cases: Vec<(PerimetryConfig, ConfigError)> = vec![
            (
                PerimetryConfig {
                    stimulus_speed_deg_per_sec: 0.0,
                    ..PerimetryConfig::default()
                },
                ConfigError::NonPositiveSpeed(0.0),
            ),
            (
                PerimetryConfig {
                    move_duration_secs: -1.0,
                    ..PerimetryConfig::default()
                },
                ConfigError::NonPositiveMoveDuration(-1.0),
            ),
            (
                PerimetryConfig {
                    wait_duration_secs: -0.5,
                    ..PerimetryConfig::default()
                },
                ConfigError::NegativeWaitDuration(-0.5),
            ),
            (
                PerimetryConfig {
                    meridians_deg: Vec::new(),
                    ..PerimetryConfig::default()
                },
                ConfigError::EmptyMeridians,
            ),
            (
                PerimetryConfig {
                    meridians_deg: vec![0.0, 90.0, 0.0],
                    ..PerimetryConfig::default()
                },
                ConfigError::DuplicateMeridian(0.0),
            ),
            (
                PerimetryConfig {
                    enabled_sizes: EnabledSizes::none(),
                    ..PerimetryConfig::default()
                },
                ConfigError::NoEnabledSize,
            ),
            (
                PerimetryConfig {
                    repetitions_per_size: 0,
                    ..PerimetryConfig::default()
                },
                ConfigError::ZeroRepetitions,
            ),
            (
                PerimetryConfig {
                    thales_point: Some(Direction3::ZERO),
                    ..PerimetryConfig::default()
                },
                ConfigError::InvalidThalesPoint,
            ),
        ];

        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn meridians_equal_modulo_a_full_turn_are_duplicates() {
        let wrapped = PerimetryConfig {
            meridians_deg: vec![0.0, 90.0, 360.0],
            ..PerimetryConfig::default()
        };
        assert_eq!(wrapped.validate(), Err(ConfigError::DuplicateMeridian(360.0)));

        let negative = PerimetryConfig {
            meridians_deg: vec![-90.0, 270.0],
            ..PerimetryConfig::default()
        };
        assert_eq!(negative.validate(), Err(ConfigError::DuplicateMeridian(270.0)));

        let distinct = PerimetryConfig {
            meridians_deg: vec![-90.0, 90.0, 450.5],
            ..PerimetryConfig::default()
        };
        assert_eq!(distinct.validate(), Ok(()));
    }

    #[test]
    fn zero_wait_duration_is_allowed() {
        let config = PerimetryConfig {
            wait_duration_secs: 0.0,
            ..PerimetryConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
