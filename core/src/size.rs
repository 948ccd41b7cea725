use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Goldmann stimulus size classes, ordinal from smallest (I) to largest (V).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StimulusSize {
    /// 0.11° stimulus.
    I,
    /// 0.22° stimulus.
    II,
    /// 0.43° stimulus.
    III,
    /// 0.86° stimulus.
    IV,
    /// 1.72° stimulus.
    V,
}

// Visual Field Digest, p. 217. Indexed by ordinal.
const ANGULAR_SIZES_DEG: [f64; 5] = [0.11, 0.22, 0.43, 0.86, 1.72];
const LABELS: [&str; 5] = ["I", "II", "III", "IV", "V"];

impl StimulusSize {
    /// Examination order, largest first. Each entry's successor is the next one.
    pub const EXAMINATION_ORDER: [StimulusSize; 5] = [Self::V, Self::IV, Self::III, Self::II, Self::I];

    /// Zero-based ordinal, `I` = 0.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Angular diameter of the stimulus in degrees.
    #[must_use]
    pub const fn angular_size_deg(self) -> f64 {
        ANGULAR_SIZES_DEG[self.ordinal()]
    }

    /// Roman numeral label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        LABELS[self.ordinal()]
    }

    /// Next smaller size in the examination order, `None` after `I`.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        let position = Self::EXAMINATION_ORDER.len() - 1 - self.ordinal();
        if position + 1 < Self::EXAMINATION_ORDER.len() {
            Some(Self::EXAMINATION_ORDER[position + 1])
        } else {
            None
        }
    }

    /// Radius of the disc subtending this size's angle at `distance`.
    #[must_use]
    pub fn radius_at(self, distance: f64) -> f64 {
        (self.angular_size_deg().to_radians() * 0.5).tan() * distance
    }

    /// Physical area (A = π·r²) of the stimulus disc at `distance`.
    #[must_use]
    pub fn area_at(self, distance: f64) -> f64 {
        let radius = self.radius_at(distance);
        radius * radius * PI
    }
}

/// Per-size switches selecting which sizes take part in an examination.
///
/// Sizes missing from a parsed table are disabled; an absent table falls
/// back to [`EnabledSizes::default`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnabledSizes {
    /// Whether size I is examined.
    #[serde(rename = "I", default)]
    pub i: bool,
    /// Whether size II is examined.
    #[serde(rename = "II", default)]
    pub ii: bool,
    /// Whether size III is examined.
    #[serde(rename = "III", default)]
    pub iii: bool,
    /// Whether size IV is examined.
    #[serde(rename = "IV", default)]
    pub iv: bool,
    /// Whether size V is examined.
    #[serde(rename = "V", default)]
    pub v: bool,
}

impl EnabledSizes {
    /// Selection with every size disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            i: false,
            ii: false,
            iii: false,
            iv: false,
            v: false,
        }
    }

    /// Selection containing only `size`.
    #[must_use]
    pub const fn only(size: StimulusSize) -> Self {
        Self::none().with(size, true)
    }

    /// Returns a copy with `size` switched to `enabled`.
    #[must_use]
    pub const fn with(mut self, size: StimulusSize, enabled: bool) -> Self {
        match size {
            StimulusSize::I => self.i = enabled,
            StimulusSize::II => self.ii = enabled,
            StimulusSize::III => self.iii = enabled,
            StimulusSize::IV => self.iv = enabled,
            StimulusSize::V => self.v = enabled,
        }
        self
    }

    /// Whether `size` takes part in the examination.
    #[must_use]
    pub const fn is_enabled(&self, size: StimulusSize) -> bool {
        match size {
            StimulusSize::I => self.i,
            StimulusSize::II => self.ii,
            StimulusSize::III => self.iii,
            StimulusSize::IV => self.iv,
            StimulusSize::V => self.v,
        }
    }

    /// Whether at least one size is enabled.
    #[must_use]
    pub fn any(&self) -> bool {
        StimulusSize::EXAMINATION_ORDER
            .iter()
            .any(|size| self.is_enabled(*size))
    }

    /// First enabled size at or after `start` in examination order.
    ///
    /// Disabled sizes are skipped by following [`StimulusSize::successor`].
    #[must_use]
    pub fn first_enabled_from(&self, start: StimulusSize) -> Option<StimulusSize> {
        let mut candidate = Some(start);
        while let Some(size) = candidate {
            if self.is_enabled(size) {
                return Some(size);
            }
            candidate = size.successor();
        }
        None
    }
}

impl Default for EnabledSizes {
    fn default() -> Self {
        Self::none()
            .with(StimulusSize::III, true)
            .with(StimulusSize::IV, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn areas_match_reference_values_at_thirty_centimetres() {
        let distance = 0.3;
        let expected = [
            (StimulusSize::V, 64.0e-6),
            (StimulusSize::IV, 16.0e-6),
            (StimulusSize::III, 4.0e-6),
            (StimulusSize::II, 1.0e-6),
            (StimulusSize::I, 0.25e-6),
        ];

        for (size, area) in expected {
            let actual = size.area_at(distance);
            assert!(
                (actual - area).abs() < 5.0e-7,
                "size {size:?}: expected {area}, got {actual}"
            );
        }
    }

    #[test]
    fn successor_chain_walks_from_largest_to_smallest() {
        let mut chain = vec![StimulusSize::V];
        while let Some(next) = chain.last().and_then(|size| size.successor()) {
            chain.push(next);
        }

        assert_eq!(chain, StimulusSize::EXAMINATION_ORDER.to_vec());
        assert_eq!(StimulusSize::I.successor(), None);
    }

    #[test]
    fn sizes_order_by_ordinal() {
        assert!(StimulusSize::V > StimulusSize::IV);
        assert!(StimulusSize::I < StimulusSize::II);
        assert_eq!(StimulusSize::III.label(), "III");
    }

    #[test]
    fn first_enabled_skips_disabled_sizes() {
        let selection = EnabledSizes::only(StimulusSize::III);

        assert_eq!(
            selection.first_enabled_from(StimulusSize::V),
            Some(StimulusSize::III)
        );
        assert_eq!(selection.first_enabled_from(StimulusSize::II), None);
        assert!(!EnabledSizes::none().any());
    }

    #[test]
    fn enabled_sizes_parse_from_roman_keys() {
        let selection: EnabledSizes = toml::from_str("V = true\nI = true").expect("parse");

        let enabled: Vec<_> = StimulusSize::EXAMINATION_ORDER
            .into_iter()
            .filter(|size| selection.is_enabled(*size))
            .collect();
        assert_eq!(enabled, vec![StimulusSize::V, StimulusSize::I]);
    }
}
