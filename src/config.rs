//! Engine configuration: application constants, log filter default, and the
//! tunable thresholds of every positioning stage.
//!
//! `EngineConfig::default()` reproduces the production constants. Callers may
//! override any subset from JSON (`#[serde(default)]` fills the rest).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::positioning::Direction;

/// Application-level constants
pub const APP_NAME: &str = "Tofes";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tracing filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "tofes_lib=info"
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Config value out of range: {key} = {value} ({reason})")]
    OutOfRange {
        key: &'static str,
        value: f32,
        reason: &'static str,
    },

    #[error("Config parse error: {0}")]
    Parse(String),
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Thresholds for every stage of the positioning pipeline.
///
/// All lengths are PDF points (1/72 inch) in the top-left working frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum label match score for a field to be produced.
    pub match_threshold: f32,
    /// Page margin left of the leftmost possible field.
    pub left_margin: f32,
    /// Gap between a field's right edge and its label.
    pub label_gap: f32,
    /// Overlap percentage (of the smaller box) that triggers resolution.
    pub overlap_threshold_pct: f32,
    /// Above this overlap percentage the weaker field is removed, not moved.
    pub remove_threshold_pct: f32,
    /// Confidence difference below which two fields count as equally confident.
    pub similar_confidence_delta: f32,
    /// Vertical gap left when pushing a field below its blocker.
    pub adjust_gap: f32,
    /// Two fields whose tops differ by at most this share a tab-order row.
    pub row_tolerance: f32,
    /// Checkbox centre-line alignment tolerance for radio grouping.
    pub radio_alignment_tolerance: f32,
    /// Maximum edge gap between neighbouring checkboxes of one radio group.
    pub radio_proximity: f32,
    /// Reading direction of the form.
    pub direction: Direction,
    /// Optional floor for adjusted boxes; thinner boxes become invalid.
    pub min_field_size: Option<f32>,
    pub verifier: VerifierConfig,
}

/// Position verifier settings. Disabled unless a PDF text layer is supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub enabled: bool,
    /// Maximum label drift (points, either axis) still counted as confirmed.
    pub position_tolerance: f32,
    /// Confidence added when the text layer confirms a position.
    pub confirm_boost: f32,
    /// Confidence multiplier when the label is absent from the text layer.
    pub miss_penalty: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.85,
            left_margin: 50.0,
            label_gap: 5.0,
            overlap_threshold_pct: 30.0,
            remove_threshold_pct: 80.0,
            similar_confidence_delta: 0.1,
            adjust_gap: 5.0,
            row_tolerance: 10.0,
            radio_alignment_tolerance: 5.0,
            radio_proximity: 30.0,
            direction: Direction::Rtl,
            min_field_size: None,
            verifier: VerifierConfig::default(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            position_tolerance: 10.0,
            confirm_boost: 0.05,
            miss_penalty: 0.9,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading & validation
// ═══════════════════════════════════════════════════════════

impl EngineConfig {
    /// Parse a (possibly partial) JSON object over the defaults, then validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break stage invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("match_threshold", self.match_threshold)?;
        check_unit("similar_confidence_delta", self.similar_confidence_delta)?;
        check_unit("verifier.confirm_boost", self.verifier.confirm_boost)?;
        check_unit("verifier.miss_penalty", self.verifier.miss_penalty)?;

        check_non_negative("left_margin", self.left_margin)?;
        check_non_negative("label_gap", self.label_gap)?;
        check_non_negative("adjust_gap", self.adjust_gap)?;
        check_non_negative("row_tolerance", self.row_tolerance)?;
        check_non_negative("radio_alignment_tolerance", self.radio_alignment_tolerance)?;
        check_non_negative("radio_proximity", self.radio_proximity)?;
        check_non_negative("verifier.position_tolerance", self.verifier.position_tolerance)?;

        if !(0.0..=100.0).contains(&self.overlap_threshold_pct) {
            return Err(ConfigError::OutOfRange {
                key: "overlap_threshold_pct",
                value: self.overlap_threshold_pct,
                reason: "must be a percentage in [0, 100]",
            });
        }
        if self.remove_threshold_pct < self.overlap_threshold_pct
            || self.remove_threshold_pct > 100.0
        {
            return Err(ConfigError::OutOfRange {
                key: "remove_threshold_pct",
                value: self.remove_threshold_pct,
                reason: "must lie between overlap_threshold_pct and 100",
            });
        }
        if let Some(floor) = self.min_field_size {
            if !floor.is_finite() || floor <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    key: "min_field_size",
                    value: floor,
                    reason: "must be positive when set",
                });
            }
        }
        Ok(())
    }
}

fn check_unit(key: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            reason: "must be in [0, 1]",
        })
    }
}

fn check_non_negative(key: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            value,
            reason: "must be a non-negative length",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_tofes() {
        assert_eq!(APP_NAME, "Tofes");
    }

    #[test]
    fn log_filter_targets_library() {
        assert!(default_log_filter().starts_with("tofes_lib"));
    }

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.match_threshold - 0.85).abs() < f32::EPSILON);
        assert_eq!(config.direction, Direction::Rtl);
        assert!(!config.verifier.enabled);
        assert!(config.min_field_size.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"row_tolerance": 12.5}"#).unwrap();
        assert!((config.row_tolerance - 12.5).abs() < f32::EPSILON);
        assert!((config.overlap_threshold_pct - 30.0).abs() < f32::EPSILON);
        assert!((config.verifier.position_tolerance - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn nested_verifier_json() {
        let config =
            EngineConfig::from_json(r#"{"verifier": {"enabled": true}, "direction": "ltr"}"#)
                .unwrap();
        assert!(config.verifier.enabled);
        assert!((config.verifier.miss_penalty - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.direction, Direction::Ltr);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = EngineConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn threshold_above_one_rejected() {
        let err = EngineConfig::from_json(r#"{"match_threshold": 1.5}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange { key: "match_threshold", .. }
        ));
    }

    #[test]
    fn remove_below_overlap_rejected() {
        let config = EngineConfig {
            overlap_threshold_pct: 50.0,
            remove_threshold_pct: 40.0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { key: "remove_threshold_pct", .. })
        ));
    }

    #[test]
    fn non_positive_floor_rejected() {
        let config = EngineConfig {
            min_field_size: Some(0.0),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_margin_rejected() {
        let config = EngineConfig {
            left_margin: -1.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_serializes_snake_case() {
        let json = serde_json::to_string(&EngineConfig::default()).unwrap();
        assert!(json.contains("\"overlap_threshold_pct\":30.0"));
        assert!(json.contains("\"direction\":\"rtl\""));
    }
}
