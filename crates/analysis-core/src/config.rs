//! Threshold configuration for the exercise analyzers.
//!
//! Thresholds are fixed at analyzer construction and never change during
//! analysis. Every field has a default, so a thresholds file only needs to
//! name what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use formcheck_common::error::{FormcheckError, FormcheckResult};

/// Where a value falls relative to a closed band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandPosition {
    Below,
    Within,
    Above,
}

/// Closed interval `[min, max]`, serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn classify(&self, value: f64) -> BandPosition {
        if value < self.min {
            BandPosition::Below
        } else if value > self.max {
            BandPosition::Above
        } else {
            BandPosition::Within
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.classify(value) == BandPosition::Within
    }

    fn check(&self, name: &str) -> FormcheckResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(FormcheckError::config(format!(
                "{name}: invalid band [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl From<[f64; 2]> for Band {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<Band> for [f64; 2] {
    fn from(band: Band) -> Self {
        [band.min, band.max]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlankConfig {
    /// Minimum classifier confidence to accept a posture label.
    pub prediction_probability_threshold: f64,
}

impl Default for PlankConfig {
    fn default() -> Self {
        Self {
            prediction_probability_threshold: 0.6,
        }
    }
}

impl PlankConfig {
    pub fn validate(&self) -> FormcheckResult<()> {
        check_probability("plank.prediction_probability_threshold", self.prediction_probability_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BicepCurlConfig {
    /// Shoulder, elbow and wrist must all be strictly more visible than this.
    pub visibility_threshold: f64,

    /// Curl angle below which a lowered arm counts as raised (degrees).
    pub stage_up_threshold: f64,

    /// Curl angle above which the arm counts as lowered (degrees).
    pub stage_down_threshold: f64,

    /// A rep whose smallest curl angle stays at or above this did not
    /// contract fully (degrees).
    pub peak_contraction_threshold: f64,

    /// Upper arm deviation from vertical that counts as loose (degrees).
    pub loose_upper_arm_angle_threshold: f64,

    /// Minimum confidence of the lean-back posture classifier.
    pub posture_error_threshold: f64,
}

impl Default for BicepCurlConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.65,
            stage_up_threshold: 90.0,
            stage_down_threshold: 120.0,
            peak_contraction_threshold: 60.0,
            loose_upper_arm_angle_threshold: 40.0,
            posture_error_threshold: 0.95,
        }
    }
}

impl BicepCurlConfig {
    pub fn validate(&self) -> FormcheckResult<()> {
        check_probability("bicep_curl.visibility_threshold", self.visibility_threshold)?;
        check_probability("bicep_curl.posture_error_threshold", self.posture_error_threshold)?;
        for (name, value) in [
            ("bicep_curl.stage_up_threshold", self.stage_up_threshold),
            ("bicep_curl.stage_down_threshold", self.stage_down_threshold),
            ("bicep_curl.peak_contraction_threshold", self.peak_contraction_threshold),
            ("bicep_curl.loose_upper_arm_angle_threshold", self.loose_upper_arm_angle_threshold),
        ] {
            check_degrees(name, value)?;
        }
        if self.stage_up_threshold >= self.stage_down_threshold {
            return Err(FormcheckError::config(format!(
                "bicep_curl: stage_up_threshold ({}) must be below stage_down_threshold ({})",
                self.stage_up_threshold, self.stage_down_threshold
            )));
        }
        Ok(())
    }
}

/// Acceptable knee width / foot width ratios per squat phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KneeFootBands {
    pub up: Band,
    pub middle: Band,
    pub down: Band,
}

impl Default for KneeFootBands {
    fn default() -> Self {
        Self {
            up: Band::new(0.5, 1.0),
            middle: Band::new(0.7, 1.0),
            down: Band::new(0.7, 1.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquatConfig {
    pub prediction_probability_threshold: f64,

    /// Minimum visibility of both foot indices and both knees.
    pub visibility_threshold: f64,

    /// Acceptable foot width / shoulder width ratio.
    pub foot_shoulder_ratio: Band,

    pub knee_foot_ratio: KneeFootBands,
}

impl Default for SquatConfig {
    fn default() -> Self {
        Self {
            prediction_probability_threshold: 0.7,
            visibility_threshold: 0.6,
            foot_shoulder_ratio: Band::new(1.2, 2.8),
            knee_foot_ratio: KneeFootBands::default(),
        }
    }
}

impl SquatConfig {
    pub fn validate(&self) -> FormcheckResult<()> {
        check_probability("squat.prediction_probability_threshold", self.prediction_probability_threshold)?;
        check_probability("squat.visibility_threshold", self.visibility_threshold)?;
        self.foot_shoulder_ratio.check("squat.foot_shoulder_ratio")?;
        self.knee_foot_ratio.up.check("squat.knee_foot_ratio.up")?;
        self.knee_foot_ratio.middle.check("squat.knee_foot_ratio.middle")?;
        self.knee_foot_ratio.down.check("squat.knee_foot_ratio.down")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LungeConfig {
    pub prediction_probability_threshold: f64,

    /// Acceptable knee angle while down (degrees).
    pub knee_angle: Band,

    /// Minimum visibility of hips, knees and ankles for the angle check.
    pub visibility_threshold: f64,
}

impl Default for LungeConfig {
    fn default() -> Self {
        Self {
            prediction_probability_threshold: 0.6,
            knee_angle: Band::new(60.0, 125.0),
            visibility_threshold: 0.6,
        }
    }
}

impl LungeConfig {
    pub fn validate(&self) -> FormcheckResult<()> {
        check_probability("lunge.prediction_probability_threshold", self.prediction_probability_threshold)?;
        check_probability("lunge.visibility_threshold", self.visibility_threshold)?;
        self.knee_angle.check("lunge.knee_angle")
    }
}

/// Thresholds for every analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub plank: PlankConfig,
    pub bicep_curl: BicepCurlConfig,
    pub squat: SquatConfig,
    pub lunge: LungeConfig,
}

impl AnalysisConfig {
    /// Load thresholds from a JSON file and validate them.
    pub fn load(path: &Path) -> FormcheckResult<Self> {
        if !path.exists() {
            return Err(FormcheckError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| FormcheckError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds no analyzer could work with.
    pub fn validate(&self) -> FormcheckResult<()> {
        self.plank.validate()?;
        self.bicep_curl.validate()?;
        self.squat.validate()?;
        self.lunge.validate()
    }
}

fn check_probability(name: &str, value: f64) -> FormcheckResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FormcheckError::config(format!("{name} must be within [0, 1], got {value}")))
    }
}

fn check_degrees(name: &str, value: f64) -> FormcheckResult<()> {
    if (0.0..=180.0).contains(&value) {
        Ok(())
    } else {
        Err(FormcheckError::config(format!("{name} must be within [0, 180], got {value}")))
    }
}
