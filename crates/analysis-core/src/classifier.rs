//! Classifier seam.
//!
//! Analyzers only need "feature vector in, label + confidence out". The
//! `Classifier` trait is that boundary; `LinearModel` is the artifact format
//! shipped in the models directory, and `ScriptedClassifier` replays a
//! fixed sequence of predictions.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use formcheck_common::error::{FormcheckError, FormcheckResult};

use crate::geometry::round_to;

/// A predicted label and its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Probability of `label`, the highest among all classes.
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// The label, if the confidence reaches `threshold`.
    pub fn confident(&self, threshold: f64) -> Option<&str> {
        (self.confidence >= threshold).then_some(self.label.as_str())
    }

    /// Copy with the confidence rounded to two decimals.
    pub fn rounded(&self) -> Self {
        Self {
            label: self.label.clone(),
            confidence: round_to(self.confidence, 2),
        }
    }
}

/// Anything that can label a feature vector.
///
/// Implementations are read-only after construction and shared between
/// analyzers.
pub trait Classifier: Debug + Send + Sync {
    fn predict(&self, features: &[f64]) -> FormcheckResult<Prediction>;

    /// Expected feature vector length, when the classifier knows it.
    fn input_len(&self) -> Option<usize> {
        None
    }

    /// Labels the classifier can emit, when known.
    fn labels(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Per-feature standardization applied before the linear layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Constant training columns have zero scale; leave them centered only.
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect()
    }
}

/// Multinomial logistic regression artifact.
///
/// `weights[k]` holds the coefficients of class `labels[k]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub labels: Vec<String>,
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

impl LinearModel {
    /// Load and validate a model artifact from a JSON file.
    pub fn load(path: &Path) -> FormcheckResult<Self> {
        let name = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FormcheckError::model_load(&name, e.to_string()))?;
        Self::from_json(&name, &content)
    }

    /// Parse and validate a model artifact. `name` is used in errors.
    pub fn from_json(name: &str, json: &str) -> FormcheckResult<Self> {
        let model: LinearModel =
            serde_json::from_str(json).map_err(|e| FormcheckError::model_load(name, e.to_string()))?;
        model
            .validate()
            .map_err(|msg| FormcheckError::model_load(name, msg))?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), String> {
        if self.labels.len() < 2 {
            return Err("a classifier needs at least two labels".to_string());
        }
        if self.weights.len() != self.labels.len() || self.bias.len() != self.labels.len() {
            return Err(format!(
                "expected {} weight rows and biases, found {} and {}",
                self.labels.len(),
                self.weights.len(),
                self.bias.len()
            ));
        }
        let width = self.weights[0].len();
        if width == 0 || self.weights.iter().any(|row| row.len() != width) {
            return Err("weight rows must be non-empty and equally long".to_string());
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != width || scaler.scale.len() != width {
                return Err(format!(
                    "scaler length does not match feature width {width}"
                ));
            }
        }
        let all_finite = self
            .weights
            .iter()
            .flatten()
            .chain(&self.bias)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("model contains non-finite parameters".to_string());
        }
        Ok(())
    }

    /// Class probabilities in label order.
    pub fn predict_proba(&self, features: &[f64]) -> FormcheckResult<Vec<f64>> {
        let width = self.weights[0].len();
        if features.len() != width {
            return Err(FormcheckError::classifier(format!(
                "expected {width} features, got {}",
                features.len()
            )));
        }

        let scaled;
        let input = match &self.scaler {
            Some(scaler) => {
                scaled = scaler.transform(features);
                &scaled[..]
            }
            None => features,
        };

        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect();

        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(FormcheckError::classifier("non-finite logits"));
        }
        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let sum: f64 = exps.iter().sum();
        Ok(exps.into_iter().map(|e| e / sum).collect())
    }
}

impl Classifier for LinearModel {
    fn predict(&self, features: &[f64]) -> FormcheckResult<Prediction> {
        let probabilities = self.predict_proba(features)?;
        let (best, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, p)| {
                if p > acc.1 {
                    (i, p)
                } else {
                    acc
                }
            });
        Ok(Prediction::new(self.labels[best].clone(), confidence))
    }

    fn input_len(&self) -> Option<usize> {
        self.weights.first().map(Vec::len)
    }

    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }
}

/// Replays a fixed sequence of predictions, one per call.
///
/// Once the script is exhausted every call fails, which analyzers treat as
/// a skipped frame.
#[derive(Debug, Default)]
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Prediction>>,
}

impl ScriptedClassifier {
    pub fn new(predictions: impl IntoIterator<Item = Prediction>) -> Self {
        Self {
            script: Mutex::new(predictions.into_iter().collect()),
        }
    }

    /// Script of `(label, confidence)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self::new(pairs.into_iter().map(|(l, c)| Prediction::new(l, c)))
    }

    /// Predictions left in the script.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Classifier for ScriptedClassifier {
    fn predict(&self, _features: &[f64]) -> FormcheckResult<Prediction> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| FormcheckError::classifier("scripted classifier lock poisoned"))?;
        script
            .pop_front()
            .ok_or_else(|| FormcheckError::classifier("scripted classifier exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class_model() -> LinearModel {
        LinearModel::from_json(
            "test",
            r#"{
                "labels": ["up", "down"],
                "weights": [[1.0, 0.0], [-1.0, 0.0]],
                "bias": [0.0, 0.0]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_linear_model_picks_highest_probability() {
        let model = two_class_model();
        let up = model.predict(&[2.0, 5.0]).unwrap();
        assert_eq!(up.label, "up");
        assert!(up.confidence > 0.9);

        let down = model.predict(&[-2.0, 5.0]).unwrap();
        assert_eq!(down.label, "down");
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = two_class_model();
        let probabilities = model.predict_proba(&[0.3, 0.0]).unwrap();
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_is_applied() {
        let model = LinearModel::from_json(
            "scaled",
            r#"{
                "labels": ["C", "L"],
                "weights": [[1.0], [-1.0]],
                "bias": [0.0, 0.0],
                "scaler": { "mean": [10.0], "scale": [0.0] }
            }"#,
        )
        .unwrap();
        // 9.0 is below the mean, so the "L" row wins after centering.
        assert_eq!(model.predict(&[9.0]).unwrap().label, "L");
    }

    #[test]
    fn test_wrong_feature_count_is_an_error() {
        let model = two_class_model();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(FormcheckError::Classifier { .. })
        ));
    }

    #[test]
    fn test_shape_validation() {
        let err = LinearModel::from_json(
            "broken",
            r#"{"labels": ["a", "b"], "weights": [[1.0, 2.0], [1.0]], "bias": [0.0, 0.0]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FormcheckError::ModelLoad { .. }));

        let err = LinearModel::from_json("garbage", "not json").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_prediction_helpers() {
        let p = Prediction::new("D", 0.656);
        assert_eq!(p.confident(0.6), Some("D"));
        assert_eq!(p.confident(0.7), None);
        assert_eq!(p.rounded().confidence, 0.66);

        // 0.695 is stored just below the midpoint.
        let edge = Prediction::new("D", 0.695).rounded();
        assert_eq!(edge.confidence, 0.69);
        assert_eq!(edge.confident(0.7), None);
    }

    #[test]
    fn test_scripted_classifier_replays_then_fails() {
        let classifier = ScriptedClassifier::from_pairs([("I", 0.9), ("M", 0.8)]);
        assert_eq!(classifier.predict(&[]).unwrap().label, "I");
        assert_eq!(classifier.remaining(), 1);
        assert_eq!(classifier.predict(&[]).unwrap().label, "M");
        assert!(classifier.predict(&[]).is_err());
    }
}
