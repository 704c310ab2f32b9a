//! Explicit, process-lifetime store of loaded classifiers.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use formcheck_common::error::{FormcheckError, FormcheckResult};

use crate::classifier::{Classifier, LinearModel};

/// Identifies one classifier artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKey {
    PlankPosture,
    BicepCurlPosture,
    SquatStage,
    LungeStage,
    LungeKneeOverToe,
}

impl ModelKey {
    pub const ALL: [ModelKey; 5] = [
        ModelKey::PlankPosture,
        ModelKey::BicepCurlPosture,
        ModelKey::SquatStage,
        ModelKey::LungeStage,
        ModelKey::LungeKneeOverToe,
    ];

    /// File stem of the artifact inside a models directory.
    pub fn file_stem(&self) -> &'static str {
        match self {
            ModelKey::PlankPosture => "plank_posture",
            ModelKey::BicepCurlPosture => "bicep_curl_posture",
            ModelKey::SquatStage => "squat_stage",
            ModelKey::LungeStage => "lunge_stage",
            ModelKey::LungeKneeOverToe => "lunge_knee_over_toe",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.file_stem())
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.file_stem())
    }
}

/// Classifiers shared by every analyzer built from this registry.
///
/// Built once at startup and passed by reference into analyzer
/// constructors; classifiers are never mutated after insertion.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<ModelKey, Arc<dyn Classifier>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `<key>.json` artifact present in `dir`.
    ///
    /// Absent artifacts are not an error here; the analyzer needing them
    /// fails at construction instead. A present but corrupt artifact is.
    pub fn load_dir(dir: &Path) -> FormcheckResult<Self> {
        if !dir.is_dir() {
            return Err(FormcheckError::FileNotFound {
                path: dir.to_path_buf(),
            });
        }

        let mut registry = Self::new();
        for key in ModelKey::ALL {
            let path = dir.join(key.file_name());
            if !path.is_file() {
                tracing::debug!(model = %key, path = %path.display(), "Model artifact not present");
                continue;
            }
            let model = LinearModel::load(&path)?;
            tracing::info!(
                model = %key,
                labels = ?model.labels,
                "Loaded classifier"
            );
            registry.insert(key, Arc::new(model));
        }
        Ok(registry)
    }

    pub fn insert(&mut self, key: ModelKey, classifier: Arc<dyn Classifier>) {
        self.models.insert(key, classifier);
    }

    /// Builder-style insert.
    pub fn with(mut self, key: ModelKey, classifier: Arc<dyn Classifier>) -> Self {
        self.insert(key, classifier);
        self
    }

    pub fn get(&self, key: ModelKey) -> Option<Arc<dyn Classifier>> {
        self.models.get(&key).cloned()
    }

    pub fn contains(&self, key: ModelKey) -> bool {
        self.models.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Fetch a classifier for an analyzer whose feature vectors have
    /// `input_len` values.
    pub fn require(&self, key: ModelKey, input_len: usize) -> FormcheckResult<Arc<dyn Classifier>> {
        let classifier = self
            .get(key)
            .ok_or_else(|| FormcheckError::model_load(key.file_stem(), "model not loaded"))?;

        match classifier.input_len() {
            Some(expected) if expected != input_len => Err(FormcheckError::model_load(
                key.file_stem(),
                format!("model expects {expected} features but analyzer produces {input_len}"),
            )),
            _ => Ok(classifier),
        }
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.models.keys().collect();
        keys.sort();
        f.debug_struct("ModelRegistry").field("models", &keys).finish()
    }
}
