pub mod analyze;
pub mod config;
pub mod models;
pub mod thresholds;

use std::path::Path;

use formcheck_analysis_core::AnalysisConfig;

/// Thresholds from `path` if given, otherwise the built-in defaults.
pub fn load_thresholds(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load thresholds: {e}")),
        None => Ok(AnalysisConfig::default()),
    }
}
