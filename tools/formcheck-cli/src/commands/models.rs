//! Inspect a models directory.

use std::path::PathBuf;

use formcheck_analysis_core::{Analyzer, AnalysisConfig, Classifier, ModelKey, ModelRegistry};
use formcheck_pose_model::exercise::ExerciseKind;

pub fn run(dir: PathBuf) -> anyhow::Result<()> {
    println!("Models in: {}", dir.display());

    let registry = ModelRegistry::load_dir(&dir)
        .map_err(|e| anyhow::anyhow!("Failed to load models: {e}"))?;

    for key in ModelKey::ALL {
        match registry.get(key) {
            Some(classifier) => {
                let width = classifier
                    .input_len()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "  {:<22} loaded  ({} features, labels: {})",
                    key,
                    width,
                    classifier.labels().join(", ")
                );
            }
            None => println!("  {:<22} missing ({})", key, key.file_name()),
        }
    }

    println!("\nAnalyzers:");
    let config = AnalysisConfig::default();
    let mut ready = 0;
    for kind in ExerciseKind::ALL {
        match Analyzer::new(kind, &registry, &config) {
            Ok(_) => {
                ready += 1;
                println!("  {kind:<11} ready");
            }
            Err(e) => println!("  {kind:<11} unavailable: {e}"),
        }
    }
    println!("\n{ready}/{} analyzers can be built.", ExerciseKind::ALL.len());

    Ok(())
}
