//! Print the effective analyzer thresholds.

use std::path::PathBuf;

pub fn run(file: Option<PathBuf>) -> anyhow::Result<()> {
    let config = super::load_thresholds(file.as_deref())?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid thresholds: {e}"))?;

    match &file {
        Some(path) => eprintln!("Thresholds from: {}", path.display()),
        None => eprintln!("Built-in thresholds"),
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
