//! Show or initialize the application config.

use formcheck_common::config::AppConfig;

pub fn run(config: &AppConfig, save: bool) -> anyhow::Result<()> {
    let path = AppConfig::path();
    if save {
        if path.exists() {
            anyhow::bail!("Config already exists at {}", path.display());
        }
        config.save()?;
        println!("Config written to: {}", path.display());
        return Ok(());
    }

    let source = if path.exists() { "file" } else { "defaults" };
    eprintln!("Config ({source}): {}", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
