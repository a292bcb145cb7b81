use crate::pipeline::AnalysisConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse an analysis config from TOML; absent keys keep their defaults.
pub fn parse_config(text: &str) -> Result<AnalysisConfig> {
    let config: AnalysisConfig = toml::from_str(text).context("parsing analysis config")?;
    config.validate()?;
    Ok(config)
}

pub fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid config {}", path.display()))
}
