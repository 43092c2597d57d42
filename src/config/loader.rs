use std::path::Path;

use anyhow::{Context, Result};

use super::types::Config;

/// Name of the optional config file looked up in the build context root.
pub const CONFIG_FILE: &str = ".distrofleet.yaml";

/// Load config from `.distrofleet.yaml` in the given directory, or defaults
/// if the file does not exist.
pub fn load(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_file(&path)
}

/// Load config from an explicit path. A missing file is an error.
pub fn load_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}
