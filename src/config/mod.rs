// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

/// Load configuration from a file (YAML or JSON), apply the `PORT` override
/// and validate the result.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let mut config = parse_config(path, &contents)?;
    config.apply_port_override(std::env::var(PORT_ENV).ok())?;
    config.validate()?;
    Ok(config)
}

fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        }
        _ => serde_json::from_str(contents).context("Failed to parse JSON config")?,
    };
    Ok(config)
}
