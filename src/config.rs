use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("SNAPMATCH_CONFIG_PATH").unwrap_or("/usr/local/etc/snapmatch/config.toml"))
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Minimum cosine similarity for a candidate to count as a match
    pub threshold: f32,
    /// Address the HTTP service binds to
    pub bind: String,
    /// Path to the CLIP visual encoder ONNX file
    pub model: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            bind: "127.0.0.1:5001".to_string(),
            model: PathBuf::from("/usr/local/share/snapmatch/clip_vit_b32_visual.onnx"),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}
