//! CLI configuration management.
//!
//! Values come from, in order of precedence: environment variables (a `.env`
//! file is read first), the JSON config file in the platform config
//! directory, and built-in defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use gridclock_automaton::EngineConfig;
use serde::{Deserialize, Serialize};

/// Application-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace root holding the `.gridclock` preset store.
    pub store_dir: PathBuf,

    /// Optional engine timing file (JSON).
    #[serde(default)]
    pub engine_config: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let store_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("gridclock"));

        Self {
            store_dir,
            engine_config: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "gridclock", "gclk")
}

impl Config {
    /// Load configuration from environment variables and config file.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path).with_context(|| {
                    format!("Failed to read config from {}", config_path.display())
                })?;
                config = serde_json::from_str(&contents)
                    .with_context(|| "Failed to parse config file")?;
            }
        }

        // Env vars win over the file
        if let Ok(store_dir) = std::env::var("GCLK_STORE_DIR") {
            config.store_dir = PathBuf::from(store_dir);
        }
        if let Ok(engine_config) = std::env::var("GCLK_ENGINE_CONFIG") {
            config.engine_config = Some(PathBuf::from(engine_config));
        }

        Ok(config)
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Engine timing, from the configured file or defaults.
    pub fn engine(&self) -> Result<EngineConfig> {
        match &self.engine_config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("Failed to load engine config {}", path.display())),
            None => Ok(EngineConfig::default()),
        }
    }
}
