//! Application configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::grid::TopologyMode;
use crate::output::ArtNetConfig;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LUMEN_GRID_CONFIG_PATH";
/// Environment variable that overrides the configured Art-Net host.
const ARTNET_HOST_ENV: &str = "LUMEN_GRID_ARTNET_HOST";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub engine: EngineSection,
    pub artnet: ArtNetConfig,
    pub server: ServerSection,
    pub storage: StorageSection,
    /// Raw color presets; validated entry by entry by the color manager.
    pub presets: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSection {
    #[serde(alias = "targetFPS")]
    pub target_fps: u32,
    pub columns: usize,
    pub rows_per_column: usize,
    pub initial_topology: TopologyMode,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            target_fps: 60,
            columns: 2,
            rows_per_column: 7,
            initial_topology: TopologyMode::Linear,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSection {
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageSection {
    /// Backing file of the effect preset store.
    pub preset_file: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            preset_file: PathBuf::from("config/effect-presets.json"),
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults
    /// when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        panels = config.engine.columns * config.engine.rows_per_column,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Some(host) = env::var_os(ARTNET_HOST_ENV)
            .map(|value| value.to_string_lossy().into_owned())
            .filter(|value| !value.is_empty())
        {
            info!(host = %host, "art-net host overridden from environment");
            self.artnet.host = host;
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
