use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use panelkit_core::MediaCacheConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::telemetry::DEFAULT_DIRECTIVES;

pub const CONFIG_PATH_ENV: &str = "PANELKIT_CACHE_CONFIG_PATH";
pub const CONFIG_JSON_ENV: &str = "PANELKIT_CACHE_CONFIG_JSON";

const DEFAULT_FILES: &[&str] = &[
    "panelkit-cache.toml",
    "panelkit-cache.json",
    "config/panelkit-cache.toml",
    "config/panelkit-cache.json",
];

/// Where the active settings came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::Default => {
                info!("media cache config: built-in defaults")
            }
            ConfigSource::EnvPath(path) => {
                info!(
                    path = %path.display(),
                    "media cache config loaded from env path"
                )
            }
            ConfigSource::EnvInline => {
                info!("media cache config loaded from inline environment json")
            }
            ConfigSource::File(path) => {
                info!(
                    path = %path.display(),
                    "media cache config loaded from file"
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_DIRECTIVES.to_string(),
        }
    }
}

/// Settings file layout:
///
/// ```toml
/// [cache]
/// ttl = "30h"
/// max_resident_handles = 200
/// eviction_order = "access"
///
/// [cache.retry]
/// base_delay = "500ms"
///
/// [logging]
/// filter = "info,panelkit_core=debug"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaCacheSettings {
    pub cache: MediaCacheConfig,
    pub logging: LoggingSettings,
}

impl MediaCacheSettings {
    /// Evaluation order:
    /// 1) `$PANELKIT_CACHE_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$PANELKIT_CACHE_CONFIG_JSON` (inline JSON),
    /// 3) a default file in the working directory,
    /// 4) defaults.
    ///
    /// A `.env` file in the working directory is loaded first.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        dotenvy::dotenv().ok();
        let cwd = env::current_dir()
            .context("failed to read the current directory")?;
        Self::load_from_sources(
            non_blank_var(CONFIG_PATH_ENV),
            non_blank_var(CONFIG_JSON_ENV),
            &cwd,
        )
    }

    /// [`load_from_env`](Self::load_from_env) with the environment lookups
    /// already done; default files are searched under `base_dir`.
    pub fn load_from_sources(
        env_path: Option<String>,
        env_json: Option<String>,
        base_dir: &Path,
    ) -> anyhow::Result<(Self, ConfigSource)> {
        let (settings, source) = if let Some(path) = env_path {
            let path = PathBuf::from(path);
            (Self::load_from_file(&path)?, ConfigSource::EnvPath(path))
        } else if let Some(raw) = env_json {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_ENV}"))?;
            (parsed, ConfigSource::EnvInline)
        } else if let Some(path) = find_default_file(base_dir) {
            (Self::load_from_file(&path)?, ConfigSource::File(path))
        } else {
            (Self::default(), ConfigSource::Default)
        };

        settings.cache.validate().with_context(|| {
            format!("invalid media cache config from {source:?}")
        })?;
        Ok((settings, source))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read media cache config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid media cache config {}", path.display())
            }),
            Some("toml") => toml::from_str(&contents).map_err(|err| {
                anyhow!(
                    "invalid media cache config {}: {}",
                    path.display(),
                    err
                )
            }),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    /// Try TOML, then JSON.
    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse media cache config {}: \
                     toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid media cache config json: {err}"))
    }
}

fn non_blank_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
    DEFAULT_FILES
        .iter()
        .map(|candidate| base_dir.join(candidate))
        .find(|path| path.exists())
}
