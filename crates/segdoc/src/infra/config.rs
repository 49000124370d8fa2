//! Configuration management utilities.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace configuration file looked up in the current directory.
pub const WORKSPACE_CONFIG_FILE: &str = ".segmentedrc";

/// Errors raised while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error parsing configuration file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Effective settings after layering defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub source_folder: String,
    pub output_folder: String,
    pub barecode_extension: String,
    pub docstring_extension: String,
    pub recursion: bool,
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_folder: "segmented_src".into(),
            output_folder: "src".into(),
            barecode_extension: ".barecode.py".into(),
            docstring_extension: ".docstring.py".into(),
            recursion: true,
            dry_run: false,
        }
    }
}

/// One configuration source; unset keys fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct Layer {
    source_folder: Option<String>,
    output_folder: Option<String>,
    barecode_extension: Option<String>,
    docstring_extension: Option<String>,
    recursion: Option<bool>,
    dry_run: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    segmented_docstring: Option<Layer>,
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    output_folder: Option<String>,
    dry_run: Option<bool>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            output_folder: env::var("SEGDOC_OUTPUT_FOLDER").ok(),
            dry_run: env::var("SEGDOC_DRY_RUN").ok().and_then(|raw| parse_flag(&raw)),
        }
    }

    #[cfg(test)]
    fn for_tests(output_folder: &str, dry_run: bool) -> Self {
        Self {
            output_folder: Some(output_folder.to_owned()),
            dry_run: Some(dry_run),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from defaults, user config, `.segmentedrc` in the current
    /// directory, and env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let workspace = env::current_dir()
            .ok()
            .map(|cwd| cwd.join(WORKSPACE_CONFIG_FILE));
        Self::load_with_layers(global_config_path(), workspace, EnvOverrides::from_env())
    }

    /// Load configuration using an explicit workspace file instead of `.segmentedrc`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_layers(
            global_config_path(),
            Some(path.to_path_buf()),
            EnvOverrides::from_env(),
        )
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(global_path) = global.filter(|path| path.exists()) {
            config = config.merge(Self::read_layer(&global_path)?);
        }

        if let Some(workspace_path) = workspace {
            if workspace_path.exists() {
                config = config.merge(Self::read_layer(&workspace_path)?);
                tracing::info!(path = %workspace_path.display(), "configuration loaded");
            } else {
                tracing::warn!(
                    path = %workspace_path.display(),
                    "configuration file not found, using defaults"
                );
            }
        }

        let config = apply_env_overrides(config, env_overrides);
        tracing::debug!(?config, "final configuration");
        Ok(config)
    }

    fn read_layer(path: &Path) -> Result<Layer, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_layer(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse_layer(contents: &str) -> Result<Layer, toml::de::Error> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.segmented_docstring.unwrap_or_default())
    }

    fn merge(mut self, layer: Layer) -> Self {
        if let Some(value) = layer.source_folder {
            self.source_folder = value;
        }
        if let Some(value) = layer.output_folder {
            self.output_folder = value;
        }
        if let Some(value) = layer.barecode_extension {
            self.barecode_extension = value;
        }
        if let Some(value) = layer.docstring_extension {
            self.docstring_extension = value;
        }
        if let Some(value) = layer.recursion {
            self.recursion = value;
        }
        if let Some(value) = layer.dry_run {
            self.dry_run = value;
        }
        self
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("segdoc/config.toml"))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(output_folder) = env.output_folder {
        config.output_folder = output_folder;
    }
    if let Some(dry_run) = env.dry_run {
        config.dry_run = dry_run;
    }
    config
}
