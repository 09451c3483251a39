//! `reprise.json5` discovery and layering.
//!
//! Each file layer is shape-checked on its own, merged as JSON, decoded once,
//! and then the `EMBEDDING_*` env overrides are applied on top.

mod layer_io;
mod merge;
mod schema;


use crate::{ConfigError, ReplayConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "reprise.json5";
const DEFAULT_CONFIG_DIR: &str = ".reprise";

/// Resolved config and the layers it was built from, lowest first.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: ReplayConfig,
    pub layers: Vec<ConfigLayer>,
}

/// Where a layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// `~/.reprise/reprise.json5`.
    User,
    /// `./reprise.json5`.
    Cwd,
    /// `--config` files.
    Runtime,
    /// `EMBEDDING_MODEL` / `EMBEDDING_BASE_URL`.
    Env,
}

impl ConfigLayerSource {
    /// Short name used in logs and error labels.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Cwd => "cwd",
            Self::Runtime => "runtime",
            Self::Env => "env",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    /// `None` for the env layer.
    pub path: Option<PathBuf>,
}

/// Where to look for layers.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    pub cwd: PathBuf,
    /// `None` skips the user layer.
    pub user_config_path: Option<PathBuf>,
    /// Required layers, applied in order after the cwd layer.
    pub runtime_paths: Vec<PathBuf>,
    /// Apply `EMBEDDING_*` env overrides last.
    pub apply_env: bool,
}

impl LayeredConfigOptions {
    /// Defaults: home user layer, env overrides on.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            apply_env: true,
        }
    }

    /// Append a required `--config` layer.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl ReplayConfig {
    /// Read one config file with no layering and no env overrides.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        debug!("reading single config (path={label})");
        let value = layer_io::read_document(path, &label)?;
        config_from_value(value, &label)
    }

    /// Parse json5 text with no layering and no env overrides.
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        let value = layer_io::parse_document(contents, "inline")?;
        config_from_value(value, "inline")
    }

    /// Layered load with the default user and cwd locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Layered load; precedence low to high is user, cwd, runtime, env.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = layer_io::resolved(&options.cwd);
        let file_layers = options
            .user_config_path
            .iter()
            .map(|path| (ConfigLayerSource::User, path.clone()))
            .chain(std::iter::once((
                ConfigLayerSource::Cwd,
                cwd.join(DEFAULT_CONFIG_FILE),
            )));

        let mut seen = HashSet::new();
        let mut loaded = Vec::new();
        for (source, path) in file_layers {
            if !seen.insert(layer_io::resolved(&path)) {
                debug!(
                    "layer already loaded (source={}, path={})",
                    source.label(),
                    path.display()
                );
                continue;
            }
            loaded.extend(layer_io::load_optional_layer(source, &path)?);
        }
        for path in &options.runtime_paths {
            loaded.push(layer_io::load_required_layer(
                ConfigLayerSource::Runtime,
                path,
            )?);
        }

        let mut merged = Value::Object(serde_json::Map::new());
        let mut layers = Vec::with_capacity(loaded.len() + 1);
        for layer in loaded {
            merge::merge_json_values(&mut merged, &layer.value);
            layers.push(layer.meta);
        }

        let mut config = config_from_value(merged, "merged config")?;
        if options.apply_env {
            let applied = config.apply_env_overrides();
            if !applied.is_empty() {
                debug!("env overrides applied (vars={})", applied.join(","));
                config.validate()?;
                layers.push(ConfigLayer {
                    source: ConfigLayerSource::Env,
                    path: None,
                });
            }
        }
        info!(
            "config resolved (layers={}, matcher={:?}, model={})",
            layers.len(),
            config.replay.matcher,
            config.embedding.model
        );
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let replay = &self.replay;
        for (path, value) in [
            ("replay.threshold", replay.threshold),
            ("replay.text_threshold", Some(replay.text_threshold)),
            ("replay.vector_threshold", Some(replay.vector_threshold)),
        ] {
            if let Some(value) = value.filter(|value| !(0.0..=1.0).contains(value)) {
                return Err(ConfigError::InvalidField {
                    path: path.to_string(),
                    message: format!("threshold must be within 0.0..=1.0 (got {value})"),
                });
            }
        }
        if self.embedding.model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "embedding.model cannot be empty".to_string(),
            ));
        }
        if self.embedding.api_key_env.is_empty() {
            return Err(ConfigError::Invalid(
                "embedding.api_key_env requires at least one variable name".to_string(),
            ));
        }
        if self.embedding.max_batch_size == Some(0) {
            return Err(ConfigError::Invalid(
                "embedding.max_batch_size must be positive".to_string(),
            ));
        }
        if self.embedding.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "embedding.timeout_secs must be positive".to_string(),
            ));
        }
        if self.cache.suffix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "cache.suffix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<ReplayConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: ReplayConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
