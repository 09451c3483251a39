//! Reading config documents from disk.

use super::{
    ConfigLayer, ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, LoadedLayer, schema,
};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Parse json5 text into a JSON value, labelling syntax errors.
pub(super) fn parse_document(contents: &str, label: &str) -> Result<Value, ConfigError> {
    json5::from_str(contents).map_err(|source| ConfigError::Syntax {
        label: label.to_string(),
        source,
    })
}

/// Read and parse a json5 document.
pub(super) fn read_document(path: &Path, label: &str) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|err| ConfigError::io(path, err))?;
    parse_document(&contents, label)
}

/// Layer at `path`, or `None` when the file does not exist.
pub(super) fn load_optional_layer(
    source: ConfigLayerSource,
    path: &Path,
) -> Result<Option<LoadedLayer>, ConfigError> {
    match load_required_layer(source, path) {
        Ok(layer) => Ok(Some(layer)),
        Err(ConfigError::Io { source: err, .. }) if err.kind() == ErrorKind::NotFound => {
            debug!("no {} layer (path={})", source.label(), path.display());
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Layer at `path`; a missing file is an error.
pub(super) fn load_required_layer(
    source: ConfigLayerSource,
    path: &Path,
) -> Result<LoadedLayer, ConfigError> {
    let label = format!("{}({})", source.label(), path.display());
    debug!("reading config layer {label}");
    let value = read_document(path, &label)?;
    schema::validate_layer_schema(&value, &label)?;
    Ok(LoadedLayer {
        meta: ConfigLayer {
            source,
            path: Some(path.to_path_buf()),
        },
        value,
    })
}

/// Canonical form of `path`, or the path itself when it cannot be resolved.
///
/// Used both for the cwd and for de-duplicating layers that point at the
/// same file.
pub(super) fn resolved(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// `~/.reprise/reprise.json5`, when a home directory is known.
pub(super) fn default_user_config_path() -> Option<PathBuf> {
    UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}
