// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! User configuration.
//!
//! Values are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. `$MODENV_CONFIG`, or `<config dir>/modenv/config.yaml` when present
//! 3. `MODULEPATH`, `MODENV_AUTO_LOAD` and `MODENV_COLLECTIONS`
//!
//! ```yaml
//! # ~/.config/modenv/config.yaml
//! modulepath:
//!   - ~/modulefiles
//!   - /opt/site/modulefiles
//! auto_load_prerequisites: false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentState;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Names an explicit configuration file.
pub const CONFIG_ENV: &str = "MODENV_CONFIG";
/// Colon-separated list of directories holding module definitions.
pub const MODULEPATH_ENV: &str = "MODULEPATH";
/// Enables loading missing prerequisites automatically.
pub const AUTO_LOAD_ENV: &str = "MODENV_AUTO_LOAD";
/// Directory for saved collections.
pub const COLLECTIONS_ENV: &str = "MODENV_COLLECTIONS";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Definition roots, searched in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modulepath: Vec<String>,

    /// Load missing prerequisites instead of refusing (default: false).
    #[serde(default)]
    pub auto_load_prerequisites: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration for the current process.
    pub fn load() -> Result<Self> {
        Self::load_with_env(&EnvironmentState::capture())
    }

    /// Load configuration using `env` in place of the process environment.
    pub fn load_with_env(env: &EnvironmentState) -> Result<Self> {
        let mut config = match env.get(CONFIG_ENV).filter(|p| !p.is_empty()) {
            Some(path) => Self::read(Path::new(path))?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::read(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(env);
        Ok(config)
    }

    /// `<config dir>/modenv/config.yaml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("modenv").join("config.yaml"))
    }

    fn read(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;
        tracing::debug!(?path, "reading configuration");
        Self::from_yaml(&yaml)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Override file values with those present in `env`.
    pub fn apply_env(&mut self, env: &EnvironmentState) {
        if let Some(modulepath) = env.get(MODULEPATH_ENV) {
            let entries: Vec<String> = modulepath
                .split(':')
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect();
            if !entries.is_empty() {
                self.modulepath = entries;
            }
        }
        if let Some(value) = env.get(AUTO_LOAD_ENV) {
            self.auto_load_prerequisites = is_truthy(value);
        }
        if let Some(dir) = env.get(COLLECTIONS_ENV).filter(|d| !d.is_empty()) {
            self.collections_dir = Some(PathBuf::from(dir));
        }
    }

    /// MODULEPATH entries with `~` expanded, canonicalized where they exist.
    pub fn modulepath_dirs(&self) -> Vec<PathBuf> {
        self.modulepath
            .iter()
            .filter_map(|entry| expand_home(entry))
            .map(|path| dunce::canonicalize(&path).unwrap_or(path))
            .collect()
    }

    /// Where collections are saved.
    pub fn collections_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.collections_dir {
            return expand_home(&dir.to_string_lossy()).ok_or_else(|| {
                Error::Config("Cannot resolve ~ without HOME".to_string())
            });
        }
        dirs::data_dir()
            .map(|d| d.join("modenv").join("collections"))
            .ok_or_else(|| {
                Error::Config(format!(
                    "no data directory available, set {COLLECTIONS_ENV}"
                ))
            })
    }
}

/// Interpret an environment flag the way the rest of the toolchain does.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Resolve a leading `~` against the home directory.
fn expand_home(entry: &str) -> Option<PathBuf> {
    if entry == "~" {
        return dirs::home_dir();
    }
    match entry.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir();
            if home.is_none() {
                tracing::warn!(%entry, "cannot resolve ~ without HOME, skipping");
            }
            Some(home?.join(rest))
        }
        None => Some(PathBuf::from(entry)),
    }
}
