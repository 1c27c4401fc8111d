// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Saved collections: named snapshots of the loaded module set.
//!
//! Collections are the only state modenv keeps outside the shell
//! environment, and only when the user asks for it with `module save`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::registry::ModuleRegistry;
use crate::stack::ModuleStack;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./collection_test.rs"]
mod collection_test;

/// Collection used when no name is given.
pub const DEFAULT_COLLECTION: &str = "default";

const COLLECTION_EXTENSION: &str = "yaml";

/// Collection file API version.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub enum CollectionApiVersion {
    #[serde(rename = "modenv/v0/collection")]
    V0,
}

/// A saved, ordered set of modules.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Collection {
    pub api: CollectionApiVersion,
    pub generated: GenerationMetadata,
    pub modules: Vec<CollectedModule>,
}

/// Metadata about when and where the collection was saved.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GenerationMetadata {
    pub timestamp: DateTime<Utc>,
    pub modenv_version: String,
    pub hostname: String,
}

/// One module in a collection, in load order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CollectedModule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// A difference between a collection and the current registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChange {
    pub kind: CollectionChangeKind,
    pub name: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChangeKind {
    DefinitionChanged,
    DefinitionRemoved,
}

impl Collection {
    /// Snapshot the loaded stack in load order.
    pub fn capture(stack: &ModuleStack) -> Self {
        let modules = stack
            .list()
            .iter()
            .map(|entry| CollectedModule {
                name: entry.name.clone(),
                sha256: entry.source_digest.clone(),
            })
            .collect();

        Self {
            api: CollectionApiVersion::V0,
            generated: GenerationMetadata {
                timestamp: Utc::now(),
                modenv_version: env!("CARGO_PKG_VERSION").to_string(),
                hostname: hostname::get()
                    .ok()
                    .and_then(|h| h.into_string().ok())
                    .unwrap_or_else(|| "unknown".to_string()),
            },
            modules,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = match std::fs::read_to_string(path) {
            Ok(yaml) => yaml,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::CollectionNotFound(path.to_path_buf()));
            }
            Err(error) => {
                return Err(Error::ReadFailed {
                    path: path.to_path_buf(),
                    error,
                });
            }
        };
        serde_yaml::from_str(&yaml).map_err(|e| Error::InvalidCollection {
            name: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Write the collection, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).map_err(|e| Error::InvalidCollection {
            name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, yaml)?;
        tracing::debug!(?path, modules = self.modules.len(), "saved collection");
        Ok(())
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    /// Compare recorded definition digests with what the registry holds now.
    pub fn verify(&self, registry: &ModuleRegistry) -> Vec<CollectionChange> {
        let mut changes = Vec::new();
        for collected in &self.modules {
            let Ok(module) = registry.find(&collected.name) else {
                changes.push(CollectionChange {
                    kind: CollectionChangeKind::DefinitionRemoved,
                    name: collected.name.clone(),
                    expected: collected.sha256.clone(),
                    actual: None,
                });
                continue;
            };
            if let (Some(expected), Some(actual)) = (&collected.sha256, &module.source_digest) {
                if expected != actual {
                    changes.push(CollectionChange {
                        kind: CollectionChangeKind::DefinitionChanged,
                        name: collected.name.clone(),
                        expected: Some(expected.clone()),
                        actual: Some(actual.clone()),
                    });
                }
            }
        }
        changes
    }
}

/// Location of the collection `name` inside `dir`.
pub fn collection_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !valid {
        return Err(Error::InvalidCollection {
            name: name.to_string(),
            reason: "names may only contain letters, digits, '.', '-' and '_'".to_string(),
        });
    }
    Ok(dir.join(format!("{name}.{COLLECTION_EXTENSION}")))
}

/// Names of the collections saved in `dir`, sorted.
pub fn list_collections(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(COLLECTION_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}
