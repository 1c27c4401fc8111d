// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery and indexing of module definitions found on the MODULEPATH.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;

#[cfg(test)]
#[path = "./registry_test.rs"]
mod registry_test;

use crate::definition::{family_of, Module};
use crate::{Error, Result};

/// Maximum number of suggestions offered for an unknown module name.
const MAX_SUGGESTIONS: usize = 5;

/// A definition that was skipped while building the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryWarning {
    pub path: PathBuf,
    pub name: Option<String>,
    pub message: String,
}

/// Read-only index of every valid module definition, keyed by exact name.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<Module>>,
    /// Names whose definitions failed to parse, with the reason.
    rejected: BTreeMap<String, String>,
    warnings: Vec<RegistryWarning>,
}

impl ModuleRegistry {
    /// Build a registry from already-validated modules.
    ///
    /// Later duplicates of a name are ignored.
    pub fn from_modules<I: IntoIterator<Item = Module>>(modules: I) -> Self {
        let mut registry = Self::default();
        for module in modules {
            registry.add(module);
        }
        registry
    }

    /// Scan each root in order for `*.yaml`/`*.yml` definitions.
    ///
    /// Roots earlier in the list take precedence for duplicate names. A
    /// definition that fails to parse or validate is excluded with a warning;
    /// it never prevents the rest of the registry from loading.
    pub fn from_modulepath<P: AsRef<Path>>(roots: &[P]) -> Self {
        let mut registry = Self::default();
        for root in roots {
            let root = root.as_ref();
            if !root.is_dir() {
                tracing::debug!(?root, "skipping MODULEPATH entry that is not a directory");
                continue;
            }
            let mut files = Vec::new();
            if let Err(err) = collect_definition_files(root, &mut files) {
                tracing::warn!(?root, %err, "failed to scan MODULEPATH entry");
                registry.warnings.push(RegistryWarning {
                    path: root.to_owned(),
                    name: None,
                    message: err.to_string(),
                });
                continue;
            }
            for path in files {
                registry.load_file(root, &path);
            }
        }
        tracing::debug!(
            modules = registry.modules.len(),
            skipped = registry.warnings.len(),
            "module registry ready"
        );
        registry
    }

    fn load_file(&mut self, root: &Path, path: &Path) {
        let fallback = name_from_path(root, path);
        match Module::load(path, fallback.as_deref()) {
            Ok(module) => {
                if self.modules.contains_key(&module.name) {
                    tracing::warn!(name = %module.name, ?path, "duplicate module definition ignored");
                    self.warnings.push(RegistryWarning {
                        path: path.to_owned(),
                        name: Some(module.name.clone()),
                        message: "shadowed by an earlier definition with the same name".into(),
                    });
                    return;
                }
                self.add(module);
            }
            Err(err) => {
                let name = declared_name(path).or(fallback);
                tracing::warn!(?path, %err, "excluding malformed module definition");
                if let Some(name) = &name {
                    self.rejected
                        .entry(name.clone())
                        .or_insert_with(|| err.to_string());
                }
                self.warnings.push(RegistryWarning {
                    path: path.to_owned(),
                    name,
                    message: err.to_string(),
                });
            }
        }
    }

    fn add(&mut self, module: Module) {
        self.rejected.remove(&module.name);
        self.modules
            .entry(module.name.clone())
            .or_insert_with(|| Arc::new(module));
    }

    /// Look up a module by its exact, case-sensitive name.
    pub fn find(&self, name: &str) -> Result<Arc<Module>> {
        if let Some(module) = self.modules.get(name) {
            return Ok(Arc::clone(module));
        }
        if let Some(reason) = self.rejected.get(name) {
            return Err(Error::MalformedDefinition {
                name: name.to_string(),
                reason: reason.clone(),
            });
        }
        Err(Error::NotFound {
            name: name.to_string(),
            similar: self.similar(name),
        })
    }

    /// Modules whose name contains `pattern` (all when `None`), sorted by name.
    pub fn search(&self, pattern: Option<&str>) -> Vec<Arc<Module>> {
        self.modules
            .values()
            .filter(|m| pattern.is_none_or(|p| m.name.contains(p)))
            .cloned()
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Definitions skipped while building, in discovery order.
    pub fn warnings(&self) -> &[RegistryWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn similar(&self, name: &str) -> Vec<String> {
        let family = family_of(name);
        self.modules
            .keys()
            .filter(|candidate| {
                family_of(candidate) == family
                    || candidate.contains(name)
                    || name.contains(candidate.as_str())
            })
            .take(MAX_SUGGESTIONS)
            .cloned()
            .collect()
    }
}

/// A registry built on first use and shared afterwards.
///
/// Building scans the filesystem, so commands that only touch the loaded
/// stack never pay for it. Initialization runs at most once even when
/// several threads race for it.
#[derive(Debug, Default)]
pub struct LazyRegistry {
    modulepath: Vec<PathBuf>,
    cell: OnceCell<Arc<ModuleRegistry>>,
}

impl LazyRegistry {
    pub fn new(modulepath: Vec<PathBuf>) -> Self {
        Self {
            modulepath,
            cell: OnceCell::new(),
        }
    }

    /// Wrap a registry that is already built.
    pub fn ready(registry: ModuleRegistry) -> Self {
        Self {
            modulepath: Vec::new(),
            cell: OnceCell::with_value(Arc::new(registry)),
        }
    }

    pub fn get(&self) -> Arc<ModuleRegistry> {
        Arc::clone(
            self.cell
                .get_or_init(|| Arc::new(ModuleRegistry::from_modulepath(&self.modulepath))),
        )
    }

    pub fn modulepath(&self) -> &[PathBuf] {
        &self.modulepath
    }
}

/// Recursively collect definition files below `dir`, sorted for stable
/// precedence. Hidden files and directories are skipped.
fn collect_definition_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_none_or(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            collect_definition_files(&path, files)?;
        } else if is_definition_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn is_definition_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Derive a module name from a definition's location, e.g.
/// `<root>/gcc/9.3.yaml` becomes `gcc/9.3`.
fn name_from_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let segments = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}

/// Best-effort read of the `name:` field from a definition that failed to
/// validate, so commands naming it can report why it is unavailable.
fn declared_name(path: &Path) -> Option<String> {
    let yaml = std::fs::read_to_string(path).ok()?;
    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).ok()?;
    value.get("name")?.as_str().map(String::from)
}
