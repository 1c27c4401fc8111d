// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The ordered record of loaded modules.

use serde::{Deserialize, Serialize};

use crate::definition::Module;
use crate::diff::InverseDiff;

#[cfg(test)]
#[path = "./stack_test.rs"]
mod stack_test;

/// A loaded module and the undo information captured when it was applied.
///
/// The constraints are copied from the definition at load time so that
/// unloading never depends on the definition still being available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedEntry {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_digest: Option<String>,
    pub inverse: InverseDiff,
}

impl LoadedEntry {
    pub fn new(module: &Module, inverse: InverseDiff) -> Self {
        Self {
            name: module.name.clone(),
            version: module.version.clone(),
            prerequisites: module.prerequisites.clone(),
            conflicts: module.conflicts.clone(),
            source_digest: module.source_digest.clone(),
            inverse,
        }
    }
}

/// Loaded modules in load order. A name appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleStack {
    entries: Vec<LoadedEntry>,
}

impl ModuleStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly loaded module on top of the stack.
    ///
    /// Returns false, leaving the stack untouched, if the name is already present.
    pub fn push(&mut self, entry: LoadedEntry) -> bool {
        if self.contains(&entry.name) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Remove a module wherever it sits, preserving the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<LoadedEntry> {
        let index = self.position(name)?;
        Some(self.entries.remove(index))
    }

    /// Entries in load order.
    pub fn list(&self) -> &[LoadedEntry] {
        &self.entries
    }

    /// Entries in unload-safe order, the exact reverse of load order.
    pub fn reverse(&self) -> impl Iterator<Item = &LoadedEntry> {
        self.entries.iter().rev()
    }

    /// Entries from `index` to the top of the stack.
    pub fn above_mut(&mut self, index: usize) -> impl Iterator<Item = &mut LoadedEntry> {
        self.entries.iter_mut().skip(index)
    }

    pub fn get(&self, name: &str) -> Option<&LoadedEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
