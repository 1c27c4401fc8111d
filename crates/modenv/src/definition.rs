// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Module definition parsing and the validated [`Module`] data type.
//!
//! Definitions are pure data. Nothing in a definition file is evaluated;
//! parsing either yields a fully validated [`Module`] or fails.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::environment::{deserialize_optional_scalar, EnvOp};
use crate::{Error, Result, LOADED_MODULES_VAR, SESSION_VAR};

#[cfg(test)]
#[path = "./definition_test.rs"]
mod definition_test;

static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid variable name pattern"));

/// API version for definition files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "modenv/v0")]
    V0,
}

/// Helper for two-stage deserialization to determine API version first.
#[derive(Deserialize)]
struct ApiVersionMapping {
    #[serde(default)]
    api: ApiVersion,
}

/// Raw contents of a module definition file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDefinition {
    /// API version identifier.
    #[serde(default)]
    pub api: ApiVersion,

    /// Full module name, e.g. `gcc/9.3`.
    /// Defaults to the file's path relative to its MODULEPATH root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Defaults to the last `/` segment of the name.
    #[serde(
        default,
        deserialize_with = "deserialize_optional_scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,

    /// One-line summary shown by `avail` and `whatis`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatis: Option<String>,

    /// Multi-line text shown by `help`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    /// Modules that must already be loaded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,

    /// Modules that must not be loaded at the same time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,

    /// Environment edits, applied in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<EnvOp>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,

    /// SHA-256 of the file contents (not serialized).
    #[serde(skip)]
    pub source_digest: Option<String>,
}

/// A validated, immutable module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub version: String,
    pub operations: Vec<EnvOp>,
    pub prerequisites: Vec<String>,
    pub conflicts: Vec<String>,
    pub whatis: String,
    pub help: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_digest: Option<String>,
}

impl ModuleDefinition {
    /// Parse a definition from YAML.
    pub fn from_yaml<S: Into<String>>(yaml: S) -> Result<Self> {
        Self::parse(&yaml.into(), None)
    }

    /// Load a definition from a file, recording its path and digest.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| Error::ReadFailed {
            path: path.to_path_buf(),
            error: e,
        })?;

        let mut definition = Self::parse(&yaml, Some(path))?;
        definition.source_path = Some(path.to_path_buf());
        definition.source_digest = Some(format!("{:x}", Sha256::digest(yaml.as_bytes())));
        Ok(definition)
    }

    fn parse(yaml: &str, path: Option<&Path>) -> Result<Self> {
        let invalid = |error| Error::InvalidYaml {
            origin: origin_of(path),
            error,
        };

        // Stage 1: Parse to get API version
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(invalid)?;
        if value.is_null() {
            return Err(Error::InvalidDefinition {
                origin: origin_of(path),
                reason: "file is empty".to_string(),
            });
        }
        let with_version: ApiVersionMapping =
            serde_yaml::from_value(value.clone()).map_err(invalid)?;

        // Stage 2: Deserialize based on version
        match with_version.api {
            ApiVersion::V0 => serde_yaml::from_value(value).map_err(invalid),
        }
    }

    /// Validate and convert into a [`Module`].
    ///
    /// `fallback_name` is used when the definition does not name itself,
    /// normally the file path relative to its MODULEPATH root.
    pub fn into_module(self, fallback_name: Option<&str>) -> Result<Module> {
        let origin = origin_of(self.source_path.as_deref());
        let fail = |reason: String| Error::InvalidDefinition {
            origin: origin.clone(),
            reason,
        };

        let name = self
            .name
            .clone()
            .or_else(|| fallback_name.map(String::from))
            .ok_or_else(|| fail("'name' is required".to_string()))?;
        validate_name(&name).map_err(&fail)?;

        let version = match self.version {
            Some(version) if version.trim().is_empty() => {
                return Err(fail("'version' must not be empty".to_string()));
            }
            Some(version) => version,
            None => match name.rsplit_once('/') {
                Some((_, version)) => version.to_string(),
                None => {
                    return Err(fail(format!(
                        "'version' is required when the name '{name}' has no version segment"
                    )));
                }
            },
        };

        let whatis = self.whatis.unwrap_or_default().trim().to_string();
        if whatis.contains('\n') {
            return Err(fail("'whatis' must be a single line".to_string()));
        }

        for op in &self.environment {
            validate_operation(op).map_err(&fail)?;
        }
        // a module may conflict with its own family (`gcc/9.3` excluding `gcc`),
        // but never require itself
        validate_references("prerequisites", &self.prerequisites, |e| {
            reference_matches(e, &name)
        })
        .map_err(&fail)?;
        validate_references("conflicts", &self.conflicts, |e| e == name).map_err(&fail)?;

        Ok(Module {
            name,
            version,
            operations: self.environment,
            prerequisites: self.prerequisites,
            conflicts: self.conflicts,
            whatis,
            help: self.help.unwrap_or_default(),
            source_path: self.source_path,
            source_digest: self.source_digest,
        })
    }
}

impl Module {
    /// Load and validate a single definition file.
    pub fn load<P: AsRef<Path>>(path: P, fallback_name: Option<&str>) -> Result<Self> {
        ModuleDefinition::load(path)?.into_module(fallback_name)
    }

    /// The name without its version segment, e.g. `gcc` for `gcc/9.3`.
    pub fn family(&self) -> &str {
        family_of(&self.name)
    }

    /// Variables touched by this module, in first-touch order.
    pub fn variables(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for op in &self.operations {
            if !seen.contains(&op.variable()) {
                seen.push(op.variable());
            }
        }
        seen
    }
}

/// The name without its final `/` segment, or the whole name when there is none.
pub fn family_of(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(family, _)| family)
}

/// Whether a prerequisite or conflict entry refers to the module `name`.
///
/// An entry matches its exact name or any version beneath it, so `gcc`
/// matches `gcc/9.3`.
pub fn reference_matches(entry: &str, name: &str) -> bool {
    name == entry
        || name
            .strip_prefix(entry)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn origin_of(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<inline>".to_string())
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("'name' must not be empty".to_string());
    }
    if name.chars().any(char::is_whitespace) {
        return Err(format!("name '{name}' must not contain whitespace"));
    }
    if name.contains(':') {
        return Err(format!("name '{name}' must not contain ':'"));
    }
    if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        return Err(format!("name '{name}' has an empty path segment"));
    }
    Ok(())
}

fn validate_operation(op: &EnvOp) -> std::result::Result<(), String> {
    let variable = op.variable();
    if !VARIABLE_NAME.is_match(variable) {
        return Err(format!("'{variable}' is not a valid environment variable name"));
    }
    if variable == LOADED_MODULES_VAR || variable == SESSION_VAR {
        return Err(format!("'{variable}' is reserved for session bookkeeping"));
    }
    match op {
        EnvOp::Prepend(_) | EnvOp::Append(_) => {
            if op.value().is_some_and(str::is_empty) {
                return Err(format!("{} to '{variable}' needs a non-empty value", op.kind()));
            }
            if op.separator().is_empty() {
                return Err(format!("{} to '{variable}' has an empty separator", op.kind()));
            }
        }
        EnvOp::Set(_) | EnvOp::Unset(_) => {}
    }
    Ok(())
}

fn validate_references(
    field: &str,
    entries: &[String],
    refers_to_self: impl Fn(&str) -> bool,
) -> std::result::Result<(), String> {
    for (i, entry) in entries.iter().enumerate() {
        validate_name(entry).map_err(|e| format!("'{field}': {e}"))?;
        if refers_to_self(entry) {
            return Err(format!("'{field}' must not refer to the module itself"));
        }
        if entries[..i].contains(entry) {
            return Err(format!("'{field}' lists '{entry}' more than once"));
        }
    }
    Ok(())
}
