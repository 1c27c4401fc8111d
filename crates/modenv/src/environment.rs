// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Environment variable operations and the session-owned variable state.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[cfg(test)]
#[path = "./environment_test.rs"]
mod environment_test;

/// Separator used for list-like variables unless an operation overrides it.
pub const DEFAULT_SEPARATOR: &str = ":";

/// A single environment edit declared by a module definition.
///
/// The variant is selected by the key naming the variable:
///
/// ```yaml
/// - set: CC
///   value: /opt/gcc/bin/gcc
/// - unset: GCC_COLORS
/// - prepend: PATH
///   value: /opt/gcc/bin
/// - append: MANPATH
///   value: /opt/gcc/share/man
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum EnvOp {
    Set(SetEnv),
    Unset(UnsetEnv),
    Prepend(PrependEnv),
    Append(AppendEnv),
}

/// Replace a variable's value.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SetEnv {
    pub set: String,
    #[serde(deserialize_with = "deserialize_scalar")]
    pub value: String,
}

/// Remove a variable.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UnsetEnv {
    pub unset: String,
}

/// Insert a segment at the front of a list-like variable.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PrependEnv {
    pub prepend: String,
    #[serde(deserialize_with = "deserialize_scalar")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Insert a segment at the back of a list-like variable.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppendEnv {
    pub append: String,
    #[serde(deserialize_with = "deserialize_scalar")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// Read a string, number or boolean as text, so `value: 4` means `"4"`.
pub(crate) fn deserialize_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_to_string(serde_yaml::Value::deserialize(deserializer)?)
}

/// [`deserialize_scalar`] for optional fields.
pub(crate) fn deserialize_optional_scalar<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(None),
        value => scalar_to_string(value).map(Some),
    }
}

fn scalar_to_string<E: serde::de::Error>(value: serde_yaml::Value) -> Result<String, E> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(E::invalid_type(
            unexpected(&other),
            &"a string, number or boolean",
        )),
    }
}

fn unexpected(value: &serde_yaml::Value) -> serde::de::Unexpected<'_> {
    use serde::de::Unexpected;
    match value {
        serde_yaml::Value::Null => Unexpected::Unit,
        serde_yaml::Value::Sequence(_) => Unexpected::Seq,
        serde_yaml::Value::Mapping(_) => Unexpected::Map,
        _ => Unexpected::Other("tagged value"),
    }
}

/// The kind of edit, independent of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Set,
    Unset,
    Prepend,
    Append,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Set => "set",
            Self::Unset => "unset",
            Self::Prepend => "prepend",
            Self::Append => "append",
        };
        f.write_str(name)
    }
}

impl EnvOp {
    /// Name of the variable this operation edits.
    pub fn variable(&self) -> &str {
        match self {
            Self::Set(op) => &op.set,
            Self::Unset(op) => &op.unset,
            Self::Prepend(op) => &op.prepend,
            Self::Append(op) => &op.append,
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Self::Set(_) => OpKind::Set,
            Self::Unset(_) => OpKind::Unset,
            Self::Prepend(_) => OpKind::Prepend,
            Self::Append(_) => OpKind::Append,
        }
    }

    /// The value argument, if the operation takes one.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Set(op) => Some(&op.value),
            Self::Unset(_) => None,
            Self::Prepend(op) => Some(&op.value),
            Self::Append(op) => Some(&op.value),
        }
    }

    /// List separator for prepend/append, falling back to [`DEFAULT_SEPARATOR`].
    pub fn separator(&self) -> &str {
        match self {
            Self::Prepend(PrependEnv {
                separator: Some(sep),
                ..
            })
            | Self::Append(AppendEnv {
                separator: Some(sep),
                ..
            }) => sep,
            _ => DEFAULT_SEPARATOR,
        }
    }

    pub fn set<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::Set(SetEnv {
            set: name.into(),
            value: value.into(),
        })
    }

    pub fn unset<N: Into<String>>(name: N) -> Self {
        Self::Unset(UnsetEnv { unset: name.into() })
    }

    pub fn prepend<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::Prepend(PrependEnv {
            prepend: name.into(),
            value: value.into(),
            separator: None,
        })
    }

    pub fn append<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self::Append(AppendEnv {
            append: name.into(),
            value: value.into(),
            separator: None,
        })
    }
}

/// A net change to a single variable between two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvChange {
    Set { name: String, value: String },
    Unset { name: String },
}

impl EnvChange {
    pub fn name(&self) -> &str {
        match self {
            Self::Set { name, .. } | Self::Unset { name } => name,
        }
    }
}

/// Mapping from variable name to value for one session.
///
/// Only the diff engine and the session bookkeeping mutate this; everything
/// else reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentState {
    vars: BTreeMap<String, String>,
}

impl EnvironmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid unicode are skipped, since
    /// they can neither be edited by a module nor round-tripped through a script.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.vars.insert(name.into(), value.into());
    }

    /// Remove a variable, returning its previous value.
    pub fn unset(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    /// Set the variable when a value is given, remove it otherwise.
    pub fn assign(&mut self, name: &str, value: Option<String>) {
        match value {
            Some(value) => self.set(name, value),
            None => {
                self.unset(name);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Changes that turn `self` into `target`, ordered by variable name.
    pub fn diff(&self, target: &EnvironmentState) -> Vec<EnvChange> {
        let mut changes = Vec::new();
        for (name, value) in &target.vars {
            if self.vars.get(name) != Some(value) {
                changes.push(EnvChange::Set {
                    name: name.clone(),
                    value: value.clone(),
                });
            }
        }
        for name in self.vars.keys() {
            if !target.vars.contains_key(name) {
                changes.push(EnvChange::Unset { name: name.clone() });
            }
        }
        changes.sort_by(|a, b| a.name().cmp(b.name()));
        changes
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
