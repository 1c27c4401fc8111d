// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Prerequisite and conflict checks against the loaded stack.
//!
//! Nothing here mutates state; callers validate first and only then
//! compute and apply a diff.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::definition::{reference_matches, Module};
use crate::registry::ModuleRegistry;
use crate::stack::ModuleStack;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./resolver_test.rs"]
mod resolver_test;

/// Check that `module` may be pushed onto `stack`.
///
/// Conflicts are reported before missing prerequisites.
pub fn validate_load(module: &Module, stack: &ModuleStack) -> Result<()> {
    let conflicts = conflicting(module, stack);
    if !conflicts.is_empty() {
        return Err(Error::Conflict {
            module: module.name.clone(),
            conflicts,
        });
    }

    let missing = missing_prerequisites(module, stack);
    if !missing.is_empty() {
        return Err(Error::MissingPrerequisite {
            module: module.name.clone(),
            missing,
        });
    }

    Ok(())
}

/// Check that the module `name` may be removed from `stack`.
///
/// With `force`, dependents are left loaded without their prerequisite.
pub fn validate_unload(name: &str, stack: &ModuleStack, force: bool) -> Result<()> {
    let dependents = dependents(name, stack);
    if dependents.is_empty() {
        return Ok(());
    }
    if force {
        tracing::warn!(module = %name, dependents = %dependents.join(", "), "forcing unload of a module still required");
        return Ok(());
    }
    Err(Error::DependentInUse {
        module: name.to_string(),
        dependents,
    })
}

/// Loaded modules that `module` excludes, or that exclude it.
pub fn conflicting(module: &Module, stack: &ModuleStack) -> Vec<String> {
    stack
        .list()
        .iter()
        .filter(|entry| entry.name != module.name)
        .filter(|entry| {
            module
                .conflicts
                .iter()
                .any(|c| reference_matches(c, &entry.name))
                || entry
                    .conflicts
                    .iter()
                    .any(|c| reference_matches(c, &module.name))
        })
        .map(|entry| entry.name.clone())
        .collect()
}

/// Prerequisites of `module` with no matching module on the stack, in declared order.
pub fn missing_prerequisites(module: &Module, stack: &ModuleStack) -> Vec<String> {
    module
        .prerequisites
        .iter()
        .filter(|p| !stack.names().any(|loaded| reference_matches(p, loaded)))
        .cloned()
        .collect()
}

/// Loaded modules that would lose a satisfied prerequisite if `name` went away.
///
/// Another module still satisfies a prerequisite only if it was loaded
/// before the dependent.
pub fn dependents(name: &str, stack: &ModuleStack) -> Vec<String> {
    let entries = stack.list();
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.name != name)
        .filter(|(index, entry)| {
            entry.prerequisites.iter().any(|p| {
                reference_matches(p, name)
                    && !entries[..*index]
                        .iter()
                        .any(|other| other.name != name && reference_matches(p, &other.name))
            })
        })
        .map(|(_, entry)| entry.name.clone())
        .collect()
}

/// Every loaded module whose declared prerequisites are not all on the stack.
///
/// Only forced unloads can produce these.
pub fn unsatisfied(stack: &ModuleStack) -> Vec<String> {
    stack
        .list()
        .iter()
        .filter(|entry| {
            entry
                .prerequisites
                .iter()
                .any(|p| !stack.names().any(|loaded| reference_matches(p, loaded)))
        })
        .map(|entry| entry.name.clone())
        .collect()
}

/// Order in which to load `module` and any prerequisites missing from `stack`.
///
/// Prerequisites are resolved from `registry` transitively and come first;
/// `module` is last. A prerequisite naming a family (`gcc`) resolves to the
/// newest registered version in it.
pub fn plan_load(
    module: Arc<Module>,
    registry: &ModuleRegistry,
    stack: &ModuleStack,
) -> Result<Vec<Arc<Module>>> {
    let mut planned = Vec::new();
    let mut path = Vec::new();
    visit(module, registry, stack, &mut planned, &mut path)?;
    Ok(planned)
}

fn visit(
    module: Arc<Module>,
    registry: &ModuleRegistry,
    stack: &ModuleStack,
    planned: &mut Vec<Arc<Module>>,
    path: &mut Vec<String>,
) -> Result<()> {
    if let Some(start) = path.iter().position(|n| *n == module.name) {
        let mut cycle = path[start..].to_vec();
        cycle.push(module.name.clone());
        return Err(Error::DependencyCycle { cycle });
    }
    if stack.contains(&module.name) || planned.iter().any(|m| m.name == module.name) {
        return Ok(());
    }

    path.push(module.name.clone());
    for prerequisite in &module.prerequisites {
        let satisfied = stack
            .names()
            .chain(planned.iter().map(|m| m.name.as_str()))
            .any(|name| reference_matches(prerequisite, name));
        if satisfied {
            continue;
        }
        let dependency = resolve_prerequisite(prerequisite, registry).ok_or_else(|| {
            Error::MissingPrerequisite {
                module: module.name.clone(),
                missing: vec![prerequisite.clone()],
            }
        })?;
        visit(dependency, registry, stack, planned, path)?;
    }
    path.pop();

    tracing::debug!(module = %module.name, "planned for loading");
    planned.push(module);
    Ok(())
}

fn resolve_prerequisite(entry: &str, registry: &ModuleRegistry) -> Option<Arc<Module>> {
    if let Ok(module) = registry.find(entry) {
        return Some(module);
    }
    registry
        .search(Some(entry))
        .into_iter()
        .filter(|m| reference_matches(entry, &m.name))
        .max_by(|a, b| compare_versions(&a.version, &b.version))
}

/// Compare versions chunk by chunk, numerically where both chunks are digits,
/// so that `10.2` sorts after `9.3`.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-', '_']);
    let mut right = b.split(['.', '-', '_']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
