// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The per-shell session: loaded stack plus the environment it edits.
//!
//! Each `module` invocation is a fresh process, so the stack (including the
//! undo information of every loaded module) travels between invocations in
//! the environment itself, under [`SESSION_VAR`]. Every mutation prepares a
//! complete new stack and environment before replacing the current ones, so
//! a failed operation leaves the session exactly as it was.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::definition::Module;
use crate::diff;
use crate::environment::EnvironmentState;
use crate::resolver;
use crate::stack::{LoadedEntry, ModuleStack};
use crate::{Error, Result, LOADED_MODULES_VAR, SESSION_VAR};

#[cfg(test)]
#[path = "./session_test.rs"]
mod session_test;

/// Version of the encoded session format.
const SESSION_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SessionRecord {
    version: u32,
    stack: ModuleStack,
}

/// Result of a load that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    AlreadyLoaded,
}

/// Result of an unload that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadStatus {
    Unloaded,
    AlreadyUnloaded,
}

/// Modules removed by a purge, and the error that stopped it early, if any.
///
/// Modules listed in `unloaded` are committed even when `blocked` is set.
#[derive(Debug, Default)]
pub struct PurgeReport {
    pub unloaded: Vec<String>,
    pub blocked: Option<Error>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    stack: ModuleStack,
    env: EnvironmentState,
}

impl Session {
    /// Start an empty session over `env`, ignoring any recorded state.
    pub fn new(env: EnvironmentState) -> Self {
        Self {
            stack: ModuleStack::new(),
            env,
        }
    }

    /// Continue the session recorded in `env`, or start an empty one.
    pub fn resume(env: EnvironmentState) -> Result<Self> {
        let Some(encoded) = env.get(SESSION_VAR) else {
            if env.contains(LOADED_MODULES_VAR) {
                tracing::warn!(
                    "{LOADED_MODULES_VAR} is set without {SESSION_VAR}, treating no modules as loaded"
                );
            }
            return Ok(Self::new(env));
        };

        let record: SessionRecord =
            serde_json::from_str(encoded).map_err(|e| Error::CorruptSession(e.to_string()))?;
        if record.version != SESSION_FORMAT_VERSION {
            return Err(Error::CorruptSession(format!(
                "unsupported session format version {}",
                record.version
            )));
        }
        let duplicate = {
            let mut seen = HashSet::new();
            record
                .stack
                .names()
                .find(|name| !seen.insert(*name))
                .map(str::to_owned)
        };
        if let Some(duplicate) = duplicate {
            return Err(Error::CorruptSession(format!(
                "module {duplicate} is recorded as loaded more than once"
            )));
        }
        tracing::debug!(loaded = record.stack.len(), "resumed session");
        Ok(Self {
            stack: record.stack,
            env,
        })
    }

    /// Capture the process environment and resume from it.
    pub fn from_process_env() -> Result<Self> {
        Self::resume(EnvironmentState::capture())
    }

    pub fn stack(&self) -> &ModuleStack {
        &self.stack
    }

    pub fn env(&self) -> &EnvironmentState {
        &self.env
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.stack.contains(name)
    }

    /// Apply `module` and push it onto the stack.
    ///
    /// Loading a module that is already on the stack succeeds without
    /// touching anything.
    pub fn load(&mut self, module: &Module) -> Result<LoadStatus> {
        if self.stack.contains(&module.name) {
            tracing::debug!(module = %module.name, "already loaded");
            return Ok(LoadStatus::AlreadyLoaded);
        }
        resolver::validate_load(module, &self.stack)?;

        let (env, inverse) = diff::apply(&module.operations, &self.env);
        let mut stack = self.stack.clone();
        stack.push(LoadedEntry::new(module, inverse));
        self.commit(stack, env)?;

        tracing::info!(module = %module.name, "loaded");
        Ok(LoadStatus::Loaded)
    }

    /// Revert `name`'s recorded diff and remove it from the stack.
    ///
    /// Unloading a module that is not loaded succeeds without touching anything.
    pub fn unload(&mut self, name: &str, force: bool) -> Result<UnloadStatus> {
        let Some(position) = self.stack.position(name) else {
            tracing::debug!(module = %name, "already unloaded");
            return Ok(UnloadStatus::AlreadyUnloaded);
        };
        resolver::validate_unload(name, &self.stack, force)?;

        let mut stack = self.stack.clone();
        let Some(entry) = stack.remove(name) else {
            return Ok(UnloadStatus::AlreadyUnloaded);
        };
        // modules loaded later take over any value this one displaced
        let inverse = diff::splice(
            &entry.inverse,
            stack.above_mut(position).map(|later| &mut later.inverse),
        );
        let env = diff::apply_inverse(&inverse, &self.env);
        self.commit(stack, env)?;

        tracing::info!(module = %name, "unloaded");
        Ok(UnloadStatus::Unloaded)
    }

    /// Unload everything, newest first.
    ///
    /// Each unload commits on its own; if one is refused the purge stops and
    /// the modules already unloaded stay unloaded.
    pub fn purge(&mut self, force: bool) -> PurgeReport {
        let order: Vec<String> = self.stack.reverse().map(|e| e.name.clone()).collect();
        let mut report = PurgeReport::default();
        for name in order {
            match self.unload(&name, force) {
                Ok(_) => report.unloaded.push(name),
                Err(err) => {
                    report.blocked = Some(err);
                    break;
                }
            }
        }
        report
    }

    /// Run `f` against a copy of the session and keep the result only if it succeeds.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut draft = self.clone();
        let value = f(&mut draft)?;
        *self = draft;
        Ok(value)
    }

    fn commit(&mut self, stack: ModuleStack, mut env: EnvironmentState) -> Result<()> {
        if stack.is_empty() {
            env.unset(LOADED_MODULES_VAR);
            env.unset(SESSION_VAR);
        } else {
            let loaded = stack.names().collect::<Vec<_>>().join(":");
            let encoded = serde_json::to_string(&SessionRecord {
                version: SESSION_FORMAT_VERSION,
                stack: stack.clone(),
            })?;
            env.set(LOADED_MODULES_VAR, loaded);
            env.set(SESSION_VAR, encoded);
        }
        self.stack = stack;
        self.env = env;
        Ok(())
    }
}
