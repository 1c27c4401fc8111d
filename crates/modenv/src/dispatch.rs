// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The `module` verbs, composed from the registry, resolver and session.
//!
//! Dispatching never prints. Each command yields a structured [`Response`]
//! for the front end to format, plus the net environment changes that the
//! front end renders as a script for the calling shell.

use std::path::PathBuf;
use std::sync::Arc;

use crate::collection::{self, Collection, CollectionChange, CollectionChangeKind};
use crate::definition::Module;
use crate::environment::EnvChange;
use crate::registry::LazyRegistry;
use crate::resolver;
use crate::session::{LoadStatus, Session, UnloadStatus};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./dispatch_test.rs"]
mod dispatch_test;

/// A parsed request to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Avail { pattern: Option<String> },
    Load { modules: Vec<String>, auto: bool },
    Unload { modules: Vec<String>, force: bool },
    Purge { force: bool },
    Whatis { name: String },
    Help { name: String },
    Show { name: String },
    Save { name: Option<String> },
    Restore { name: Option<String> },
    SaveList,
}

impl Command {
    /// Whether the command can change the environment.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Load { .. } | Self::Unload { .. } | Self::Purge { .. } | Self::Restore { .. }
        )
    }
}

/// Dispatcher settings that come from configuration rather than the command.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Load missing prerequisites even without `--auto`.
    pub auto_load: bool,
    /// Required by `save`, `restore` and `savelist`.
    pub collections_dir: Option<PathBuf>,
}

/// A loaded module as reported by `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedModule {
    pub name: String,
    pub version: String,
    /// Some declared prerequisite is no longer loaded, after a forced unload.
    pub unsatisfied: bool,
}

/// A registered module as reported by `avail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableModule {
    pub name: String,
    pub whatis: String,
    pub loaded: bool,
}

#[derive(Debug, Clone)]
pub enum Response {
    List(Vec<ListedModule>),
    Avail {
        modules: Vec<AvailableModule>,
        /// Definitions excluded from the registry.
        skipped: usize,
    },
    Loaded(Vec<(String, LoadStatus)>),
    Unloaded(Vec<(String, UnloadStatus)>),
    Purged(Vec<String>),
    Whatis { name: String, whatis: String },
    Help { name: String, help: String },
    Show(Arc<Module>),
    Saved {
        name: String,
        path: PathBuf,
        modules: usize,
    },
    Restored {
        name: String,
        modules: Vec<String>,
        changed: Vec<CollectionChange>,
    },
    Collections(Vec<String>),
}

/// Everything a command produced.
#[derive(Debug)]
pub struct Outcome {
    pub response: Response,
    /// Net changes to hand to the shell, sorted by variable name.
    pub changes: Vec<EnvChange>,
    /// Set when a purge stopped partway; `changes` still covers the
    /// modules it did unload.
    pub interrupted: Option<Error>,
}

impl Outcome {
    fn new(response: Response) -> Self {
        Self {
            response,
            changes: Vec::new(),
            interrupted: None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.interrupted.as_ref().map_or(0, Error::exit_code)
    }
}

pub struct CommandDispatcher<'a> {
    registry: &'a LazyRegistry,
    options: DispatchOptions,
}

impl<'a> CommandDispatcher<'a> {
    pub fn new(registry: &'a LazyRegistry, options: DispatchOptions) -> Self {
        Self { registry, options }
    }

    /// Run `command` against `session`.
    ///
    /// On error the session is unchanged and there is nothing to emit.
    pub fn dispatch(&self, command: Command, session: &mut Session) -> Result<Outcome> {
        tracing::debug!(?command, "dispatching");
        let before = session.env().clone();
        let mut outcome = match command {
            Command::List => self.list(session),
            Command::Avail { pattern } => self.avail(pattern.as_deref(), session)?,
            Command::Load { modules, auto } => {
                self.load(&modules, auto || self.options.auto_load, session)?
            }
            Command::Unload { modules, force } => self.unload(&modules, force, session)?,
            Command::Purge { force } => self.purge(force, session),
            Command::Whatis { name } => {
                let module = self.registry.get().find(&name)?;
                Outcome::new(Response::Whatis {
                    name: module.name.clone(),
                    whatis: module.whatis.clone(),
                })
            }
            Command::Help { name } => {
                let module = self.registry.get().find(&name)?;
                Outcome::new(Response::Help {
                    name: module.name.clone(),
                    help: module.help.clone(),
                })
            }
            Command::Show { name } => Outcome::new(Response::Show(self.registry.get().find(&name)?)),
            Command::Save { name } => self.save(name, session)?,
            Command::Restore { name } => self.restore(name, session)?,
            Command::SaveList => {
                Outcome::new(Response::Collections(collection::list_collections(
                    &self.collections_dir()?,
                )?))
            }
        };
        outcome.changes = before.diff(session.env());
        Ok(outcome)
    }

    fn list(&self, session: &Session) -> Outcome {
        let stack = session.stack();
        let unsatisfied = resolver::unsatisfied(stack);
        let modules = stack
            .list()
            .iter()
            .map(|entry| ListedModule {
                name: entry.name.clone(),
                version: entry.version.clone(),
                unsatisfied: unsatisfied.contains(&entry.name),
            })
            .collect();
        Outcome::new(Response::List(modules))
    }

    /// A pattern that matches nothing is reported as not found.
    fn avail(&self, pattern: Option<&str>, session: &Session) -> Result<Outcome> {
        let registry = self.registry.get();
        let modules: Vec<AvailableModule> = registry
            .search(pattern)
            .into_iter()
            .map(|module| AvailableModule {
                loaded: session.is_loaded(&module.name),
                name: module.name.clone(),
                whatis: module.whatis.clone(),
            })
            .collect();
        if let (Some(pattern), true) = (pattern, modules.is_empty()) {
            return Err(Error::NotFound {
                name: pattern.to_string(),
                similar: Vec::new(),
            });
        }
        Ok(Outcome::new(Response::Avail {
            modules,
            skipped: registry.warnings().len(),
        }))
    }

    fn load(&self, names: &[String], auto: bool, session: &mut Session) -> Result<Outcome> {
        let statuses = session.transaction(|draft| {
            let mut statuses = Vec::new();
            for name in names {
                // no registry lookup for what is already on the stack
                if draft.is_loaded(name) {
                    tracing::debug!(module = %name, "already loaded");
                    statuses.push((name.clone(), LoadStatus::AlreadyLoaded));
                    continue;
                }
                let registry = self.registry.get();
                let module = registry.find(name)?;
                if !auto {
                    statuses.push((name.clone(), draft.load(&module)?));
                    continue;
                }
                for planned in resolver::plan_load(module, &registry, draft.stack())? {
                    statuses.push((planned.name.clone(), draft.load(&planned)?));
                }
            }
            Ok(statuses)
        })?;
        Ok(Outcome::new(Response::Loaded(statuses)))
    }

    fn unload(&self, names: &[String], force: bool, session: &mut Session) -> Result<Outcome> {
        let statuses = session.transaction(|draft| {
            names
                .iter()
                .map(|name| Ok((name.clone(), draft.unload(name, force)?)))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(Outcome::new(Response::Unloaded(statuses)))
    }

    fn purge(&self, force: bool, session: &mut Session) -> Outcome {
        let report = session.purge(force);
        let mut outcome = Outcome::new(Response::Purged(report.unloaded));
        outcome.interrupted = report.blocked;
        outcome
    }

    fn save(&self, name: Option<String>, session: &Session) -> Result<Outcome> {
        let name = name.unwrap_or_else(|| collection::DEFAULT_COLLECTION.to_string());
        let path = collection::collection_path(&self.collections_dir()?, &name)?;
        let collection = Collection::capture(session.stack());
        collection.save(&path)?;
        Ok(Outcome::new(Response::Saved {
            name,
            path,
            modules: collection.modules.len(),
        }))
    }

    fn restore(&self, name: Option<String>, session: &mut Session) -> Result<Outcome> {
        let name = name.unwrap_or_else(|| collection::DEFAULT_COLLECTION.to_string());
        let path = collection::collection_path(&self.collections_dir()?, &name)?;
        let collection = Collection::load(&path)?;
        let registry = self.registry.get();

        let changed: Vec<CollectionChange> = collection
            .verify(&registry)
            .into_iter()
            .filter(|change| change.kind == CollectionChangeKind::DefinitionChanged)
            .collect();
        for change in &changed {
            tracing::warn!(module = %change.name, collection = %name, "definition changed since the collection was saved");
        }

        let modules = session.transaction(|draft| {
            let report = draft.purge(false);
            if let Some(err) = report.blocked {
                return Err(err);
            }
            let mut loaded = Vec::new();
            for module_name in collection.module_names() {
                let module = registry.find(module_name)?;
                draft.load(&module)?;
                loaded.push(module.name.clone());
            }
            Ok(loaded)
        })?;

        Ok(Outcome::new(Response::Restored {
            name,
            modules,
            changed,
        }))
    }

    fn collections_dir(&self) -> Result<PathBuf> {
        self.options.collections_dir.clone().ok_or_else(|| {
            Error::Config("no collections directory configured".to_string())
        })
    }
}
