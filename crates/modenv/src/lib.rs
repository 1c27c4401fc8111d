// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! modenv - Reversible Environment Modules
//!
//! This crate provides the engine behind the `module` command: a registry of
//! declarative module definitions, constraint checks against the loaded set,
//! and an environment diff that can be undone exactly.
//!
//! # Overview
//!
//! modenv runs as a child of the user's shell. Every command reads the
//! session recorded in the environment, computes the new environment, and
//! prints the net change as a script for the shell to evaluate. Failed
//! commands print nothing to evaluate, so the shell is never left half-edited.
//!
//! # Example
//!
//! ```yaml
//! # $MODULEPATH/openmpi/4.0.yaml
//! api: modenv/v0
//! whatis: "Open MPI 4.0 built with GCC 9.3"
//!
//! prerequisites:
//!   - gcc/9.3
//! conflicts:
//!   - mpich
//!
//! environment:
//!   - prepend: PATH
//!     value: /opt/openmpi/4.0/bin
//!   - set: MPI_HOME
//!     value: /opt/openmpi/4.0
//! ```

pub mod collection;
pub mod config;
pub mod definition;
pub mod diff;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod script;
pub mod session;
pub mod stack;

pub use collection::{Collection, CollectionChange, CollectionChangeKind};
pub use config::Config;
pub use definition::{ApiVersion, Module, ModuleDefinition};
pub use diff::{apply, apply_inverse, InverseDiff};
pub use dispatch::{Command, CommandDispatcher, DispatchOptions, Outcome, Response};
pub use environment::{EnvChange, EnvOp, EnvironmentState};
pub use error::{Error, Result, GENERAL_FAILURE_EXIT_CODE};
pub use registry::{LazyRegistry, ModuleRegistry};
pub use script::Shell;
pub use session::{LoadStatus, Session, UnloadStatus};
pub use stack::{LoadedEntry, ModuleStack};

/// Colon-separated names of the loaded modules, in load order.
pub const LOADED_MODULES_VAR: &str = "MODENV_LOADEDMODULES";

/// Encoded session state carried between invocations.
pub const SESSION_VAR: &str = "__MODENV_SESSION";
