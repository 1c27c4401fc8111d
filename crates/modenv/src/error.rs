// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for modenv operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with modenv Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for failures outside the module taxonomy (I/O, config, session).
pub const GENERAL_FAILURE_EXIT_CODE: i32 = 6;

/// Errors that can occur during modenv operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// No module with this name is registered
    #[error("Unable to locate a module named '{name}'")]
    #[diagnostic(code(modenv::not_found), help("{}", suggestion_message(similar)))]
    NotFound { name: String, similar: Vec<String> },

    /// Invalid YAML in a module definition
    #[error("Invalid module definition {origin}: {error}")]
    #[diagnostic(
        code(modenv::invalid_yaml),
        help("Check YAML syntax and ensure 'api: modenv/v0' is present")
    )]
    InvalidYaml {
        origin: String,
        #[source]
        error: serde_yaml::Error,
    },

    /// Definition parsed but failed schema validation
    #[error("Invalid module definition {origin}: {reason}")]
    #[diagnostic(code(modenv::invalid_definition))]
    InvalidDefinition { origin: String, reason: String },

    /// The requested module exists on disk but was excluded from the registry
    #[error("Module '{name}' has a malformed definition: {reason}")]
    #[diagnostic(
        code(modenv::malformed_definition),
        help("Fix the definition file; other modules remain available")
    )]
    MalformedDefinition { name: String, reason: String },

    /// Loading would place two mutually exclusive modules on the stack
    #[error("Cannot load '{module}': conflicts with loaded {}", .conflicts.join(", "))]
    #[diagnostic(
        code(modenv::conflict),
        help("Unload the conflicting module(s) first")
    )]
    Conflict {
        module: String,
        conflicts: Vec<String>,
    },

    /// Required modules are not loaded
    #[error("Cannot load '{module}': missing prerequisite {}", .missing.join(", "))]
    #[diagnostic(
        code(modenv::missing_prerequisite),
        help("Load the prerequisite module(s) first, in order, or enable auto-load")
    )]
    MissingPrerequisite { module: String, missing: Vec<String> },

    /// Prerequisites reference each other in a loop
    #[error("Circular prerequisite chain: {}", .cycle.join(" -> "))]
    #[diagnostic(code(modenv::dependency_cycle))]
    DependencyCycle { cycle: Vec<String> },

    /// Unloading would strand a loaded module without its prerequisite
    #[error("Cannot unload '{module}': required by loaded {}", .dependents.join(", "))]
    #[diagnostic(
        code(modenv::dependent_in_use),
        help("Unload the dependent module(s) first or pass --force")
    )]
    DependentInUse {
        module: String,
        dependents: Vec<String>,
    },

    /// The session state carried in the environment could not be decoded
    #[error("Session state is unreadable: {0}")]
    #[diagnostic(
        code(modenv::corrupt_session),
        help("Start a fresh shell, or unset __MODENV_SESSION and MODENV_LOADEDMODULES")
    )]
    CorruptSession(String),

    /// No saved collection at this path
    #[error("No saved collection at {0:?}")]
    #[diagnostic(code(modenv::collection_not_found), help("List collections with 'module savelist'"))]
    CollectionNotFound(PathBuf),

    /// A saved collection is unreadable or badly named
    #[error("Invalid collection {name}: {reason}")]
    #[diagnostic(code(modenv::invalid_collection))]
    InvalidCollection { name: String, reason: String },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(modenv::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(modenv::config))]
    Config(String),

    /// JSON error passthrough
    #[error(transparent)]
    #[diagnostic(code(modenv::json_error))]
    Json(#[from] serde_json::Error),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(modenv::io_error))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code reported to the calling shell for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } | Self::CollectionNotFound(_) => 1,
            Self::Conflict { .. } => 2,
            Self::MissingPrerequisite { .. } | Self::DependencyCycle { .. } => 3,
            Self::DependentInUse { .. } => 4,
            Self::InvalidYaml { .. }
            | Self::InvalidDefinition { .. }
            | Self::MalformedDefinition { .. } => 5,
            Self::CorruptSession(_)
            | Self::InvalidCollection { .. }
            | Self::ReadFailed { .. }
            | Self::Config(_)
            | Self::Json(_)
            | Self::Io(_) => GENERAL_FAILURE_EXIT_CODE,
        }
    }
}

fn suggestion_message(similar: &[String]) -> String {
    if similar.is_empty() {
        "Run 'module avail' to see registered modules".to_string()
    } else {
        format!("Did you mean one of: {}?", similar.join(", "))
    }
}
