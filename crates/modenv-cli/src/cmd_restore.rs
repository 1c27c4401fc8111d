// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module restore` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::{Command, Response};

use crate::Context;

/// Replace the loaded modules with a saved collection
#[derive(Debug, Args)]
pub struct CmdRestore {
    /// Collection name (default: "default")
    name: Option<String>,
}

impl CmdRestore {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let command = Command::Restore {
            name: self.name.clone(),
        };
        let (response, code) = ctx.execute(command)?;
        if let Response::Restored {
            name,
            modules,
            changed,
        } = response
        {
            eprintln!("Restoring collection {}", name.green());
            for module in &modules {
                eprintln!("  Loading {}", module.green());
            }
            if !changed.is_empty() {
                eprintln!();
                eprintln!("Warning: definitions changed since the collection was saved:");
                for change in changed {
                    eprintln!("  - {}", change.name.yellow());
                    if let (Some(expected), Some(actual)) = (&change.expected, &change.actual) {
                        eprintln!("    Expected: {}", expected.dimmed());
                        eprintln!("    Actual:   {}", actual.dimmed());
                    }
                }
                eprintln!("\nRun 'module save {name}' to record the current definitions");
            }
        }
        Ok(code)
    }
}
