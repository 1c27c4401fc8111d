// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module unload` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::{Command, Response, UnloadStatus};

use crate::Context;

/// Unload one or more modules
#[derive(Debug, Args)]
pub struct CmdUnload {
    /// Modules to unload
    #[clap(required = true)]
    modules: Vec<String>,

    /// Unload even if other loaded modules require them
    #[clap(short, long)]
    force: bool,
}

impl CmdUnload {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let command = Command::Unload {
            modules: self.modules.clone(),
            force: self.force,
        };
        let (response, code) = ctx.execute(command)?;
        if let Response::Unloaded(statuses) = response {
            for (name, status) in statuses {
                match status {
                    UnloadStatus::Unloaded => eprintln!("Unloading {}", name.yellow()),
                    UnloadStatus::AlreadyUnloaded => {
                        eprintln!("{}", format!("{name} is not loaded").dimmed())
                    }
                }
            }
        }
        Ok(code)
    }
}
