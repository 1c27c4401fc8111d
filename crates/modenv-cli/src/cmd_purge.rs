// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module purge` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::{Command, Response};

use crate::Context;

/// Unload all loaded modules
#[derive(Debug, Args)]
pub struct CmdPurge {
    /// Unload modules even if others still require them
    #[clap(short, long)]
    force: bool,
}

impl CmdPurge {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let (response, code) = ctx.execute(Command::Purge { force: self.force })?;
        if let Response::Purged(unloaded) = response {
            if unloaded.is_empty() && code == 0 {
                eprintln!("{}", "No modules loaded".dimmed());
            }
            for name in unloaded {
                eprintln!("Unloading {}", name.yellow());
            }
        }
        Ok(code)
    }
}
