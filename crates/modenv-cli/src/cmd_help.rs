// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module help` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::{Command, Response};

use crate::Context;

/// Print a module's help text
#[derive(Debug, Args)]
pub struct CmdHelp {
    /// Module name, e.g. gcc/9.3
    module: String,
}

impl CmdHelp {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let command = Command::Help {
            name: self.module.clone(),
        };
        let (response, code) = ctx.execute(command)?;
        if let Response::Help { name, help } = response {
            eprintln!("{}", format!("Module Specific Help for {name}:").bold());
            eprintln!();
            if help.trim().is_empty() {
                eprintln!("  {}", "(no help text)".dimmed());
            } else {
                for line in help.trim_end().lines() {
                    eprintln!("  {line}");
                }
            }
        }
        Ok(code)
    }
}
