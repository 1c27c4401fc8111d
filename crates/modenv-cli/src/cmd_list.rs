// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module list` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::dispatch::ListedModule;
use modenv::{Command, Response};

use crate::Context;

#[cfg(test)]
#[path = "./cmd_list_test.rs"]
mod cmd_list_test;

/// List loaded modules
#[derive(Debug, Args)]
pub struct CmdList {
    /// Print module names only, one per line
    #[clap(short, long)]
    terse: bool,
}

impl CmdList {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let (response, code) = ctx.execute(Command::List)?;
        if let Response::List(modules) = response {
            eprint!("{}", self.render(&modules));
        }
        Ok(code)
    }

    fn render(&self, modules: &[ListedModule]) -> String {
        if self.terse {
            return modules.iter().map(|m| format!("{}\n", m.name)).collect();
        }
        if modules.is_empty() {
            return format!("{}\n", "No modules loaded".dimmed());
        }

        let mut out = format!("{}\n", "Currently Loaded Modules:".bold());
        for (i, module) in modules.iter().enumerate() {
            let marker = if module.unsatisfied {
                format!(" {}", "(missing prerequisite)".yellow())
            } else {
                String::new()
            };
            out.push_str(&format!("  {}) {}{}\n", i + 1, module.name.green(), marker));
        }
        out
    }
}
