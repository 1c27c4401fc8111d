// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module avail` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::dispatch::AvailableModule;
use modenv::{Command, Response};

use crate::Context;

#[cfg(test)]
#[path = "./cmd_avail_test.rs"]
mod cmd_avail_test;

/// List available modules
#[derive(Debug, Args)]
pub struct CmdAvail {
    /// Only show modules whose name contains PATTERN
    pattern: Option<String>,

    /// Print module names only, one per line
    #[clap(short, long)]
    terse: bool,
}

impl CmdAvail {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let command = Command::Avail {
            pattern: self.pattern.clone(),
        };
        let (response, code) = ctx.execute(command)?;
        if let Response::Avail { modules, skipped } = response {
            eprint!("{}", self.render(&modules, skipped));
        }
        Ok(code)
    }

    fn render(&self, modules: &[AvailableModule], skipped: usize) -> String {
        if self.terse {
            return modules.iter().map(|m| format!("{}\n", m.name)).collect();
        }

        let mut out = format!("{}\n", "Available Modules:".bold());
        if modules.is_empty() {
            out.push_str(&format!("  {}\n", "(none)".dimmed()));
        }
        let width = modules.iter().map(|m| m.name.len()).max().unwrap_or(0);
        for module in modules {
            let name = format!("{:<width$}", module.name);
            let name = if module.loaded {
                name.green().bold()
            } else {
                name.normal()
            };
            let marker = if module.loaded { "(L)" } else { "   " };
            let line = format!("  {name} {marker}  {}", module.whatis.dimmed());
            out.push_str(line.trim_end());
            out.push('\n');
        }
        if skipped > 0 {
            out.push_str(&format!(
                "\n{}\n",
                format!("{skipped} malformed definition(s) skipped").yellow()
            ));
        }
        out
    }
}
