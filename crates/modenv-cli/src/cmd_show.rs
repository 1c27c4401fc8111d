// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module show` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::{Command, EnvOp, Module, Response};

use crate::Context;

#[cfg(test)]
#[path = "./cmd_show_test.rs"]
mod cmd_show_test;

/// Print a module's definition
#[derive(Debug, Args)]
pub struct CmdShow {
    /// Module name, e.g. gcc/9.3
    module: String,
}

impl CmdShow {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let command = Command::Show {
            name: self.module.clone(),
        };
        let (response, code) = ctx.execute(command)?;
        if let Response::Show(module) = response {
            eprint!("{}", render(&module));
        }
        Ok(code)
    }
}

fn render(module: &Module) -> String {
    let mut out = format!("{}\n", module.name.bold());
    if let Some(path) = &module.source_path {
        out.push_str(&format!("  {}\n", path.display().to_string().dimmed()));
    }
    out.push('\n');
    out.push_str(&format!("  version:       {}\n", module.version));
    if !module.whatis.is_empty() {
        out.push_str(&format!("  whatis:        {}\n", module.whatis));
    }
    if !module.prerequisites.is_empty() {
        out.push_str(&format!(
            "  prerequisites: {}\n",
            module.prerequisites.join(", ").cyan()
        ));
    }
    if !module.conflicts.is_empty() {
        out.push_str(&format!(
            "  conflicts:     {}\n",
            module.conflicts.join(", ").yellow()
        ));
    }

    if !module.operations.is_empty() {
        out.push_str(&format!("\n{}\n", "Environment:".bold()));
        for (i, op) in module.operations.iter().enumerate() {
            let line = match op {
                EnvOp::Set(s) => format!("{} = {}", s.set.cyan(), s.value.green()),
                EnvOp::Unset(u) => format!("{} (unset)", u.unset.cyan()),
                EnvOp::Prepend(p) => format!(
                    "{} = {}{}${}",
                    p.prepend.cyan(),
                    p.value.green(),
                    op.separator(),
                    p.prepend
                ),
                EnvOp::Append(a) => format!(
                    "{} = ${}{}{}",
                    a.append.cyan(),
                    a.append,
                    op.separator(),
                    a.value.green()
                ),
            };
            out.push_str(&format!("  {}. {line}\n", i + 1));
        }
    }
    out
}
