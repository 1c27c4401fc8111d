// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module whatis` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::{Command, Response};

use crate::Context;

/// Print a module's one-line description
#[derive(Debug, Args)]
pub struct CmdWhatis {
    /// Module name, e.g. gcc/9.3
    module: String,
}

impl CmdWhatis {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let command = Command::Whatis {
            name: self.module.clone(),
        };
        let (response, code) = ctx.execute(command)?;
        if let Response::Whatis { name, whatis } = response {
            if whatis.is_empty() {
                eprintln!("{}: {}", name.cyan(), "(no description)".dimmed());
            } else {
                eprintln!("{}: {whatis}", name.cyan());
            }
        }
        Ok(code)
    }
}
