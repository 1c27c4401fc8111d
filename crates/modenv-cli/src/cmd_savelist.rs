// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module savelist` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::{Command, Response};

use crate::Context;

/// List saved collections
#[derive(Debug, Args)]
pub struct CmdSaveList {}

impl CmdSaveList {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let (response, code) = ctx.execute(Command::SaveList)?;
        if let Response::Collections(names) = response {
            if names.is_empty() {
                eprintln!("{}", "No saved collections".dimmed());
            } else {
                eprintln!("{}", "Named collection list:".bold());
                for (i, name) in names.iter().enumerate() {
                    eprintln!("  {}) {}", i + 1, name.green());
                }
            }
        }
        Ok(code)
    }
}
