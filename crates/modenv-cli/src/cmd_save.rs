// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module save` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::{Command, Response};

use crate::Context;

/// Save the loaded modules as a collection
#[derive(Debug, Args)]
pub struct CmdSave {
    /// Collection name (default: "default")
    name: Option<String>,
}

impl CmdSave {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let command = Command::Save {
            name: self.name.clone(),
        };
        let (response, code) = ctx.execute(command)?;
        if let Response::Saved {
            name,
            path,
            modules,
        } = response
        {
            eprintln!(
                "Saved {modules} module(s) to collection {} ({})",
                name.green(),
                path.display().to_string().dimmed()
            );
        }
        Ok(code)
    }
}
