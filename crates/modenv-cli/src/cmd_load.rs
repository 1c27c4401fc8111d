// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `module load` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use modenv::{Command, LoadStatus, Response};

use crate::Context;

/// Load one or more modules
#[derive(Debug, Args)]
pub struct CmdLoad {
    /// Modules to load, in order
    #[clap(required = true)]
    modules: Vec<String>,

    /// Also load missing prerequisites (see MODENV_AUTO_LOAD)
    #[clap(short, long)]
    auto: bool,
}

impl CmdLoad {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let command = Command::Load {
            modules: self.modules.clone(),
            auto: self.auto,
        };
        let (response, code) = ctx.execute(command)?;
        if let Response::Loaded(statuses) = response {
            for (name, status) in statuses {
                match status {
                    LoadStatus::Loaded => eprintln!("Loading {}", name.green()),
                    LoadStatus::AlreadyLoaded => {
                        eprintln!("{}", format!("{name} is already loaded").dimmed())
                    }
                }
            }
        }
        Ok(code)
    }
}
