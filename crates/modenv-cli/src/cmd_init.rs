// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `modenv init` command.

use std::path::PathBuf;

use clap::Args;
use miette::{IntoDiagnostic, Result};
use modenv::{script, Shell};

use crate::Context;

/// Print the shell function that runs modenv
///
/// Add `eval "$(modenv init bash)"` to your shell startup file.
#[derive(Debug, Args)]
pub struct CmdInit {
    /// Shell to generate for (default: detected from $SHELL, then --shell)
    shell: Option<Shell>,
}

impl CmdInit {
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let shell = self.shell.unwrap_or_else(|| {
            std::env::var("SHELL")
                .ok()
                .and_then(|path| Shell::detect(&path))
                .unwrap_or(ctx.shell)
        });
        let executable = current_executable()?;
        tracing::debug!(%shell, ?executable, "generating shell integration");
        print!("{}", script::wrapper(shell, &executable));
        Ok(0)
    }
}

fn current_executable() -> Result<PathBuf> {
    let exe = std::env::current_exe().into_diagnostic()?;
    Ok(dunce::canonicalize(&exe).unwrap_or(exe))
}
