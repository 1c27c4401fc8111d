// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Options shared by every subcommand and the plumbing around dispatch.

use std::io::Write;

use clap::Args;
use miette::{IntoDiagnostic, Result};
use modenv::{
    script, Command, CommandDispatcher, Config, DispatchOptions, LazyRegistry, Response, Session,
    Shell,
};

#[derive(Args, Clone, Debug)]
pub struct Context {
    /// Shell syntax for emitted commands: sh, bash, zsh, ksh, csh, tcsh or fish
    #[clap(long, short = 's', global = true, env = "MODENV_SHELL", default_value = "sh")]
    pub shell: Shell,

    /// Colon-separated module roots, overriding MODULEPATH and the config file
    #[clap(long, global = true, value_name = "DIRS")]
    pub modulepath: Option<String>,
}

impl Context {
    /// Load configuration, applying command line overrides.
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load()?;
        if let Some(modulepath) = &self.modulepath {
            config.modulepath = split_modulepath(modulepath);
        }
        Ok(config)
    }

    /// Run `command` against the session recorded in this process's
    /// environment and write the resulting changes to stdout.
    ///
    /// Returns the response to report and the exit code to use.
    pub fn execute(&self, command: Command) -> Result<(Response, i32)> {
        let config = self.config()?;
        let registry = LazyRegistry::new(config.modulepath_dirs());
        let options = DispatchOptions {
            auto_load: config.auto_load_prerequisites,
            collections_dir: config
                .collections_dir()
                .inspect_err(|err| tracing::debug!(%err, "collections unavailable"))
                .ok(),
        };

        let mutating = command.is_mutating();
        let mut session = Session::from_process_env()?;
        let outcome = CommandDispatcher::new(&registry, options).dispatch(command, &mut session)?;
        let code = outcome.exit_code();

        if mutating {
            let script = script::render(&outcome.changes, self.shell);
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(script.as_bytes()).into_diagnostic()?;
            stdout.flush().into_diagnostic()?;
        }
        if let Some(err) = outcome.interrupted {
            eprintln!("{:?}", miette::Report::new(err));
        }
        Ok((outcome.response, code))
    }
}

/// Split a colon-separated list of directories, dropping empty entries.
pub fn split_modulepath(value: &str) -> Vec<String> {
    value
        .split(':')
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}
