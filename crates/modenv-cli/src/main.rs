// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! modenv - Environment Module CLI
//!
//! Everything written to stdout is meant to be evaluated by the calling
//! shell. Messages, listings and logs go to stderr.

use std::io::IsTerminal;

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_avail;
mod cmd_help;
mod cmd_init;
mod cmd_list;
mod cmd_load;
mod cmd_purge;
mod cmd_restore;
mod cmd_save;
mod cmd_savelist;
mod cmd_show;
mod cmd_unload;
mod cmd_whatis;
mod context;

use cmd_avail::CmdAvail;
use cmd_help::CmdHelp;
use cmd_init::CmdInit;
use cmd_list::CmdList;
use cmd_load::CmdLoad;
use cmd_purge::CmdPurge;
use cmd_restore::CmdRestore;
use cmd_save::CmdSave;
use cmd_savelist::CmdSaveList;
use cmd_show::CmdShow;
use cmd_unload::CmdUnload;
use cmd_whatis::CmdWhatis;
use context::Context;


/// Exit code for command line usage errors.
const USAGE_EXIT_CODE: i32 = 64;

#[derive(Parser)]
#[clap(
    name = "modenv",
    about = "Environment Module Manager",
    version,
    disable_help_subcommand = true,
    long_about = "Load and unload environment modules in the current shell.\n\n\
                  Run through the shell function printed by 'modenv init <shell>'."
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(flatten)]
    context: Context,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List loaded modules
    List(CmdList),

    /// List available modules
    Avail(CmdAvail),

    /// Load one or more modules
    #[clap(alias = "add")]
    Load(CmdLoad),

    /// Unload one or more modules
    #[clap(alias = "rm")]
    Unload(CmdUnload),

    /// Unload all loaded modules
    Purge(CmdPurge),

    /// Print a module's one-line description
    Whatis(CmdWhatis),

    /// Print a module's help text
    Help(CmdHelp),

    /// Print a module's definition
    #[clap(alias = "display")]
    Show(CmdShow),

    /// Print the shell function that runs modenv
    Init(CmdInit),

    /// Save the loaded modules as a collection
    Save(CmdSave),

    /// Replace the loaded modules with a saved collection
    Restore(CmdRestore),

    /// List saved collections
    #[clap(name = "savelist")]
    SaveList(CmdSaveList),
}

impl Opt {
    fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        // stdout is evaluated by the shell
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .without_time()
            .init();
        colored::control::set_override(std::io::stderr().is_terminal());

        let ctx = &self.context;
        match self.cmd {
            Command::List(mut cmd) => cmd.run(ctx),
            Command::Avail(mut cmd) => cmd.run(ctx),
            Command::Load(mut cmd) => cmd.run(ctx),
            Command::Unload(mut cmd) => cmd.run(ctx),
            Command::Purge(mut cmd) => cmd.run(ctx),
            Command::Whatis(mut cmd) => cmd.run(ctx),
            Command::Help(mut cmd) => cmd.run(ctx),
            Command::Show(mut cmd) => cmd.run(ctx),
            Command::Init(mut cmd) => cmd.run(ctx),
            Command::Save(mut cmd) => cmd.run(ctx),
            Command::Restore(mut cmd) => cmd.run(ctx),
            Command::SaveList(mut cmd) => cmd.run(ctx),
        }
    }
}

fn main() {
    let opt = match Opt::try_parse() {
        Ok(opt) => opt,
        Err(err) => {
            // help and version output would be evaluated if sent to stdout
            eprint!("{}", err.render().ansi());
            let code = if err.use_stderr() { USAGE_EXIT_CODE } else { 0 };
            std::process::exit(code);
        }
    };

    let code = match opt.run() {
        Ok(code) => code,
        Err(report) => {
            let code = report
                .downcast_ref::<modenv::Error>()
                .map_or(modenv::GENERAL_FAILURE_EXIT_CODE, modenv::Error::exit_code);
            eprintln!("{report:?}");
            code
        }
    };
    std::process::exit(code);
}
