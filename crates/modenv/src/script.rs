// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Rendering environment changes as script text for the calling shell.
//!
//! modenv runs as a child of the interactive shell and cannot touch its
//! environment directly. Instead it prints assignments that a small wrapper
//! function evaluates in the parent.

use std::fmt::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::environment::EnvChange;
use crate::Error;

#[cfg(test)]
#[path = "./script_test.rs"]
mod script_test;

/// Shell syntax families that scripts can be rendered for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    /// POSIX shells: sh, bash, zsh, dash, ksh.
    #[default]
    Sh,
    /// csh and tcsh.
    Csh,
    Fish,
}

impl Shell {
    pub const ALL: [Shell; 3] = [Shell::Sh, Shell::Csh, Shell::Fish];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sh => "sh",
            Self::Csh => "csh",
            Self::Fish => "fish",
        }
    }

    /// Guess the syntax family from a shell path such as `$SHELL`.
    pub fn detect(shell_path: &str) -> Option<Self> {
        let name = Path::new(shell_path).file_name()?.to_str()?;
        name.parse().ok()
    }
}

impl std::fmt::Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Shell {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sh" | "bash" | "zsh" | "dash" | "ksh" => Ok(Self::Sh),
            "csh" | "tcsh" => Ok(Self::Csh),
            "fish" => Ok(Self::Fish),
            other => Err(Error::Config(format!(
                "unsupported shell '{other}' (expected sh, bash, zsh, ksh, csh, tcsh or fish)"
            ))),
        }
    }
}

/// Render `changes` as statements for `shell`, one per line.
///
/// Every value is quoted; variable names are emitted as-is and must already
/// be valid identifiers.
pub fn render(changes: &[EnvChange], shell: Shell) -> String {
    let mut script = String::new();
    for change in changes {
        // writing to a String cannot fail
        let _ = match (change, shell) {
            (EnvChange::Set { name, value }, Shell::Sh) => {
                writeln!(script, "export {name}={};", quote(value, shell))
            }
            (EnvChange::Unset { name }, Shell::Sh) => writeln!(script, "unset {name};"),
            (EnvChange::Set { name, value }, Shell::Csh) => {
                writeln!(script, "setenv {name} {};", quote(value, shell))
            }
            (EnvChange::Unset { name }, Shell::Csh) => writeln!(script, "unsetenv {name};"),
            (EnvChange::Set { name, value }, Shell::Fish) => {
                writeln!(script, "set -gx {name} {};", quote(value, shell))
            }
            (EnvChange::Unset { name }, Shell::Fish) => writeln!(script, "set -e {name};"),
        };
    }
    script
}

/// Quote a value so `shell` reads it back byte-for-byte.
pub fn quote(value: &str, shell: Shell) -> String {
    match shell {
        Shell::Sh => format!("'{}'", value.replace('\'', r"'\''")),
        Shell::Csh => {
            let escaped = value
                .replace('\'', r#"'"'"'"#)
                .replace('!', r"\!")
                .replace('\n', "\\\n");
            format!("'{escaped}'")
        }
        Shell::Fish => format!("'{}'", value.replace('\\', r"\\").replace('\'', r"\'")),
    }
}

/// The `module` shell function (or alias) that evaluates modenv's output.
///
/// Output is evaluated even when modenv fails, since an interrupted purge
/// still emits the unloads it committed, and the exit status is passed on.
pub fn wrapper(shell: Shell, executable: &Path) -> String {
    let exe = quote(&executable.display().to_string(), shell);
    match shell {
        Shell::Sh => format!(
            "module() {{\n    \
                 _modenv_script=\"$(command {exe} --shell sh \"$@\")\"\n    \
                 _modenv_status=$?\n    \
                 eval \"$_modenv_script\"\n    \
                 unset _modenv_script\n    \
                 return $_modenv_status\n\
             }}\n"
        ),
        // csh aliases cannot nest quoting, so the path is used verbatim
        Shell::Csh => format!(
            "alias module 'eval `{} --shell csh \\!*`'\n",
            executable.display()
        ),
        Shell::Fish => format!(
            "function module\n    \
                 set -l _modenv_script (command {exe} --shell fish $argv)\n    \
                 set -l _modenv_status $status\n    \
                 string join \\n -- $_modenv_script | source\n    \
                 return $_modenv_status\n\
             end\n"
        ),
    }
}
