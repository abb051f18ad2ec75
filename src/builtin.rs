//! Built-in commands: `exit`, `cd` and `status`.
//!
//! Built-ins are parsed with the [`argh`] crate (`FromArgs`) and run in the
//! shell process itself. They are always foreground commands: a trailing
//! `&` on a built-in has already been dropped by the time dispatch runs,
//! and even if it were set it would be ignored here.

use crate::jobs::JobTable;
use crate::parser::Command;
use crate::state::ShellState;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::path::PathBuf;

/// Conventional exit code type: 0 for success, non-zero for failure.
pub type ExitCode = i32;

/// Built-in commands known to the shell at compile time.
pub(crate) trait Builtin: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Executes the command. Diagnostics go to `out`; a failing built-in
    /// reports there and returns non-zero, it never kills the shell.
    fn execute(
        self,
        out: &mut dyn Write,
        state: &mut ShellState,
        jobs: &mut JobTable,
    ) -> Result<ExitCode>;
}

/// Result of offering a parsed command to the built-in set.
pub(crate) enum Dispatch {
    /// The command was a built-in and has already run.
    Done,
    /// Not a built-in; hand it to the process launcher.
    External,
}

/// Try each built-in in turn; the first whose name matches handles the
/// command, usage errors and `--help` included.
pub(crate) fn dispatch(
    cmd: &Command,
    out: &mut dyn Write,
    state: &mut ShellState,
    jobs: &mut JobTable,
) -> Result<Dispatch> {
    if try_builtin::<Exit>(cmd, out, state, jobs)?
        || try_builtin::<Cd>(cmd, out, state, jobs)?
        || try_builtin::<Status>(cmd, out, state, jobs)?
    {
        Ok(Dispatch::Done)
    } else {
        Ok(Dispatch::External)
    }
}

fn try_builtin<B: Builtin>(
    cmd: &Command,
    out: &mut dyn Write,
    state: &mut ShellState,
    jobs: &mut JobTable,
) -> Result<bool> {
    if cmd.name != B::name() {
        return Ok(false);
    }
    let positional: Vec<&str> = cmd.args.iter().skip(1).map(String::as_str).collect();
    match B::from_args(&[B::name()], &positional) {
        Ok(builtin) => {
            builtin.execute(out, state, jobs)?;
        }
        Err(EarlyExit { output, status: _ }) => {
            // argh's --help text or usage complaint.
            writeln!(out, "{}", output.trim_end())?;
        }
    }
    Ok(true)
}

#[derive(FromArgs)]
/// Kill every tracked background job, then terminate the shell with
/// status 0.
pub(crate) struct Exit {
    #[argh(positional, greedy)]
    /// ignored; exit takes effect regardless of any arguments
    pub _args: Vec<String>,
}

impl Builtin for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _out: &mut dyn Write,
        _state: &mut ShellState,
        jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        jobs.kill_all();
        std::process::exit(0)
    }
}

#[derive(FromArgs)]
/// Change the working directory.
/// With no target, changes to the directory named by the HOME environment
/// variable.
pub(crate) struct Cd {
    #[argh(positional)]
    /// directory to change to; absolute or relative to the current
    /// directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl Builtin for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        out: &mut dyn Write,
        _state: &mut ShellState,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        let target = match self.target {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => match std::env::var("HOME") {
                Ok(home) => PathBuf::from(home),
                Err(_) => {
                    writeln!(out, "cd: no target and HOME is not set")?;
                    return Ok(1);
                }
            },
        };
        if let Err(err) = std::env::set_current_dir(&target) {
            writeln!(out, "cd: {}: {}", target.display(), err)?;
            return Ok(1);
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Report how the most recent foreground command finished: its exit value,
/// or the signal that terminated it.
pub(crate) struct Status {}

impl Builtin for Status {
    fn name() -> &'static str {
        "status"
    }

    fn execute(
        self,
        out: &mut dyn Write,
        state: &mut ShellState,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        writeln!(out, "{}", state.status_line())?;
        Ok(0)
    }
}
