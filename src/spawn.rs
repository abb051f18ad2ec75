//! Launching external commands.
//!
//! All OS-process primitives live behind this one seam: the launcher takes
//! a fully resolved [`Command`] and either blocks for a foreground
//! [`CommandOutcome`] or returns the pid of a background child.
//!
//! The child half of the fork applies redirections by rebinding fds 0 and
//! 1, then replaces its image with `execvp`, which searches `PATH`. Each
//! failure mode terminates the child with its own exit code so the parent
//! (and the user, via `status`) can tell them apart.

use crate::parser::Command;
use crate::signals;
use crate::state::CommandOutcome;
use anyhow::{Context, Result};
use nix::fcntl::{OFlag, open};
use nix::libc;
use nix::sys::stat::Mode;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, dup2, execvp, fork};
use std::ffi::CString;

/// Child exit code: a redirection file could not be opened.
pub const EXIT_REDIRECT_OPEN: i32 = 1;
/// Child exit code: dup2 onto fd 0 or fd 1 failed.
pub const EXIT_REDIRECT_DUP: i32 = 2;
/// Child exit code: execvp failed (command not found, not executable).
pub const EXIT_EXEC: i32 = 3;

/// Fork-bomb guard: at most this many forks while handling one input line.
/// Normal operation forks once per line, so tripping this means something
/// has gone badly wrong and the whole shell aborts.
const MAX_FORKS_PER_LINE: usize = 50;

/// Creates child processes and accounts for how many forks one input line
/// has cost.
#[derive(Debug, Default)]
pub struct Launcher {
    forks_this_line: usize,
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-line fork counter. Called once per prompt.
    pub fn begin_line(&mut self) {
        self.forks_this_line = 0;
    }

    fn count_fork(&mut self) {
        self.forks_this_line += 1;
        if self.forks_this_line >= MAX_FORKS_PER_LINE {
            eprintln!(
                "error: forked over {} processes for one line. aborting...",
                MAX_FORKS_PER_LINE
            );
            std::process::abort();
        }
    }

    /// Launch `cmd` and block until it terminates.
    pub fn spawn_foreground(&mut self, cmd: &Command) -> Result<CommandOutcome> {
        self.count_fork();
        match unsafe { fork() }.context("fork failed")? {
            ForkResult::Child => child_exec(cmd, false),
            ForkResult::Parent { child } => {
                let status = waitpid(child, None).context("wait on foreground child failed")?;
                Ok(classify(status))
            }
        }
    }

    /// Launch `cmd` without waiting; the returned pid goes into the job
    /// table. Missing redirections fall back to `/dev/null` in the child
    /// so the job never reads from or writes to the terminal by accident.
    pub fn spawn_background(&mut self, cmd: &Command) -> Result<Pid> {
        self.count_fork();
        match unsafe { fork() }.context("fork failed")? {
            ForkResult::Child => child_exec(cmd, true),
            ForkResult::Parent { child } => Ok(child),
        }
    }
}

fn classify(status: WaitStatus) -> CommandOutcome {
    match status {
        WaitStatus::Exited(_, code) => CommandOutcome::Exited(code),
        WaitStatus::Signaled(_, sig, _core_dumped) => CommandOutcome::Signaled(sig as i32),
        // Without WUNTRACED the blocking wait only returns for termination.
        _ => CommandOutcome::Exited(0),
    }
}

/// Terminate the forked child without running the parent's cleanup
/// handlers or flushing its inherited buffers.
fn child_fail(message: &str, code: i32) -> ! {
    eprintln!("{}", message);
    unsafe { libc::_exit(code) }
}

/// Runs in the forked child: reset signal dispositions, rebind fds 0/1,
/// exec. Never returns; every failure path exits with a distinct code.
fn child_exec(cmd: &Command, background: bool) -> ! {
    signals::restore_child_defaults();

    if let Some(path) = &cmd.input_path {
        redirect_stdin(path);
    } else if background {
        redirect_stdin("/dev/null");
    }

    if let Some(path) = &cmd.output_path {
        redirect_stdout(path);
    } else if background {
        redirect_stdout("/dev/null");
    }

    let mut argv: Vec<CString> = Vec::with_capacity(cmd.args.len());
    for arg in &cmd.args {
        match CString::new(arg.as_str()) {
            Ok(c) => argv.push(c),
            Err(_) => child_fail(
                &format!("{}: argument contains a NUL byte", cmd.name),
                EXIT_EXEC,
            ),
        }
    }

    let program = argv[0].clone();
    match execvp(&program, &argv) {
        Ok(never) => match never {},
        Err(err) => child_fail(&format!("{}: {}", cmd.name, err), EXIT_EXEC),
    }
}

fn redirect_stdin(path: &str) {
    let fd = match open(path, OFlag::O_RDONLY, Mode::empty()) {
        Ok(fd) => fd,
        Err(err) => child_fail(
            &format!("cannot open {} for input: {}", path, err),
            EXIT_REDIRECT_OPEN,
        ),
    };
    if let Err(err) = dup2(fd, libc::STDIN_FILENO) {
        child_fail(&format!("cannot redirect stdin: {}", err), EXIT_REDIRECT_DUP);
    }
}

fn redirect_stdout(path: &str) {
    let fd = match open(
        path,
        OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        Mode::from_bits_truncate(0o644),
    ) {
        Ok(fd) => fd,
        Err(err) => child_fail(
            &format!("cannot open {} for output: {}", path, err),
            EXIT_REDIRECT_OPEN,
        ),
    };
    if let Err(err) = dup2(fd, libc::STDOUT_FILENO) {
        child_fail(&format!("cannot redirect stdout: {}", err), EXIT_REDIRECT_DUP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn command(line: &str) -> Command {
        parse_line(line, false).unwrap().unwrap()
    }

    #[test]
    fn foreground_exit_codes_are_classified() {
        let mut launcher = Launcher::new();
        launcher.begin_line();
        let ok = launcher.spawn_foreground(&command("true\n")).unwrap();
        assert_eq!(ok, CommandOutcome::Exited(0));

        launcher.begin_line();
        let fail = launcher.spawn_foreground(&command("false\n")).unwrap();
        assert_eq!(fail, CommandOutcome::Exited(1));
    }

    #[test]
    fn exec_failure_exits_with_the_exec_code() {
        let mut launcher = Launcher::new();
        launcher.begin_line();
        let outcome = launcher
            .spawn_foreground(&command("definitely-not-a-real-command-4242\n"))
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Exited(EXIT_EXEC));
    }

    #[test]
    fn missing_input_file_exits_with_the_open_code() {
        let outcome = Launcher::new()
            .spawn_foreground(&command("cat < /no/such/file/anywhere\n"))
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Exited(EXIT_REDIRECT_OPEN));
    }
}
