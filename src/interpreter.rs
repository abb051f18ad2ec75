//! The read-eval loop.
//!
//! One iteration: sample the foreground-only flag, read a line, parse it,
//! expand `$$`, run a built-in or launch a child, then give every tracked
//! background job one non-blocking wait. A foreground command finishes
//! completely before the next line is even read.

use crate::builtin::{self, Dispatch};
use crate::expand;
use crate::jobs::{self, JobTable};
use crate::parser::{self, Command};
use crate::signals;
use crate::spawn::Launcher;
use crate::state::{CommandOutcome, ShellState};
use anyhow::{Context, Result};
use nix::unistd::{Pid, getpid};
use std::io::{self, BufRead, Read, Write};

/// The interactive shell.
///
/// Owns everything with shell lifetime: the last foreground result, the
/// background job table and the process launcher. The foreground-only
/// flag lives in [`crate::signals`] because an async handler writes it.
pub struct Interpreter {
    state: ShellState,
    jobs: JobTable,
    launcher: Launcher,
    pid: Pid,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            state: ShellState::new(),
            jobs: JobTable::new(),
            launcher: Launcher::new(),
            pid: getpid(),
        }
    }

    /// Prompt-read-eval until stdin is exhausted. `exit` terminates the
    /// process from inside the loop and never returns here; end-of-input
    /// behaves like `exit` minus the process exit, so no jobs are
    /// orphaned either way.
    pub fn repl(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut stdout = io::stdout();
        let mut line = String::new();

        loop {
            write!(stdout, ": ")?;
            stdout.flush()?;

            line.clear();
            let bytes =
                read_line_capped(&mut input, &mut line).context("reading command line")?;
            if bytes == 0 {
                self.jobs.kill_all();
                return Ok(());
            }

            self.eval_line(&line, &mut stdout)?;
            self.jobs.reap(&mut stdout)?;
            stdout.flush()?;
        }
    }

    /// Evaluate one raw input line.
    ///
    /// User-level failures — parse errors, a full job table, a launch that
    /// cannot start — are reported to `out` and swallowed so the loop
    /// continues; only shell-internal failures bubble up.
    pub fn eval_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        self.launcher.begin_line();

        // The one checkpoint where the async toggle is observed.
        let foreground_only = signals::foreground_only();

        let mut cmd = match parser::parse_line(line, foreground_only) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Ok(()),
            Err(err) => {
                writeln!(out, "{}", err)?;
                return Ok(());
            }
        };
        expand::expand_command(&mut cmd, self.pid);

        match builtin::dispatch(&cmd, out, &mut self.state, &mut self.jobs)? {
            Dispatch::Done => Ok(()),
            Dispatch::External => self.launch(&cmd, out),
        }
    }

    /// One non-blocking wait per tracked background job, reporting any
    /// that have finished.
    pub fn reap_finished(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.jobs.reap(out)
    }

    /// Number of background jobs currently tracked.
    pub fn background_jobs(&self) -> usize {
        self.jobs.len()
    }

    fn launch(&mut self, cmd: &Command, out: &mut dyn Write) -> Result<()> {
        if cmd.background {
            if self.jobs.is_full() {
                writeln!(
                    out,
                    "too many background jobs ({} running); command not started",
                    jobs::MAX_JOBS
                )?;
                return Ok(());
            }
            match self.launcher.spawn_background(cmd) {
                Ok(pid) => {
                    writeln!(out, "background pid is {}", pid)?;
                    self.jobs.register(pid)?;
                }
                Err(err) => writeln!(out, "{:#}", err)?,
            }
            return Ok(());
        }

        match self.launcher.spawn_foreground(cmd) {
            Ok(outcome) => {
                // A foreground signal death is echoed immediately, except
                // signal 11: that one stays visible through `status` only,
                // as the original shell had it.
                if let CommandOutcome::Signaled(sig) = outcome {
                    if sig != 11 {
                        writeln!(out, "{}", outcome)?;
                    }
                }
                self.state.record_foreground(outcome);
            }
            Err(err) => {
                writeln!(out, "{:#}", err)?;
                self.state.record_foreground(CommandOutcome::Exited(1));
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one line without buffering more than the line limit.
///
/// At most [`parser::MAX_LINE_BYTES`] + 1 bytes land in `line`, enough for
/// the parser to tell an at-the-limit line from an over-long one. The rest
/// of an over-long line is consumed up to its newline so the excess is not
/// replayed as further commands. Returns the total bytes consumed; 0 means
/// end of input.
fn read_line_capped(reader: &mut impl BufRead, line: &mut String) -> io::Result<usize> {
    let cap = (parser::MAX_LINE_BYTES + 1) as u64;
    let mut consumed = (&mut *reader).take(cap).read_line(line)?;

    if consumed as u64 == cap && !line.ends_with('\n') {
        loop {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    consumed += pos + 1;
                    reader.consume(pos + 1);
                    break;
                }
                None => {
                    let len = buf.len();
                    consumed += len;
                    reader.consume(len);
                }
            }
        }
    }
    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};

    fn eval(sh: &mut Interpreter, line: &str) -> String {
        let mut out = Vec::new();
        sh.eval_line(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    /// Poll the reaper until it reports something or the deadline passes.
    fn reap_until_report(sh: &mut Interpreter) -> String {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        while out.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
            sh.reap_finished(&mut out).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn foreground_outcomes_drive_status() {
        let mut sh = Interpreter::new();
        eval(&mut sh, "true\n");
        assert_eq!(eval(&mut sh, "status\n"), "exit value 0\n");
        eval(&mut sh, "false\n");
        assert_eq!(eval(&mut sh, "status\n"), "exit value 1\n");
    }

    #[test]
    fn background_jobs_are_registered_and_reaped() {
        let mut sh = Interpreter::new();
        let output = eval(&mut sh, "sleep 0 &\n");
        assert!(
            output.starts_with("background pid is "),
            "got: {output:?}"
        );
        assert_eq!(sh.background_jobs(), 1);

        let report = reap_until_report(&mut sh);
        assert!(report.contains("completed"), "got: {report:?}");
        assert!(report.contains("exit value 0"), "got: {report:?}");
        assert_eq!(sh.background_jobs(), 0);
    }

    #[test]
    fn background_completion_never_touches_status() {
        let mut sh = Interpreter::new();
        eval(&mut sh, "false\n");
        eval(&mut sh, "sleep 0 &\n");
        let report = reap_until_report(&mut sh);
        assert!(report.contains("exit value 0"), "got: {report:?}");
        // Still the foreground result, not the background one.
        assert_eq!(eval(&mut sh, "status\n"), "exit value 1\n");
    }

    #[test]
    fn echo_with_ampersand_runs_in_the_foreground() {
        let mut sh = Interpreter::new();
        let output = eval(&mut sh, "echo hi > /dev/null &\n");
        assert!(!output.contains("background pid"), "got: {output:?}");
        assert_eq!(sh.background_jobs(), 0);
        assert_eq!(eval(&mut sh, "status\n"), "exit value 0\n");
    }

    #[test]
    fn redirection_plumbs_the_named_files() {
        let mut sh = Interpreter::new();
        let dir = std::env::temp_dir().join(format!("smallsh_redir_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("in.txt");
        let output = dir.join("out.txt");
        fs::write(&input, "bravo\nalpha\n").unwrap();

        let line = format!("sort < {} > {}\n", input.display(), output.display());
        eval(&mut sh, &line);

        assert_eq!(fs::read_to_string(&output).unwrap(), "alpha\nbravo\n");
        assert_eq!(eval(&mut sh, "status\n"), "exit value 0\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn dollar_dollar_expands_to_the_shell_pid() {
        let mut sh = Interpreter::new();
        let dir = std::env::temp_dir().join(format!("smallsh_pid_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let output = dir.join("pid.txt");

        let line = format!("echo foo$$ > {}\n", output.display());
        eval(&mut sh, &line);

        let expected = format!("foo{}\n", std::process::id());
        assert_eq!(fs::read_to_string(&output).unwrap(), expected);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn capped_reader_bounds_the_line_and_discards_the_excess() {
        let input = format!("{}\nstatus\n", "x".repeat(5000));
        let mut reader = io::Cursor::new(input.into_bytes());

        let mut line = String::new();
        let consumed = read_line_capped(&mut reader, &mut line).unwrap();
        // Only the limit plus one byte is buffered; the whole over-long
        // line (content and newline) was consumed from the stream.
        assert_eq!(line.len(), parser::MAX_LINE_BYTES + 1);
        assert_eq!(consumed, 5001);
        assert!(parser::parse_line(&line, false).is_err());

        // The next read starts cleanly on the following line.
        line.clear();
        read_line_capped(&mut reader, &mut line).unwrap();
        assert_eq!(line, "status\n");

        // And the line after that is end of input.
        line.clear();
        assert_eq!(read_line_capped(&mut reader, &mut line).unwrap(), 0);
    }

    #[test]
    fn capped_reader_passes_ordinary_lines_through() {
        let mut reader = io::Cursor::new(b"ls -la\n".to_vec());
        let mut line = String::new();
        let consumed = read_line_capped(&mut reader, &mut line).unwrap();
        assert_eq!(consumed, 7);
        assert_eq!(line, "ls -la\n");
    }

    #[test]
    fn parse_errors_are_reported_and_the_loop_survives() {
        let mut sh = Interpreter::new();
        let output = eval(&mut sh, "wc <\n");
        assert!(output.contains("syntax error"), "got: {output:?}");
        // The shell still works afterwards.
        assert_eq!(eval(&mut sh, "status\n"), "exit value 0\n");
    }

    #[test]
    fn unknown_command_is_reported_through_status() {
        let mut sh = Interpreter::new();
        eval(&mut sh, "definitely-not-a-real-command-4242 > /dev/null\n");
        assert_eq!(
            eval(&mut sh, "status\n"),
            format!("exit value {}\n", crate::spawn::EXIT_EXEC)
        );
    }
}
