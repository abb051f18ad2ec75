//! Tracking and reaping background jobs.
//!
//! The shell records the pid of every background child it launches. Once
//! per loop iteration, after dispatch, each tracked pid gets exactly one
//! non-blocking wait; a pid whose child has terminated is reported and its
//! slot freed. No ordering is guaranteed between completions of different
//! jobs beyond table order of observation.

use crate::state::CommandOutcome;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::io::{self, Write};

/// Upper bound on concurrently tracked background jobs.
pub const MAX_JOBS: usize = 150;

/// The set of live background pids.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Pid>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Whether registering another job would exceed [`MAX_JOBS`]. The
    /// launcher checks this before forking so a full table refuses the
    /// command instead of leaking an untracked child.
    pub fn is_full(&self) -> bool {
        self.jobs.len() >= MAX_JOBS
    }

    /// Track a freshly launched background child.
    pub fn register(&mut self, pid: Pid) -> anyhow::Result<()> {
        if self.is_full() {
            anyhow::bail!("job table full: {} background jobs already tracked", MAX_JOBS);
        }
        self.jobs.push(pid);
        Ok(())
    }

    /// One non-blocking wait per tracked job. Terminated jobs are reported
    /// to `out` and their slots freed; the rest stay for the next round.
    pub fn reap(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let mut still_running = Vec::with_capacity(self.jobs.len());
        for &pid in &self.jobs {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => still_running.push(pid),
                Ok(WaitStatus::Exited(done, code)) => {
                    writeln!(out, "process {} completed", done)?;
                    writeln!(out, "{}", CommandOutcome::Exited(code))?;
                }
                Ok(WaitStatus::Signaled(done, sig, _core_dumped)) => {
                    writeln!(out, "process {} completed", done)?;
                    writeln!(out, "term sig was {}", sig as i32)?;
                }
                // Stopped or continued children stay tracked.
                Ok(_) => still_running.push(pid),
                // Nothing left to wait on under that pid; free the slot.
                Err(_) => {}
            }
        }
        self.jobs = still_running;
        Ok(())
    }

    /// Forcibly terminate every tracked job and wait for each to die.
    /// Used by `exit` (and end-of-input) so the shell leaves no orphans.
    pub fn kill_all(&mut self) {
        for &pid in &self.jobs {
            let _ = kill(pid, Signal::SIGKILL);
            let _ = waitpid(pid, None);
        }
        self.jobs.clear();
    }
}
