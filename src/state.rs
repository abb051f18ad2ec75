//! Shell-lifetime mutable state.

use std::fmt;

/// How a waited-on child finished: a normal exit or a fatal signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Exited(i32),
    Signaled(i32),
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Exited(code) => write!(f, "exit value {}", code),
            CommandOutcome::Signaled(sig) => write!(f, "terminated by signal {}", sig),
        }
    }
}

/// State shared across loop iterations.
///
/// Only foreground completions are recorded here; a background job
/// finishing never changes what `status` reports. The foreground-only
/// toggle lives in [`crate::signals`] because the SIGTSTP handler writes
/// it asynchronously.
#[derive(Debug, Default)]
pub struct ShellState {
    last_foreground_result: Option<CommandOutcome>,
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a foreground launch.
    pub fn record_foreground(&mut self, outcome: CommandOutcome) {
        self.last_foreground_result = Some(outcome);
    }

    /// The line `status` prints. Before any foreground command has run,
    /// the defined default is a clean exit.
    pub fn status_line(&self) -> String {
        self.last_foreground_result
            .unwrap_or(CommandOutcome::Exited(0))
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_a_clean_exit() {
        assert_eq!(ShellState::new().status_line(), "exit value 0");
    }

    #[test]
    fn status_tracks_the_latest_foreground_outcome() {
        let mut state = ShellState::new();
        state.record_foreground(CommandOutcome::Exited(2));
        assert_eq!(state.status_line(), "exit value 2");
        state.record_foreground(CommandOutcome::Signaled(15));
        assert_eq!(state.status_line(), "terminated by signal 15");
    }
}
