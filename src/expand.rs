//! `$$` expansion.
//!
//! Every argument equal to `$$`, or ending in `$$`, has that suffix
//! replaced with the shell's own process id in decimal. Those are the only
//! two supported shapes; a `$$` in the middle of an argument is left
//! untouched rather than guessed at.

use crate::parser::Command;
use nix::unistd::Pid;

/// Expand `$$` in a single argument.
pub fn expand_arg(arg: &str, pid: Pid) -> String {
    if arg == "$$" {
        return pid.to_string();
    }
    match arg.strip_suffix("$$") {
        Some(prefix) => format!("{}{}", prefix, pid),
        None => arg.to_string(),
    }
}

/// Expand `$$` across a command's argv, the name included. Redirection
/// paths are not expanded.
pub fn expand_command(cmd: &mut Command, pid: Pid) {
    for arg in &mut cmd.args {
        *arg = expand_arg(arg, pid);
    }
    cmd.name = cmd.args[0].clone();
}
