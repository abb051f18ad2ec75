//! A miniature, line-oriented Unix shell.
//!
//! The shell reads one command per `: ` prompt, runs the built-ins `exit`,
//! `cd` and `status` in-process, and launches everything else as a child
//! process with optional stdin/stdout redirection. A trailing `&` runs the
//! command in the background; background completions are collected with a
//! non-blocking wait once per loop iteration. Ctrl-Z toggles a
//! foreground-only mode in which `&` is ignored.
//!
//! The main entry point is [`Interpreter`], which wires the line reader,
//! parser, built-in dispatcher, process launcher and job reaper into one
//! loop. The public modules expose the individual pieces so they can be
//! exercised on their own.
//!
//! Unix only: the launcher is built on fork/exec and the mode toggle on
//! sigaction, via the `nix` crate.

mod builtin;
mod expand;
mod interpreter;
mod jobs;
pub mod parser;
pub mod signals;
mod spawn;
pub mod state;

/// Convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
