//! Signal handling for the shell process.
//!
//! Two handlers are installed once at startup, both with `SA_RESTART` so a
//! blocking read that a signal interrupts is transparently resumed:
//!
//! - SIGINT prints a fixed diagnostic and returns. The shell itself never
//!   dies on Ctrl-C; a forked child restores the default disposition before
//!   exec, so Ctrl-C terminates the foreground child only.
//! - SIGTSTP toggles foreground-only mode and announces the new state.
//!
//! Handlers do nothing beyond one atomic store and one raw `write(2)` of a
//! fixed byte string; everything richer happens in the main loop, which
//! samples [`foreground_only`] once per iteration before the parser decides
//! what a trailing `&` means.

use nix::libc;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide foreground-only flag, written only from the SIGTSTP handler.
static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

const SIGINT_MSG: &[u8] = b"Caught SIGINT\n";
// The trailing ": " re-draws the prompt the toggle interrupts.
const ENTER_FG_ONLY_MSG: &[u8] = b"Entering foreground-only mode (& is now ignored)\n: ";
const EXIT_FG_ONLY_MSG: &[u8] = b"Exiting foreground-only mode\n: ";

/// Raw, unbuffered write to stdout. The only I/O primitive that is legal
/// inside a signal handler.
fn raw_write(msg: &[u8]) {
    unsafe {
        let _ = libc::write(libc::STDOUT_FILENO, msg.as_ptr().cast(), msg.len());
    }
}

extern "C" fn on_sigint(_signo: libc::c_int) {
    raw_write(SIGINT_MSG);
}

extern "C" fn on_sigtstp(_signo: libc::c_int) {
    let was_on = FOREGROUND_ONLY.fetch_xor(true, Ordering::SeqCst);
    if was_on {
        raw_write(EXIT_FG_ONLY_MSG);
    } else {
        raw_write(ENTER_FG_ONLY_MSG);
    }
}

/// Install the shell's SIGINT and SIGTSTP handlers. Called once at startup.
pub fn install() -> nix::Result<()> {
    let on_int = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::SA_RESTART,
        SigSet::all(),
    );
    let on_tstp = SigAction::new(
        SigHandler::Handler(on_sigtstp),
        SaFlags::SA_RESTART,
        SigSet::all(),
    );
    unsafe {
        sigaction(Signal::SIGINT, &on_int)?;
        sigaction(Signal::SIGTSTP, &on_tstp)?;
    }
    Ok(())
}

/// Current state of the foreground-only toggle.
pub fn foreground_only() -> bool {
    FOREGROUND_ONLY.load(Ordering::SeqCst)
}

/// Put SIGINT and SIGTSTP back to their default dispositions.
///
/// Called in a forked child before exec so the child reacts to Ctrl-C the
/// way a plain program would. exec would already reset a caught handler;
/// doing it explicitly keeps the window between fork and exec covered too.
pub(crate) fn restore_child_defaults() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    unsafe {
        let _ = sigaction(Signal::SIGINT, &default);
        let _ = sigaction(Signal::SIGTSTP, &default);
    }
}
