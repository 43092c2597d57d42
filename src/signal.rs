use std::sync::OnceLock;

use crate::engine::CancelToken;

static INTERRUPT: OnceLock<CancelToken> = OnceLock::new();

/// Cancel `token` when the process receives SIGINT.
///
/// Only the first installed token is wired; later calls are no-ops.
/// Returns `false` on platforms without SIGINT support here.
pub fn cancel_on_interrupt(token: &CancelToken) -> bool {
    if INTERRUPT.set(token.clone()).is_err() {
        return true;
    }
    install()
}

#[cfg(unix)]
extern "C" fn on_interrupt(_: libc::c_int) {
    if let Some(token) = INTERRUPT.get() {
        token.cancel();
    }
    // A second Ctrl-C terminates immediately.
    // SAFETY: signal() is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}

#[cfg(unix)]
fn install() -> bool {
    let handler = on_interrupt as extern "C" fn(libc::c_int);
    // SAFETY: `on_interrupt` only performs atomic loads and stores and calls
    // signal(), none of which allocate or lock.
    let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
    previous != libc::SIG_ERR
}

#[cfg(not(unix))]
fn install() -> bool {
    false
}
