//! Reconfiguration signal handling.
//!
//! Rather than doing work in signal context, a dedicated thread parks on
//! the signal iterator and dumps depot state through the same locks the
//! sessions mutate under.

use std::io;
use std::sync::Arc;
use std::thread;

use signal_hook::consts::SIGHUP;
use signal_hook::iterator::Signals;

use crate::service::Depot;

/// Spawn the watcher thread: on every `SIGHUP`, write a snapshot of the
/// ledger and the neighbour table to stdout. The thread never exits.
pub fn watch(depot: Arc<Depot>) -> io::Result<()> {
    let mut signals = Signals::new([SIGHUP])?;

    thread::spawn(move || {
        for _ in signals.forever() {
            let stdout = io::stdout();
            let mut out = stdout.lock();

            depot.dump(&mut out).ok();
        }
    });

    Ok(())
}

/// Writing to a socket the peer already closed must not kill the process.
pub fn ignore_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}
