//! Depot service: the shared node state and the plumbing that turns
//! accepted or dialed sockets into running sessions.

pub mod inventory;
pub mod message;
pub mod neighbours;
pub mod session;

use std::io;
use std::net;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::*;

use inventory::Inventory;
use neighbours::Neighbours;

/// Shared state of a running depot node.
///
/// One of these exists per process, behind an [`Arc`], handed to every
/// session and to the signal watcher. The ledger and the neighbour table
/// are independent synchronization domains; no lock is ever held across a
/// socket or channel write.
#[derive(Debug)]
pub struct Depot {
    /// Our node name, announced in handshakes.
    pub name: String,
    /// Port our listening socket is bound to.
    pub port: u16,
    inventory: Mutex<Inventory>,
    neighbours: Mutex<Neighbours>,
}

impl Depot {
    pub fn new(name: String, port: u16, inventory: Inventory) -> Self {
        Self {
            name,
            port,
            inventory: Mutex::new(inventory),
            neighbours: Mutex::new(Neighbours::new()),
        }
    }

    /// Exclusive access to the goods ledger. A poisoned lock is taken over
    /// as-is: a panicked session must not take the whole depot down.
    pub fn inventory(&self) -> MutexGuard<'_, Inventory> {
        self.inventory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the neighbour table.
    pub fn neighbours(&self) -> MutexGuard<'_, Neighbours> {
        self.neighbours.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a snapshot of the ledger and the neighbour table to `w`.
    ///
    /// Both snapshots are taken under the same locks mutations use, so the
    /// output is consistent with some sequential order of completed
    /// mutations.
    pub fn dump(&self, w: &mut impl io::Write) -> io::Result<()> {
        let goods = self.inventory().snapshot();
        let peers = self.neighbours().snapshot();

        writeln!(w, "Goods:")?;
        for good in goods {
            writeln!(w, "{} {}", good.name, good.qty)?;
        }
        writeln!(w, "Neighbours:")?;
        for peer in peers {
            writeln!(w, "{}", peer.name)?;
        }
        w.flush()
    }
}

/// Accept inbound sessions until the process exits.
pub fn listen(depot: Arc<Depot>, listener: net::TcpListener) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => session::spawn(depot.clone(), stream),
            Err(err) => debug!("accept failed: {err}"),
        }
    }
}

/// Dial a depot on the loopback interface and run a session over the
/// resulting stream. Dial failures are dropped without retry.
pub fn connect(depot: Arc<Depot>, port: u16) {
    thread::spawn(move || {
        match net::TcpStream::connect((net::Ipv4Addr::LOCALHOST, port)) {
            Ok(stream) => {
                if let Err(err) = session::run(depot, stream) {
                    debug!("outbound session to port {port} closed: {err}");
                }
            }
            Err(err) => debug!("dial 127.0.0.1:{port} failed: {err}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_format() {
        let depot = Depot::new(
            "alpha".to_owned(),
            9000,
            Inventory::from_iter([
                ("milk".to_owned(), 5),
                ("bread".to_owned(), 0),
            ]),
        );
        depot
            .neighbours()
            .try_admit("beta", 9001, crossbeam_channel::unbounded().0);

        let mut out = Vec::new();
        depot.dump(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Goods:\nmilk 5\nNeighbours:\nbeta\n"
        );
    }
}
