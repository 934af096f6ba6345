//! Per-connection session actor.
//!
//! Every socket, whether accepted or dialed, runs the same actor: announce
//! ourselves with `IM`, then read lines until EOF. A session owns its
//! socket's read half; the write half is owned by a companion writer thread
//! fed through a channel, and a clone of that channel's sender is what ends
//! up in the neighbour table when the peer's handshake is admitted.

use std::io;
use std::io::{BufRead, BufReader, Write};
use std::net;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

use crossbeam_channel as chan;
use log::*;

use crate::service;
use crate::service::message::Message;
use crate::service::Depot;
use crate::wire::LineReader;

/// How many leading lines a peer may send before the handshake must have
/// completed. Within this grace, non-`IM` lines are ignored.
const HANDSHAKE_GRACE: usize = 2;

/// Reason a session stopped.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Transport failure on the session socket.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The peer kept talking without completing the handshake.
    #[error("peer did not complete the handshake")]
    Misbehavior,
}

/// A command recorded by `Defer`, awaiting `Execute`.
#[derive(Debug, Clone)]
struct Deferred {
    key: u64,
    line: String,
    executed: bool,
}

/// State of one session with a peer.
pub struct Session {
    /// Handle to the process-wide depot state.
    depot: Arc<Depot>,
    /// Sink feeding this session's writer half.
    tx: chan::Sender<String>,
    /// Whether our own `IM` line went out.
    im_sent: bool,
    /// Whether the peer's `IM` was accepted into the neighbour table.
    im_received: bool,
    /// Commands recorded by `Defer`. Append-only; replayed records are
    /// marked, never removed.
    deferred: Vec<Deferred>,
}

/// Run a session over an established stream, spawning its writer thread.
/// Returns when the peer disconnects or violates the handshake.
pub fn run(depot: Arc<Depot>, stream: TcpStream) -> Result<(), Error> {
    let reader = LineReader::new(BufReader::new(stream.try_clone()?));
    let writer = stream.try_clone()?;
    let (tx, rx) = chan::unbounded();

    thread::spawn(move || write_loop(writer, rx));

    let result = Session::new(depot, tx).run(reader);

    // Both halves go down together. The writer thread notices on its next
    // send, if the neighbour table still holds a sink for this session.
    stream.shutdown(net::Shutdown::Both).ok();
    result
}

/// Run a session on its own thread.
pub fn spawn(depot: Arc<Depot>, stream: TcpStream) {
    thread::spawn(move || {
        if let Err(err) = run(depot, stream) {
            debug!("session closed: {err}");
        }
    });
}

/// Drain `rx` into the socket. Stops at the first write error: the peer is
/// gone and anything still queued is undeliverable.
fn write_loop(mut stream: TcpStream, rx: chan::Receiver<String>) {
    for line in rx {
        if stream.write_all(line.as_bytes()).is_err() {
            break;
        }
    }
}

impl Session {
    pub fn new(depot: Arc<Depot>, tx: chan::Sender<String>) -> Self {
        Self {
            depot,
            tx,
            im_sent: false,
            im_received: false,
            deferred: Vec::new(),
        }
    }

    /// Read lines until EOF, transport error or handshake violation.
    pub fn run<R: BufRead>(mut self, mut reader: LineReader<R>) -> Result<(), Error> {
        self.greet();

        let mut received = 0;
        while let Some(line) = reader.read_line()? {
            if received >= HANDSHAKE_GRACE && !self.handshaken() {
                return Err(Error::Misbehavior);
            }
            self.dispatch(&line);
            received += 1;
        }
        Ok(())
    }

    /// Opening move of every session: announce ourselves.
    fn greet(&mut self) {
        self.send(Message::Im {
            port: self.depot.port,
            name: self.depot.name.clone(),
        });
        self.im_sent = true;
    }

    fn handshaken(&self) -> bool {
        self.im_sent && self.im_received
    }

    fn send(&self, msg: Message) {
        self.tx.send(msg.to_line()).ok();
    }

    /// Handle one line from the peer. Malformed lines are dropped, and
    /// nothing but `IM` is honoured before the handshake completes.
    pub fn dispatch(&mut self, line: &str) {
        let Some(msg) = Message::parse(line) else {
            trace!("dropping malformed line {line:?}");
            return;
        };

        match msg {
            Message::Im { port, name } => self.handle_im(port, &name),
            _ if !self.im_received => {}
            Message::Connect { port } => service::connect(self.depot.clone(), port),
            Message::Deliver { qty, good } => self.depot.inventory().deliver(&good, qty),
            Message::Withdraw { qty, good } => self.depot.inventory().withdraw(&good, qty),
            Message::Transfer { qty, good, dest } => self.handle_transfer(qty, &good, &dest),
            Message::Defer { key, line } => self.deferred.push(Deferred {
                key,
                line,
                executed: false,
            }),
            Message::Execute { key } => self.handle_execute(key),
        }
    }

    /// A second `IM` on the same session is a no-op, as is one whose name
    /// or port is already taken. `im_received` is only set once the peer
    /// actually holds a seat in the neighbour table.
    fn handle_im(&mut self, port: u16, name: &str) {
        if self.im_received {
            return;
        }
        if self.depot.neighbours().try_admit(name, port, self.tx.clone()) {
            debug!("{name} joined from port {port}");
            self.im_received = true;
        }
    }

    /// Debit the ledger and forward a `Deliver` to the destination, or do
    /// nothing at all when the destination is not a neighbour. The sink
    /// write happens outside both locks.
    fn handle_transfer(&mut self, qty: i64, good: &str, dest: &str) {
        let Some(sink) = self.depot.neighbours().sink(dest) else {
            return;
        };
        self.depot.inventory().withdraw(good, qty);
        sink.send(
            Message::Deliver {
                qty,
                good: good.to_owned(),
            }
            .to_line(),
        )
        .ok();
    }

    /// Replay all unexecuted records under `key`, in insertion order.
    ///
    /// Records are marked executed before any replay happens, so a replayed
    /// `Execute` for the same key finds nothing left and recursion
    /// terminates.
    fn handle_execute(&mut self, key: u64) {
        let mut lines = Vec::new();
        for record in self
            .deferred
            .iter_mut()
            .filter(|r| r.key == key && !r.executed)
        {
            record.executed = true;
            lines.push(record.line.clone());
        }
        for line in lines {
            self.dispatch(&line);
        }
    }
}
