//! The neighbour table.

use std::collections::BTreeMap;

use crossbeam_channel as chan;

/// A peer depot that completed the identity handshake on some session.
#[derive(Debug, Clone)]
pub struct Neighbour {
    /// Name the peer announced.
    pub name: String,
    /// Port the peer's own listening socket is bound to.
    pub port: u16,
    /// Sink for lines addressed to this peer. Feeds the writer half of the
    /// session the peer was admitted on; sends to a dead session fail and
    /// are ignored by callers.
    pub tx: chan::Sender<String>,
}

/// All admitted neighbours, keyed by name.
///
/// No two entries may share a name or a listening port. Entries are never
/// evicted, even after the underlying session is long gone.
#[derive(Debug, Default)]
pub struct Neighbours {
    peers: BTreeMap<String, Neighbour>,
}

impl Neighbours {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a peer, unless its name or port collides with an existing
    /// entry. Returns whether the peer was admitted.
    pub fn try_admit(&mut self, name: &str, port: u16, tx: chan::Sender<String>) -> bool {
        if self.peers.contains_key(name) || self.peers.values().any(|p| p.port == port) {
            return false;
        }
        self.peers.insert(
            name.to_owned(),
            Neighbour {
                name: name.to_owned(),
                port,
                tx,
            },
        );
        true
    }

    /// Clone of the line sink for `name`, so the caller can write to the
    /// peer without holding the table lock.
    pub fn sink(&self, name: &str) -> Option<chan::Sender<String>> {
        self.peers.get(name).map(|p| p.tx.clone())
    }

    /// Copy of all entries, in name order.
    pub fn snapshot(&self) -> Vec<Neighbour> {
        self.peers.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
