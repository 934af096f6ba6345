//! A depot node: one participant in a peer-to-peer network of inventory
//! holders.
//!
//! Each node keeps a ledger of named goods, discovers peers over inbound
//! and outbound TCP sessions guarded by an identity handshake, moves goods
//! between neighbours, and can record command batches for atomic replay.
//! Byzantine peer input never terminates the process: bad lines are
//! dropped, bad sessions are closed, and the node carries on.
pub mod logger;
pub mod service;
pub mod signals;
pub mod wire;
