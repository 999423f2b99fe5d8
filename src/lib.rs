//! `cell-access`: reliable delivery of fixed-layout binary messages over
//! UDP, built for the cellular access-permission handshake: a client asks
//! whether a subscriber on a given technology has paid, a server answers from
//! its verification directory.
//!
//! Reliability is stop-and-wait ARQ: one packet in flight, a fixed
//! per-attempt timeout, and a bounded number of identical retransmissions.
//! Alongside the handshake, the wire format defines a general segmented
//! transfer (data/ack/reject) with duplicate and out-of-sequence detection
//! over a five-slot cyclic segment space.
//!
//! Module responsibilities:
//! - [`packet`]: wire formats, decoding, and structural validation
//! - [`directory`]: the in-memory subscriber verification table
//! - [`session`]: the stop-and-wait retransmission engine (client side)
//! - [`responder`]: request adjudication and segment sequencing (server side)
//! - [`network`]: the UDP transport
//! - [`config`]: line-oriented input files (request script, database)

pub mod config;
pub mod directory;
pub mod error;
pub mod network;
pub mod packet;
pub mod responder;
pub mod session;

pub use error::ProtocolError;
