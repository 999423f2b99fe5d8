use std::io;
use thiserror::Error;

use crate::packet::validate::ValidationError;
use crate::packet::DecodeError;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot decode datagram: {0}")]
    Decode(#[from] DecodeError),

    #[error("malformed packet: {0}")]
    Malformed(#[from] ValidationError),

    #[error("no response from peer after {0} transmissions")]
    RetriesExhausted(u32),

    #[error("invalid input file: {0}")]
    Config(String),
}

impl ProtocolError {
    /// `true` for faults that end the current exchange without any retry:
    /// a corrupted or unexpected response, or a transport-level failure.
    /// Per-attempt timeouts are not errors; they surface as `Ok(None)` from
    /// [`crate::session::Transport::recv_timeout`] and are retried.
    pub fn is_exchange_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_) | ProtocolError::Decode(_) | ProtocolError::Malformed(_)
        )
    }
}
