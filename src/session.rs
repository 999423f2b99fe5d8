//! Stop-and-wait retransmission engine for one exchange at a time.
//!
//! [`ArqSession`] owns an injected [`Transport`] and drives a single
//! request/response exchange: build, validate, send, await with a fixed
//! per-attempt timeout, and retransmit the identical bytes up to a bounded
//! number of times. Exactly one packet is ever in flight; there is no
//! backoff, no timer task, no window; "waiting" is the blocking
//! [`Transport::recv_timeout`] call.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ProtocolError;
use crate::packet::validate;
use crate::packet::{SubscriberKind, SubscriberPacket, Technology};

/// Per-attempt response timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Retries after the first transmission (3 retries = 4 transmissions total).
pub const DEFAULT_RETRIES: u32 = 3;

/// Byte-level channel to the peer. `recv_timeout` returning `Ok(None)` means
/// the timeout expired with no datagram; `Err` is a transport failure and is
/// exchange-fatal.
pub trait Transport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError>;
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, ProtocolError>;
}

/// Parameters for one access-permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestParams {
    pub client_id: u8,
    pub segment_no: u8,
    pub technology: Technology,
    pub subscriber_number: u32,
}

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No exchange in progress.
    Idle,
    /// A request is in flight, waiting for the response or a timeout.
    AwaitingResponse,
    /// The last exchange produced a response.
    Resolved,
    /// The last exchange ran out of retries; terminal for that exchange.
    Exhausted,
}

/// The stop-and-wait session. One outstanding exchange; no shared state.
pub struct ArqSession<T> {
    transport: T,
    timeout: Duration,
    max_retries: u32,
    state: SessionState,
}

impl<T: Transport> ArqSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_policy(transport, DEFAULT_TIMEOUT, DEFAULT_RETRIES)
    }

    pub fn with_policy(transport: T, timeout: Duration, max_retries: u32) -> Self {
        ArqSession {
            transport,
            timeout,
            max_retries,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run one full access-permission exchange.
    ///
    /// The outbound packet is validated before the first send, then encoded
    /// once; every retransmission reuses the identical bytes. A response that
    /// arrives but fails to decode or validate is fatal for this exchange,
    /// not retried. Running out of the retry budget yields
    /// [`ProtocolError::RetriesExhausted`] with the total transmission count.
    pub fn exchange(
        &mut self,
        params: &RequestParams,
    ) -> Result<SubscriberPacket, ProtocolError> {
        self.state = SessionState::Idle;

        let mut request = SubscriberPacket::default();
        request.update(
            params.client_id,
            SubscriberKind::AccessRequest,
            params.segment_no,
            params.technology,
            params.subscriber_number,
        );
        validate::check_subscriber(&request)?;
        let wire = request.to_bytes();

        self.state = SessionState::AwaitingResponse;
        debug!("sending request: {request}");

        let mut attempt: u32 = 0;
        loop {
            self.transport.send(&wire)?;

            match self.transport.recv_timeout(self.timeout)? {
                Some(datagram) => {
                    let response = SubscriberPacket::from_bytes(&datagram)?;
                    validate::check_subscriber(&response)?;
                    self.state = SessionState::Resolved;
                    return Ok(response);
                }
                None => {
                    if attempt == self.max_retries {
                        self.state = SessionState::Exhausted;
                        return Err(ProtocolError::RetriesExhausted(attempt + 1));
                    }
                    attempt += 1;
                    warn!(
                        "no response within {:?}, retrying attempt {}/{}",
                        self.timeout, attempt, self.max_retries
                    );
                }
            }
        }
    }
}
