pub mod subscriber;
pub mod transfer;
pub mod validate;

pub use subscriber::{SubscriberKind, SubscriberPacket};
pub use transfer::{AckPacket, DataPacket, RejectPacket, RejectReason};

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

/// Sentinel framing both ends of every packet.
pub const START_MARKER: u16 = 0xFFFF;
pub const END_MARKER: u16 = 0xFFFF;

/// Size of the cyclic segment-number space. Segment numbers are always in
/// `0..GROUP_SIZE`; only one segment is outstanding at a time (stop-and-wait,
/// not a sliding window).
pub const GROUP_SIZE: u8 = 5;

/// Capacity of the fixed data payload field on the wire.
pub const MAX_PAYLOAD: usize = 255;

// Kind tags. Data/Ack/Reject and the reject reasons share one contiguous
// block; the subscriber request/response variants occupy their own.
pub const KIND_DATA: u16 = 0xFFF1;
pub const KIND_ACK: u16 = 0xFFF2;
pub const KIND_REJECT: u16 = 0xFFF3;

pub const REASON_OUT_OF_SEQUENCE: u16 = 0xFFF4;
pub const REASON_LENGTH_MISMATCH: u16 = 0xFFF5;
pub const REASON_MISSING_END_MARKER: u16 = 0xFFF6;
pub const REASON_DUPLICATE_PACKET: u16 = 0xFFF7;

pub const KIND_ACCESS_REQUEST: u16 = 0xFFF8;
pub const KIND_NOT_PAID: u16 = 0xFFF9;
pub const KIND_NOT_EXIST: u16 = 0xFFFA;
pub const KIND_ACCESS_OK: u16 = 0xFFFB;

/// Byte offset of the kind tag, common to all packet layouts:
/// start marker (2) + client id (1).
pub const KIND_OFFSET: usize = 3;

pub const PHONE_NUMBER_DIGITS: usize = 10;

/// Errors from turning raw datagram bytes into a packet value.
///
/// Decoding only enforces the size and byte layout of each kind; sentinel and
/// field-range checks live in [`validate`] so they can be applied to any
/// in-memory packet, decoded or locally built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{kind} packet must be {expected} bytes, got {actual}")]
    WrongSize {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unknown packet kind tag 0x{0:04X}")]
    UnknownKind(u16),

    #[error("datagram too short to carry a kind tag ({0} bytes)")]
    Truncated(usize),
}

/// Read the kind tag of a raw datagram without decoding the rest.
///
/// Used by the responder to dispatch between the subscriber handshake and the
/// segmented-transfer sub-protocol.
pub fn peek_kind(bytes: &[u8]) -> Result<u16, DecodeError> {
    if bytes.len() < KIND_OFFSET + 2 {
        return Err(DecodeError::Truncated(bytes.len()));
    }
    Ok(BigEndian::read_u16(&bytes[KIND_OFFSET..KIND_OFFSET + 2]))
}

/// Subscriber technology generation (2G through 5G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technology {
    TwoG = 2,
    ThreeG = 3,
    FourG = 4,
    FiveG = 5,
}

impl TryFrom<u8> for Technology {
    type Error = validate::ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Technology::TwoG),
            3 => Ok(Technology::ThreeG),
            4 => Ok(Technology::FourG),
            5 => Ok(Technology::FiveG),
            other => Err(validate::ValidationError::Technology(other)),
        }
    }
}

impl std::fmt::Display for Technology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}G", *self as u8)
    }
}

/// Format a subscriber number the way operators read it: `(408) 554-6805`.
pub fn format_phone(subscriber_number: u32) -> String {
    let digits = format!("{subscriber_number:0>width$}", width = PHONE_NUMBER_DIGITS);
    format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
}
