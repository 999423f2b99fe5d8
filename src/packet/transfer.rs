//! Segmented-transfer packets: data segments, acknowledgments, rejects.
//!
//! These carry the general stop-and-wait transfer sub-protocol. The access
//! handshake in [`crate::packet::subscriber`] only ever exchanges subscriber
//! packets, but the responder understands all three kinds (see
//! [`crate::responder`]).

use byteorder::{BigEndian, ByteOrder};

use crate::packet::{
    DecodeError, END_MARKER, KIND_ACK, KIND_DATA, KIND_REJECT, MAX_PAYLOAD,
    REASON_DUPLICATE_PACKET, REASON_LENGTH_MISMATCH, REASON_MISSING_END_MARKER,
    REASON_OUT_OF_SEQUENCE, START_MARKER,
};

/// Wire sizes. The data payload field is always [`MAX_PAYLOAD`] bytes on the
/// wire; `length` of them are significant, the rest is zero padding.
pub const DATA_PACKET_LEN: usize = 7 + MAX_PAYLOAD + 2; // 264
pub const ACK_PACKET_LEN: usize = 8;
pub const REJECT_PACKET_LEN: usize = 10;

const OFF_START: usize = 0;
const OFF_CLIENT_ID: usize = 2;
const OFF_KIND: usize = 3;
const OFF_SEGMENT: usize = 5;
const OFF_DATA_LENGTH: usize = 6;
const OFF_DATA_PAYLOAD: usize = 7;
const OFF_REJECT_REASON: usize = 5;
const OFF_REJECT_SEGMENT: usize = 7;
const OFF_ACK_END: usize = 6;
const OFF_REJECT_END: usize = 8;

/// Why a responder refused an inbound data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    OutOfSequence = 0xFFF4,
    LengthMismatch = 0xFFF5,
    MissingEndMarker = 0xFFF6,
    DuplicatePacket = 0xFFF7,
}

impl TryFrom<u16> for RejectReason {
    type Error = crate::packet::validate::ValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            REASON_OUT_OF_SEQUENCE => Ok(RejectReason::OutOfSequence),
            REASON_LENGTH_MISMATCH => Ok(RejectReason::LengthMismatch),
            REASON_MISSING_END_MARKER => Ok(RejectReason::MissingEndMarker),
            REASON_DUPLICATE_PACKET => Ok(RejectReason::DuplicatePacket),
            other => Err(crate::packet::validate::ValidationError::RejectReason(
                other,
            )),
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            RejectReason::OutOfSequence => "out of sequence",
            RejectReason::LengthMismatch => "length mismatch",
            RejectReason::MissingEndMarker => "end of packet missing",
            RejectReason::DuplicatePacket => "duplicate packet",
        };
        f.write_str(msg)
    }
}

/// One data segment.
/// Format:
/// 0      2      3      5      6      7            262    264
/// +------+------+------+------+------+------------+------+
/// |start |client| kind | seg  | len  | payload    | end  |
/// +------+------+------+------+------+------------+------+
///
/// `length` and `payload` are stored separately so a packet whose length
/// field disagrees with its carried bytes is representable; the responder
/// rejects such packets with [`RejectReason::LengthMismatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    pub start_marker: u16,
    pub client_id: u8,
    pub kind: u16,
    pub segment_no: u8,
    pub length: u8,
    pub payload: Vec<u8>,
    pub end_marker: u16,
}

impl DataPacket {
    pub fn new(client_id: u8, segment_no: u8, payload: Vec<u8>) -> Self {
        DataPacket {
            start_marker: START_MARKER,
            client_id,
            kind: KIND_DATA,
            segment_no,
            length: payload.len().min(MAX_PAYLOAD) as u8,
            payload,
            end_marker: END_MARKER,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; DATA_PACKET_LEN];
        BigEndian::write_u16(&mut bytes[OFF_START..OFF_START + 2], self.start_marker);
        bytes[OFF_CLIENT_ID] = self.client_id;
        BigEndian::write_u16(&mut bytes[OFF_KIND..OFF_KIND + 2], self.kind);
        bytes[OFF_SEGMENT] = self.segment_no;
        bytes[OFF_DATA_LENGTH] = self.length;
        let n = self.payload.len().min(MAX_PAYLOAD);
        bytes[OFF_DATA_PAYLOAD..OFF_DATA_PAYLOAD + n].copy_from_slice(&self.payload[..n]);
        BigEndian::write_u16(
            &mut bytes[OFF_DATA_PAYLOAD + MAX_PAYLOAD..DATA_PACKET_LEN],
            self.end_marker,
        );
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != DATA_PACKET_LEN {
            return Err(DecodeError::WrongSize {
                kind: "data",
                expected: DATA_PACKET_LEN,
                actual: bytes.len(),
            });
        }

        let length = bytes[OFF_DATA_LENGTH];
        let payload = bytes[OFF_DATA_PAYLOAD..OFF_DATA_PAYLOAD + length as usize].to_vec();
        Ok(DataPacket {
            start_marker: BigEndian::read_u16(&bytes[OFF_START..OFF_START + 2]),
            client_id: bytes[OFF_CLIENT_ID],
            kind: BigEndian::read_u16(&bytes[OFF_KIND..OFF_KIND + 2]),
            segment_no: bytes[OFF_SEGMENT],
            length,
            payload,
            end_marker: BigEndian::read_u16(
                &bytes[OFF_DATA_PAYLOAD + MAX_PAYLOAD..DATA_PACKET_LEN],
            ),
        })
    }

    /// The significant payload bytes.
    pub fn data(&self) -> &[u8] {
        let n = (self.length as usize).min(self.payload.len());
        &self.payload[..n]
    }
}

/// Acknowledgment of one accepted data segment.
/// Format:
/// 0      2      3      5       6      8
/// +------+------+------+-------+------+
/// |start |client| kind | acked | end  |
/// +------+------+------+-------+------+
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPacket {
    pub start_marker: u16,
    pub client_id: u8,
    pub kind: u16,
    pub acked_segment_no: u8,
    pub end_marker: u16,
}

impl AckPacket {
    pub fn new(client_id: u8, acked_segment_no: u8) -> Self {
        AckPacket {
            start_marker: START_MARKER,
            client_id,
            kind: KIND_ACK,
            acked_segment_no,
            end_marker: END_MARKER,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; ACK_PACKET_LEN];
        BigEndian::write_u16(&mut bytes[OFF_START..OFF_START + 2], self.start_marker);
        bytes[OFF_CLIENT_ID] = self.client_id;
        BigEndian::write_u16(&mut bytes[OFF_KIND..OFF_KIND + 2], self.kind);
        bytes[OFF_SEGMENT] = self.acked_segment_no;
        BigEndian::write_u16(&mut bytes[OFF_ACK_END..OFF_ACK_END + 2], self.end_marker);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != ACK_PACKET_LEN {
            return Err(DecodeError::WrongSize {
                kind: "ack",
                expected: ACK_PACKET_LEN,
                actual: bytes.len(),
            });
        }

        Ok(AckPacket {
            start_marker: BigEndian::read_u16(&bytes[OFF_START..OFF_START + 2]),
            client_id: bytes[OFF_CLIENT_ID],
            kind: BigEndian::read_u16(&bytes[OFF_KIND..OFF_KIND + 2]),
            acked_segment_no: bytes[OFF_SEGMENT],
            end_marker: BigEndian::read_u16(&bytes[OFF_ACK_END..OFF_ACK_END + 2]),
        })
    }
}

/// Refusal of one data segment, with the reason and the segment it names.
/// Format:
/// 0      2      3      5        7       8      10
/// +------+------+------+--------+-------+------+
/// |start |client| kind | reason | acked | end  |
/// +------+------+------+--------+-------+------+
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectPacket {
    pub start_marker: u16,
    pub client_id: u8,
    pub kind: u16,
    pub reason: u16,
    pub acked_segment_no: u8,
    pub end_marker: u16,
}

impl RejectPacket {
    pub fn new(client_id: u8, reason: RejectReason, acked_segment_no: u8) -> Self {
        RejectPacket {
            start_marker: START_MARKER,
            client_id,
            kind: KIND_REJECT,
            reason: reason as u16,
            acked_segment_no,
            end_marker: END_MARKER,
        }
    }

    /// The reject reason as an enum, if it is within the taxonomy.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        RejectReason::try_from(self.reason).ok()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; REJECT_PACKET_LEN];
        BigEndian::write_u16(&mut bytes[OFF_START..OFF_START + 2], self.start_marker);
        bytes[OFF_CLIENT_ID] = self.client_id;
        BigEndian::write_u16(&mut bytes[OFF_KIND..OFF_KIND + 2], self.kind);
        BigEndian::write_u16(
            &mut bytes[OFF_REJECT_REASON..OFF_REJECT_REASON + 2],
            self.reason,
        );
        bytes[OFF_REJECT_SEGMENT] = self.acked_segment_no;
        BigEndian::write_u16(
            &mut bytes[OFF_REJECT_END..OFF_REJECT_END + 2],
            self.end_marker,
        );
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != REJECT_PACKET_LEN {
            return Err(DecodeError::WrongSize {
                kind: "reject",
                expected: REJECT_PACKET_LEN,
                actual: bytes.len(),
            });
        }

        Ok(RejectPacket {
            start_marker: BigEndian::read_u16(&bytes[OFF_START..OFF_START + 2]),
            client_id: bytes[OFF_CLIENT_ID],
            kind: BigEndian::read_u16(&bytes[OFF_KIND..OFF_KIND + 2]),
            reason: BigEndian::read_u16(&bytes[OFF_REJECT_REASON..OFF_REJECT_REASON + 2]),
            acked_segment_no: bytes[OFF_REJECT_SEGMENT],
            end_marker: BigEndian::read_u16(&bytes[OFF_REJECT_END..OFF_REJECT_END + 2]),
        })
    }
}
