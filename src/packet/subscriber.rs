use byteorder::{BigEndian, ByteOrder};

use crate::packet::{
    format_phone, DecodeError, Technology, END_MARKER, KIND_ACCESS_OK, KIND_ACCESS_REQUEST,
    KIND_NOT_EXIST, KIND_NOT_PAID, START_MARKER,
};

/// Number of payload bytes a subscriber packet carries after the `length`
/// field (technology + subscriber number + trailing marker prefix), kept for
/// wire compatibility with earlier protocol revisions.
pub const SUBSCRIBER_PAYLOAD_LEN: u8 = 6;

/// Wire size of a subscriber packet.
pub const SUBSCRIBER_PACKET_LEN: usize = 14;

// Byte offsets within the serialised packet.
const OFF_START: usize = 0;
const OFF_CLIENT_ID: usize = 2;
const OFF_KIND: usize = 3;
const OFF_SEGMENT: usize = 5;
const OFF_LENGTH: usize = 6;
const OFF_TECHNOLOGY: usize = 7;
const OFF_SUBSCRIBER: usize = 8;
const OFF_END: usize = 12;

/// The four subscriber message kinds: the access-permission request and the
/// three possible verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberKind {
    AccessRequest = 0xFFF8,
    NotPaid = 0xFFF9,
    NotExist = 0xFFFA,
    AccessOk = 0xFFFB,
}

impl TryFrom<u16> for SubscriberKind {
    type Error = crate::packet::validate::ValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            KIND_ACCESS_REQUEST => Ok(SubscriberKind::AccessRequest),
            KIND_NOT_PAID => Ok(SubscriberKind::NotPaid),
            KIND_NOT_EXIST => Ok(SubscriberKind::NotExist),
            KIND_ACCESS_OK => Ok(SubscriberKind::AccessOk),
            other => Err(crate::packet::validate::ValidationError::KindTag(other)),
        }
    }
}

impl std::fmt::Display for SubscriberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            SubscriberKind::AccessRequest => "Subscriber Access Permission Request",
            SubscriberKind::NotPaid => "Subscriber Not Paid",
            SubscriberKind::NotExist => "Subscriber Not Exist",
            SubscriberKind::AccessOk => "Subscriber Access Granted",
        };
        f.write_str(msg)
    }
}

/// Access-permission request/response packet.
/// Format:
/// 0      2      3      5      6      7      8          12     14
/// +------+------+------+------+------+------+----------+------+
/// |start |client| kind | seg  | len  | tech | sub_no   | end  |
/// +------+------+------+------+------+------+----------+------+
///
/// Fields hold raw wire values; range rules (kind tag, segment number,
/// technology) are enforced by [`crate::packet::validate`], not by the type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberPacket {
    pub start_marker: u16,
    pub client_id: u8,
    pub packet_type: u16,
    pub segment_no: u8,
    pub length: u8,
    pub technology: u8,
    pub subscriber_number: u32,
    pub end_marker: u16,
}

impl Default for SubscriberPacket {
    /// A freshly reset packet: markers set, everything else at protocol
    /// defaults. Not yet valid: `technology` is zero until [`update`] runs.
    ///
    /// [`update`]: SubscriberPacket::update
    fn default() -> Self {
        SubscriberPacket {
            start_marker: START_MARKER,
            client_id: 0,
            packet_type: KIND_ACCESS_REQUEST,
            segment_no: 0,
            length: SUBSCRIBER_PAYLOAD_LEN,
            technology: 0,
            subscriber_number: 0,
            end_marker: END_MARKER,
        }
    }
}

impl SubscriberPacket {
    /// Build a fully populated packet in one step (reset + update).
    pub fn new(
        client_id: u8,
        kind: SubscriberKind,
        segment_no: u8,
        technology: Technology,
        subscriber_number: u32,
    ) -> Self {
        let mut packet = SubscriberPacket::default();
        packet.update(client_id, kind, segment_no, technology, subscriber_number);
        packet
    }

    /// Restore protocol defaults before reuse.
    pub fn reset(&mut self) {
        *self = SubscriberPacket::default();
    }

    /// Populate the request fields. Call [`reset`] first when reusing a
    /// packet value.
    ///
    /// [`reset`]: SubscriberPacket::reset
    pub fn update(
        &mut self,
        client_id: u8,
        kind: SubscriberKind,
        segment_no: u8,
        technology: Technology,
        subscriber_number: u32,
    ) {
        self.client_id = client_id;
        self.packet_type = kind as u16;
        self.segment_no = segment_no;
        self.technology = technology as u8;
        self.subscriber_number = subscriber_number;
    }

    /// Build the response to this request: same identity fields, verdict kind.
    ///
    /// A fresh value is constructed rather than mutating the request in place.
    pub fn response(&self, verdict: SubscriberKind) -> Self {
        let mut response = self.clone();
        response.packet_type = verdict as u16;
        response
    }

    /// The kind tag as an enum, if it is within the legal range.
    pub fn kind(&self) -> Option<SubscriberKind> {
        SubscriberKind::try_from(self.packet_type).ok()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; SUBSCRIBER_PACKET_LEN];
        BigEndian::write_u16(&mut bytes[OFF_START..OFF_START + 2], self.start_marker);
        bytes[OFF_CLIENT_ID] = self.client_id;
        BigEndian::write_u16(&mut bytes[OFF_KIND..OFF_KIND + 2], self.packet_type);
        bytes[OFF_SEGMENT] = self.segment_no;
        bytes[OFF_LENGTH] = self.length;
        bytes[OFF_TECHNOLOGY] = self.technology;
        BigEndian::write_u32(
            &mut bytes[OFF_SUBSCRIBER..OFF_SUBSCRIBER + 4],
            self.subscriber_number,
        );
        BigEndian::write_u16(&mut bytes[OFF_END..OFF_END + 2], self.end_marker);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != SUBSCRIBER_PACKET_LEN {
            return Err(DecodeError::WrongSize {
                kind: "subscriber",
                expected: SUBSCRIBER_PACKET_LEN,
                actual: bytes.len(),
            });
        }

        Ok(SubscriberPacket {
            start_marker: BigEndian::read_u16(&bytes[OFF_START..OFF_START + 2]),
            client_id: bytes[OFF_CLIENT_ID],
            packet_type: BigEndian::read_u16(&bytes[OFF_KIND..OFF_KIND + 2]),
            segment_no: bytes[OFF_SEGMENT],
            length: bytes[OFF_LENGTH],
            technology: bytes[OFF_TECHNOLOGY],
            subscriber_number: BigEndian::read_u32(&bytes[OFF_SUBSCRIBER..OFF_SUBSCRIBER + 4]),
            end_marker: BigEndian::read_u16(&bytes[OFF_END..OFF_END + 2]),
        })
    }
}

impl std::fmt::Display for SubscriberPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "client_id={} packet_type=0x{:04X} segment_no={} technology={} subscriber={}",
            self.client_id,
            self.packet_type,
            self.segment_no,
            self.technology,
            format_phone(self.subscriber_number),
        )
    }
}
