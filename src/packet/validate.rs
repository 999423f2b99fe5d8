//! Structural validation, independent of encoding.
//!
//! One check function per packet kind, applying the rules in a fixed order
//! with each rule short-circuiting the next:
//! start marker → kind tag → segment number → type-specific range → end
//! marker. The returned [`ValidationError`] names the single violated rule.
//!
//! A packet failing any rule is treated like transport-level corruption: the
//! exchange is re-run in full, never re-decoded.

use thiserror::Error;

use crate::packet::{
    AckPacket, DataPacket, RejectPacket, RejectReason, SubscriberKind, SubscriberPacket,
    Technology, END_MARKER, GROUP_SIZE, KIND_ACK, KIND_DATA, KIND_REJECT, MAX_PAYLOAD,
    START_MARKER,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid start marker 0x{0:04X}")]
    StartMarker(u16),

    #[error("invalid packet kind tag 0x{0:04X}")]
    KindTag(u16),

    #[error("invalid segment number {0}")]
    SegmentNumber(u8),

    #[error("invalid technology {0}")]
    Technology(u8),

    #[error("invalid reject reason 0x{0:04X}")]
    RejectReason(u16),

    #[error("payload of {0} bytes exceeds capacity")]
    PayloadOverflow(usize),

    #[error("invalid end marker 0x{0:04X}")]
    EndMarker(u16),
}

pub fn check_subscriber(packet: &SubscriberPacket) -> Result<(), ValidationError> {
    if packet.start_marker != START_MARKER {
        return Err(ValidationError::StartMarker(packet.start_marker));
    }
    SubscriberKind::try_from(packet.packet_type)?;
    if packet.segment_no >= GROUP_SIZE {
        return Err(ValidationError::SegmentNumber(packet.segment_no));
    }
    Technology::try_from(packet.technology)?;
    if packet.end_marker != END_MARKER {
        return Err(ValidationError::EndMarker(packet.end_marker));
    }
    Ok(())
}

pub fn check_data(packet: &DataPacket) -> Result<(), ValidationError> {
    if packet.start_marker != START_MARKER {
        return Err(ValidationError::StartMarker(packet.start_marker));
    }
    if packet.kind != KIND_DATA {
        return Err(ValidationError::KindTag(packet.kind));
    }
    if packet.segment_no >= GROUP_SIZE {
        return Err(ValidationError::SegmentNumber(packet.segment_no));
    }
    if packet.payload.len() > MAX_PAYLOAD {
        return Err(ValidationError::PayloadOverflow(packet.payload.len()));
    }
    if packet.end_marker != END_MARKER {
        return Err(ValidationError::EndMarker(packet.end_marker));
    }
    Ok(())
}

pub fn check_ack(packet: &AckPacket) -> Result<(), ValidationError> {
    if packet.start_marker != START_MARKER {
        return Err(ValidationError::StartMarker(packet.start_marker));
    }
    if packet.kind != KIND_ACK {
        return Err(ValidationError::KindTag(packet.kind));
    }
    if packet.acked_segment_no >= GROUP_SIZE {
        return Err(ValidationError::SegmentNumber(packet.acked_segment_no));
    }
    if packet.end_marker != END_MARKER {
        return Err(ValidationError::EndMarker(packet.end_marker));
    }
    Ok(())
}

pub fn check_reject(packet: &RejectPacket) -> Result<(), ValidationError> {
    if packet.start_marker != START_MARKER {
        return Err(ValidationError::StartMarker(packet.start_marker));
    }
    if packet.kind != KIND_REJECT {
        return Err(ValidationError::KindTag(packet.kind));
    }
    if packet.acked_segment_no >= GROUP_SIZE {
        return Err(ValidationError::SegmentNumber(packet.acked_segment_no));
    }
    RejectReason::try_from(packet.reason)?;
    if packet.end_marker != END_MARKER {
        return Err(ValidationError::EndMarker(packet.end_marker));
    }
    Ok(())
}

pub fn is_valid_subscriber(packet: &SubscriberPacket) -> bool {
    check_subscriber(packet).is_ok()
}

pub fn is_valid_data(packet: &DataPacket) -> bool {
    check_data(packet).is_ok()
}

pub fn is_valid_ack(packet: &AckPacket) -> bool {
    check_ack(packet).is_ok()
}

pub fn is_valid_reject(packet: &RejectPacket) -> bool {
    check_reject(packet).is_ok()
}
