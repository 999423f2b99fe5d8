//! Server-side packet handling: subscriber adjudication and the
//! segmented-transfer accept/duplicate/reject judgment.
//!
//! The responder never initiates traffic. Each inbound datagram is dispatched
//! on its kind tag; valid requests produce exactly one reply datagram,
//! malformed ones produce an error the caller logs and drops (the server
//! keeps running).

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::directory::Directory;
use crate::error::ProtocolError;
use crate::packet::validate::{self, ValidationError};
use crate::packet::{
    peek_kind, AckPacket, DataPacket, RejectPacket, RejectReason, SubscriberPacket, Technology,
    END_MARKER, GROUP_SIZE, KIND_ACCESS_OK, KIND_ACCESS_REQUEST, KIND_ACK, KIND_DATA, KIND_REJECT,
    START_MARKER,
};

/// Verdict on one inbound data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentVerdict {
    /// In order: deliver the payload and acknowledge.
    Accept,
    /// The previously accepted segment again (our ack was lost): re-ack
    /// without delivering the payload a second time.
    Duplicate,
    /// Anything else.
    Reject(RejectReason),
}

/// Per-client expected/previous segment counters over the cyclic
/// [`GROUP_SIZE`] number space.
#[derive(Debug, Default)]
pub struct SegmentTracker {
    expected: u8,
    last_accepted: Option<u8>,
}

impl SegmentTracker {
    pub fn new() -> Self {
        SegmentTracker::default()
    }

    pub fn expected(&self) -> u8 {
        self.expected
    }

    /// Judge a segment number against the expected and previously accepted
    /// counters. Advances the expected counter only on [`SegmentVerdict::Accept`].
    pub fn judge(&mut self, segment_no: u8) -> SegmentVerdict {
        if self.last_accepted == Some(segment_no) {
            return SegmentVerdict::Duplicate;
        }
        if segment_no == self.expected {
            self.last_accepted = Some(segment_no);
            self.expected = (segment_no + 1) % GROUP_SIZE;
            return SegmentVerdict::Accept;
        }
        SegmentVerdict::Reject(RejectReason::OutOfSequence)
    }
}

/// Reply to one data segment: either an ack or a reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataResponse {
    Ack(AckPacket),
    Reject(RejectPacket),
}

impl DataResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            DataResponse::Ack(packet) => packet.to_bytes(),
            DataResponse::Reject(packet) => packet.to_bytes(),
        }
    }
}

/// Handles every inbound datagram for the server: subscriber verification
/// against the [`Directory`], and per-client segment sequencing for the
/// transfer sub-protocol.
pub struct Responder {
    directory: Directory,
    trackers: HashMap<u8, SegmentTracker>,
    delivered: Vec<Vec<u8>>,
}

impl Responder {
    pub fn new(directory: Directory) -> Self {
        Responder {
            directory,
            trackers: HashMap::new(),
            delivered: Vec::new(),
        }
    }

    /// Dispatch a raw datagram on its kind tag. Returns the encoded reply to
    /// send back, or `None` when the datagram needs no answer (inbound
    /// acks/rejects). Malformed datagrams are errors; the caller decides to
    /// log and drop.
    pub fn handle_datagram(&mut self, bytes: &[u8]) -> Result<Option<Vec<u8>>, ProtocolError> {
        match peek_kind(bytes)? {
            KIND_ACCESS_REQUEST..=KIND_ACCESS_OK => {
                let request = SubscriberPacket::from_bytes(bytes)?;
                let response = self.adjudicate(&request)?;
                Ok(Some(response.to_bytes()))
            }
            KIND_DATA => {
                let segment = DataPacket::from_bytes(bytes)?;
                let response = self.on_data(&segment)?;
                Ok(Some(response.to_bytes()))
            }
            KIND_ACK => {
                let ack = AckPacket::from_bytes(bytes)?;
                validate::check_ack(&ack)?;
                debug!("ack for segment {} from client {}", ack.acked_segment_no, ack.client_id);
                Ok(None)
            }
            KIND_REJECT => {
                let reject = RejectPacket::from_bytes(bytes)?;
                validate::check_reject(&reject)?;
                warn!(
                    "reject from client {}: reason 0x{:04X}",
                    reject.client_id, reject.reason
                );
                Ok(None)
            }
            other => Err(crate::packet::DecodeError::UnknownKind(other).into()),
        }
    }

    /// Verify one access-permission request and build the response packet.
    pub fn adjudicate(
        &self,
        request: &SubscriberPacket,
    ) -> Result<SubscriberPacket, ProtocolError> {
        validate::check_subscriber(request)?;
        let technology = Technology::try_from(request.technology)?;

        let status = self.directory.verify(request.subscriber_number, technology);
        info!(
            "client {} subscriber {} on {}: {}",
            request.client_id,
            crate::packet::format_phone(request.subscriber_number),
            technology,
            status
        );

        let response = request.response(status.into());
        validate::check_subscriber(&response)?;
        Ok(response)
    }

    /// Judge one data segment, in the order: structural checks (start marker,
    /// kind, segment range; malformed if wrong) → length mismatch → missing
    /// end marker → duplicate → out-of-sequence.
    ///
    /// An out-of-range segment number is malformed, not out-of-sequence: a
    /// reject naming it would itself fail [`validate::check_reject`].
    pub fn on_data(&mut self, segment: &DataPacket) -> Result<DataResponse, ProtocolError> {
        if segment.start_marker != START_MARKER {
            return Err(ValidationError::StartMarker(segment.start_marker).into());
        }
        if segment.kind != KIND_DATA {
            return Err(ValidationError::KindTag(segment.kind).into());
        }
        if segment.segment_no >= GROUP_SIZE {
            return Err(ValidationError::SegmentNumber(segment.segment_no).into());
        }

        if segment.length as usize != segment.payload.len() {
            return Ok(self.reject(segment, RejectReason::LengthMismatch));
        }
        if segment.end_marker != END_MARKER {
            return Ok(self.reject(segment, RejectReason::MissingEndMarker));
        }

        let tracker = self.trackers.entry(segment.client_id).or_default();
        match tracker.judge(segment.segment_no) {
            SegmentVerdict::Accept => {
                self.delivered.push(segment.data().to_vec());
                debug!(
                    "accepted segment {} from client {} ({} bytes)",
                    segment.segment_no,
                    segment.client_id,
                    segment.length
                );
                Ok(DataResponse::Ack(AckPacket::new(
                    segment.client_id,
                    segment.segment_no,
                )))
            }
            SegmentVerdict::Duplicate => {
                // The peer missed our ack; repeat it, do not re-deliver.
                debug!(
                    "duplicate segment {} from client {}, re-acking",
                    segment.segment_no, segment.client_id
                );
                Ok(DataResponse::Ack(AckPacket::new(
                    segment.client_id,
                    segment.segment_no,
                )))
            }
            SegmentVerdict::Reject(reason) => Ok(self.reject(segment, reason)),
        }
    }

    fn reject(&self, segment: &DataPacket, reason: RejectReason) -> DataResponse {
        warn!(
            "rejecting segment {} from client {}: {}",
            segment.segment_no, segment.client_id, reason
        );
        DataResponse::Reject(RejectPacket::new(
            segment.client_id,
            reason,
            segment.segment_no,
        ))
    }

    /// Payloads accepted so far, in delivery order. Draining is the
    /// application's job; duplicates never appear here.
    pub fn take_delivered(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.delivered)
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::VerificationRecord;
    use crate::packet::{SubscriberKind, KIND_NOT_PAID};

    fn responder() -> Responder {
        Responder::new(Directory::load(vec![
            VerificationRecord {
                subscriber_number: 4085546805,
                technology: Technology::FourG,
                paid: true,
            },
            VerificationRecord {
                subscriber_number: 4085546805,
                technology: Technology::ThreeG,
                paid: false,
            },
        ]))
    }

    fn request(technology: Technology, subscriber_number: u32) -> SubscriberPacket {
        SubscriberPacket::new(
            1,
            SubscriberKind::AccessRequest,
            0,
            technology,
            subscriber_number,
        )
    }

    #[test]
    fn test_tracker_accepts_in_order() {
        let mut t = SegmentTracker::new();
        assert_eq!(t.judge(0), SegmentVerdict::Accept);
        assert_eq!(t.judge(1), SegmentVerdict::Accept);
        assert_eq!(t.expected(), 2);
    }

    #[test]
    fn test_tracker_duplicate_of_last_accepted() {
        let mut t = SegmentTracker::new();
        t.judge(0);
        t.judge(1);
        t.judge(2);
        assert_eq!(t.judge(2), SegmentVerdict::Duplicate);
        // Expected counter unchanged by the duplicate.
        assert_eq!(t.expected(), 3);
    }

    #[test]
    fn test_tracker_out_of_sequence() {
        let mut t = SegmentTracker::new();
        t.judge(0);
        t.judge(1);
        t.judge(2);
        assert_eq!(
            t.judge(4),
            SegmentVerdict::Reject(RejectReason::OutOfSequence)
        );
    }

    #[test]
    fn test_tracker_wraparound_after_last_slot() {
        let mut t = SegmentTracker::new();
        for seg in 0..GROUP_SIZE {
            assert_eq!(t.judge(seg), SegmentVerdict::Accept);
        }
        // After segment 4 the next expected slot is 0, not 5.
        assert_eq!(t.expected(), 0);
        assert_eq!(t.judge(0), SegmentVerdict::Accept);
    }

    #[test]
    fn test_adjudicate_access_ok() {
        let r = responder();
        let response = r.adjudicate(&request(Technology::FourG, 4085546805)).unwrap();
        assert_eq!(response.kind(), Some(SubscriberKind::AccessOk));
        assert_eq!(response.subscriber_number, 4085546805);
        assert_eq!(response.segment_no, 0);
    }

    #[test]
    fn test_adjudicate_not_paid() {
        let r = responder();
        let response = r.adjudicate(&request(Technology::ThreeG, 4085546805)).unwrap();
        assert_eq!(response.kind(), Some(SubscriberKind::NotPaid));
    }

    #[test]
    fn test_adjudicate_not_exist() {
        let r = responder();
        let response = r.adjudicate(&request(Technology::FiveG, 4085546805)).unwrap();
        assert_eq!(response.kind(), Some(SubscriberKind::NotExist));
        let response = r.adjudicate(&request(Technology::FourG, 999)).unwrap();
        assert_eq!(response.kind(), Some(SubscriberKind::NotExist));
    }

    #[test]
    fn test_adjudicate_rejects_malformed() {
        let r = responder();
        let mut bad = request(Technology::FourG, 4085546805);
        bad.end_marker = 0;
        assert!(matches!(
            r.adjudicate(&bad),
            Err(ProtocolError::Malformed(ValidationError::EndMarker(0)))
        ));
    }

    #[test]
    fn test_data_in_order_acked_and_delivered() {
        let mut r = responder();
        let reply = r.on_data(&DataPacket::new(1, 0, b"first".to_vec())).unwrap();
        assert_eq!(reply, DataResponse::Ack(AckPacket::new(1, 0)));
        assert_eq!(r.take_delivered(), vec![b"first".to_vec()]);
    }

    #[test]
    fn test_data_duplicate_reacked_without_redelivery() {
        let mut r = responder();
        let segment = DataPacket::new(1, 0, b"only once".to_vec());
        r.on_data(&segment).unwrap();

        let reply = r.on_data(&segment).unwrap();
        assert_eq!(reply, DataResponse::Ack(AckPacket::new(1, 0)));
        // Payload delivered exactly once.
        assert_eq!(r.take_delivered().len(), 1);
    }

    #[test]
    fn test_data_out_of_sequence_rejected() {
        let mut r = responder();
        r.on_data(&DataPacket::new(1, 0, b"a".to_vec())).unwrap();
        r.on_data(&DataPacket::new(1, 1, b"b".to_vec())).unwrap();
        r.on_data(&DataPacket::new(1, 2, b"c".to_vec())).unwrap();

        let reply = r.on_data(&DataPacket::new(1, 4, b"skip".to_vec())).unwrap();
        assert_eq!(
            reply,
            DataResponse::Reject(RejectPacket::new(1, RejectReason::OutOfSequence, 4))
        );
    }

    #[test]
    fn test_data_length_mismatch_rejected_before_sequencing() {
        let mut r = responder();
        let mut segment = DataPacket::new(1, 0, b"abcdef".to_vec());
        segment.length = 3;
        let reply = r.on_data(&segment).unwrap();
        assert_eq!(
            reply,
            DataResponse::Reject(RejectPacket::new(1, RejectReason::LengthMismatch, 0))
        );
        // Nothing delivered, expected counter untouched.
        assert!(r.take_delivered().is_empty());
        assert_eq!(r.trackers.entry(1).or_default().expected(), 0);
    }

    #[test]
    fn test_data_missing_end_marker_rejected() {
        let mut r = responder();
        let mut segment = DataPacket::new(1, 0, b"abc".to_vec());
        segment.end_marker = 0x1234;
        let reply = r.on_data(&segment).unwrap();
        assert_eq!(
            reply,
            DataResponse::Reject(RejectPacket::new(1, RejectReason::MissingEndMarker, 0))
        );
    }

    #[test]
    fn test_data_bad_framing_prefix_is_malformed() {
        let mut r = responder();
        let mut segment = DataPacket::new(1, 0, b"abc".to_vec());
        segment.start_marker = 0;
        assert!(matches!(
            r.on_data(&segment),
            Err(ProtocolError::Malformed(ValidationError::StartMarker(0)))
        ));
    }

    #[test]
    fn test_data_out_of_range_segment_is_malformed_not_rejected() {
        // Segment 7 is outside the cyclic space; answering it with an
        // out-of-sequence reject would emit a packet check_reject refuses.
        let mut r = responder();
        let segment = DataPacket::new(1, 7, b"oops".to_vec());
        assert!(matches!(
            r.on_data(&segment),
            Err(ProtocolError::Malformed(ValidationError::SegmentNumber(7)))
        ));
        assert!(r.take_delivered().is_empty());
    }

    #[test]
    fn test_handle_datagram_out_of_range_segment_produces_no_reply() {
        let mut r = responder();
        let bytes = DataPacket::new(1, 7, b"oops".to_vec()).to_bytes();
        assert!(matches!(
            r.handle_datagram(&bytes),
            Err(ProtocolError::Malformed(ValidationError::SegmentNumber(7)))
        ));
    }

    #[test]
    fn test_trackers_are_per_client() {
        let mut r = responder();
        r.on_data(&DataPacket::new(1, 0, b"c1".to_vec())).unwrap();
        // Client 2 starts its own sequence at 0.
        let reply = r.on_data(&DataPacket::new(2, 0, b"c2".to_vec())).unwrap();
        assert_eq!(reply, DataResponse::Ack(AckPacket::new(2, 0)));
    }

    #[test]
    fn test_handle_datagram_dispatches_subscriber() {
        let mut r = responder();
        let bytes = request(Technology::FourG, 4085546805).to_bytes();
        let reply = r.handle_datagram(&bytes).unwrap().unwrap();
        let response = SubscriberPacket::from_bytes(&reply).unwrap();
        assert_eq!(response.kind(), Some(SubscriberKind::AccessOk));
    }

    #[test]
    fn test_handle_datagram_dispatches_data() {
        let mut r = responder();
        let bytes = DataPacket::new(3, 0, b"hello".to_vec()).to_bytes();
        let reply = r.handle_datagram(&bytes).unwrap().unwrap();
        let ack = AckPacket::from_bytes(&reply).unwrap();
        assert_eq!(ack.acked_segment_no, 0);
        assert_eq!(ack.client_id, 3);
    }

    #[test]
    fn test_handle_datagram_inbound_ack_needs_no_reply() {
        let mut r = responder();
        let bytes = AckPacket::new(1, 2).to_bytes();
        assert_eq!(r.handle_datagram(&bytes).unwrap(), None);
    }

    #[test]
    fn test_handle_datagram_unknown_kind() {
        let mut r = responder();
        let mut bytes = AckPacket::new(1, 2).to_bytes();
        bytes[3] = 0x12;
        bytes[4] = 0x34;
        assert!(matches!(
            r.handle_datagram(&bytes),
            Err(ProtocolError::Decode(crate::packet::DecodeError::UnknownKind(0x1234)))
        ));
    }

    #[test]
    fn test_handle_datagram_not_paid_status_uses_kind_tag() {
        let mut r = responder();
        let bytes = request(Technology::ThreeG, 4085546805).to_bytes();
        let reply = r.handle_datagram(&bytes).unwrap().unwrap();
        assert_eq!(
            crate::packet::peek_kind(&reply).unwrap(),
            KIND_NOT_PAID
        );
    }
}
