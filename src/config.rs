//! Line-oriented input files driving a test run.
//!
//! Both files start with a count line followed by one value per line:
//!
//! Request script (client): per request, four lines (client id, segment
//! number, technology, subscriber number). Input segment numbers are reduced
//! modulo [`GROUP_SIZE`] into the cyclic segment space.
//!
//! Verification database (server): per record, three lines (subscriber
//! number, technology 2-5, paid flag 0/1). Capped at
//! [`MAX_DATABASE_SIZE`] records.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::directory::VerificationRecord;
use crate::error::ProtocolError;
use crate::packet::{Technology, GROUP_SIZE};
use crate::session::RequestParams;

/// Upper bound on verification database entries.
pub const MAX_DATABASE_SIZE: usize = 100;

pub fn load_request_script(path: &Path) -> Result<Vec<RequestParams>, ProtocolError> {
    let file = File::open(path)?;
    parse_request_script(BufReader::new(file))
}

pub fn load_verification_database(path: &Path) -> Result<Vec<VerificationRecord>, ProtocolError> {
    let file = File::open(path)?;
    parse_verification_database(BufReader::new(file))
}

pub fn parse_request_script<R: BufRead>(reader: R) -> Result<Vec<RequestParams>, ProtocolError> {
    let mut lines = Lines::new(reader);
    let count: usize = lines.next_value("request count")?;

    let mut requests = Vec::with_capacity(count);
    for i in 0..count {
        let client_id: u8 = lines.next_value(&format!("request {i}: client id"))?;
        let segment_no: u8 = lines.next_value(&format!("request {i}: segment number"))?;
        let technology_raw: u8 = lines.next_value(&format!("request {i}: technology"))?;
        let subscriber_number: u32 =
            lines.next_value(&format!("request {i}: subscriber number"))?;

        let technology = Technology::try_from(technology_raw).map_err(|_| {
            ProtocolError::Config(format!("request {i}: technology {technology_raw} not in 2..=5"))
        })?;

        requests.push(RequestParams {
            client_id,
            segment_no: segment_no % GROUP_SIZE,
            technology,
            subscriber_number,
        });
    }
    Ok(requests)
}

pub fn parse_verification_database<R: BufRead>(
    reader: R,
) -> Result<Vec<VerificationRecord>, ProtocolError> {
    let mut lines = Lines::new(reader);
    let count: usize = lines.next_value("record count")?;
    if count > MAX_DATABASE_SIZE {
        return Err(ProtocolError::Config(format!(
            "database size {count} exceeds maximum {MAX_DATABASE_SIZE}"
        )));
    }

    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        let subscriber_number: u32 =
            lines.next_value(&format!("record {i}: subscriber number"))?;
        let technology_raw: u8 = lines.next_value(&format!("record {i}: technology"))?;
        let paid_raw: u8 = lines.next_value(&format!("record {i}: paid flag"))?;

        let technology = Technology::try_from(technology_raw).map_err(|_| {
            ProtocolError::Config(format!("record {i}: technology {technology_raw} not in 2..=5"))
        })?;

        records.push(VerificationRecord {
            subscriber_number,
            technology,
            paid: paid_raw != 0,
        });
    }
    Ok(records)
}

/// Cursor over non-empty trimmed lines with parse-error context.
struct Lines<R> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Lines { reader, line_no: 0 }
    }

    fn next_value<T: FromStr>(&mut self, what: &str) -> Result<T, ProtocolError> {
        loop {
            let mut line = String::new();
            let n = self.reader.read_line(&mut line)?;
            if n == 0 {
                return Err(ProtocolError::Config(format!(
                    "unexpected end of file while reading {what}"
                )));
            }
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return trimmed.parse().map_err(|_| {
                ProtocolError::Config(format!(
                    "line {}: cannot parse {what} from {trimmed:?}",
                    self.line_no
                ))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_parse_request_script() {
        let input = "2\n1\n0\n4\n4085546805\n2\n7\n3\n5551234\n";
        let requests = parse_request_script(Cursor::new(input)).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0],
            RequestParams {
                client_id: 1,
                segment_no: 0,
                technology: Technology::FourG,
                subscriber_number: 4085546805,
            }
        );
        // Input segment 7 folds into the cyclic space: 7 % 5 = 2.
        assert_eq!(requests[1].segment_no, 2);
        assert_eq!(requests[1].technology, Technology::ThreeG);
    }

    #[test]
    fn test_parse_request_script_skips_blank_lines() {
        let input = "1\n\n1\n0\n\n2\n42\n";
        let requests = parse_request_script(Cursor::new(input)).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].technology, Technology::TwoG);
        assert_eq!(requests[0].subscriber_number, 42);
    }

    #[test]
    fn test_parse_request_script_truncated() {
        let err = parse_request_script(Cursor::new("1\n1\n0\n")).unwrap_err();
        assert!(matches!(err, ProtocolError::Config(_)));
    }

    #[test]
    fn test_parse_request_script_bad_technology() {
        let err = parse_request_script(Cursor::new("1\n1\n0\n9\n42\n")).unwrap_err();
        assert!(matches!(err, ProtocolError::Config(_)));
    }

    #[test]
    fn test_parse_request_script_non_numeric() {
        let err = parse_request_script(Cursor::new("1\nabc\n0\n4\n42\n")).unwrap_err();
        match err {
            ProtocolError::Config(msg) => assert!(msg.contains("client id"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_verification_database() {
        let input = "2\n4085546805\n4\n1\n5551234\n3\n0\n";
        let records = parse_verification_database(Cursor::new(input)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            VerificationRecord {
                subscriber_number: 4085546805,
                technology: Technology::FourG,
                paid: true,
            }
        );
        assert!(!records[1].paid);
    }

    #[test]
    fn test_parse_verification_database_too_large() {
        let err = parse_verification_database(Cursor::new("101\n")).unwrap_err();
        match err {
            ProtocolError::Config(msg) => assert!(msg.contains("exceeds maximum"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_verification_database_empty() {
        let records = parse_verification_database(Cursor::new("0\n")).unwrap();
        assert!(records.is_empty());
    }
}
