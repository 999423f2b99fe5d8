//! In-memory subscriber verification directory.

use tracing::debug;

use crate::packet::{format_phone, SubscriberKind, Technology};

/// One verification entry: a subscriber on one technology, paid or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationRecord {
    pub subscriber_number: u32,
    pub technology: Technology,
    pub paid: bool,
}

/// Outcome of a verification lookup. These are ordinary results, never
/// errors; only protocol faults are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    AccessOk,
    NotPaid,
    NotExist,
}

impl From<VerificationStatus> for SubscriberKind {
    fn from(status: VerificationStatus) -> Self {
        match status {
            VerificationStatus::AccessOk => SubscriberKind::AccessOk,
            VerificationStatus::NotPaid => SubscriberKind::NotPaid,
            VerificationStatus::NotExist => SubscriberKind::NotExist,
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SubscriberKind::from(*self).fmt(f)
    }
}

/// Immutable, ordered record table. Loaded once at startup, read-only after.
#[derive(Debug, Clone)]
pub struct Directory {
    records: Vec<VerificationRecord>,
}

impl Directory {
    /// Store the records verbatim: no dedup, no sort. Duplicate
    /// (subscriber, technology) pairs are tolerated; the first match wins.
    pub fn load(records: Vec<VerificationRecord>) -> Self {
        debug!("loaded verification directory with {} records", records.len());
        Directory { records }
    }

    /// Look up a subscriber on a technology. Linear scan in insertion order;
    /// the first matching record decides.
    pub fn verify(&self, subscriber_number: u32, technology: Technology) -> VerificationStatus {
        for record in &self.records {
            if record.subscriber_number == subscriber_number && record.technology == technology {
                return if record.paid {
                    VerificationStatus::AccessOk
                } else {
                    VerificationStatus::NotPaid
                };
            }
        }
        VerificationStatus::NotExist
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[VerificationRecord] {
        &self.records
    }
}

impl std::fmt::Display for Directory {
    /// Table dump for the server log.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Subscriber Number\tTechnology\tPaid")?;
        for record in &self.records {
            writeln!(
                f,
                "{}\t{}\t\t{}",
                format_phone(record.subscriber_number),
                record.technology,
                record.paid as u8,
            )?;
        }
        Ok(())
    }
}
