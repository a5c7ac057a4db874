//! Chain validation: recompute every hash and check every link.
//!
//! Validation is a pure function of the ordered record sequence. A broken
//! chain is not an error; it is reported through a [`Verdict`]. Rows that
//! storage could not decode are validated too, through [`validate_stored`],
//! and fail as [`FailureReason::Malformed`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::record::{MalformedRecord, Record, StoredRecord};
use crate::types::{LinkHash, RecordHash};

/// Why a record failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The stored self hash does not match the recomputed hash.
    ContentMismatch,
    /// The link hash does not match the predecessor's self hash.
    BrokenLink,
    /// The record's position does not match its place in the sequence.
    OutOfSequence,
    /// The stored row could not be decoded into a record.
    Malformed,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::ContentMismatch => "content_mismatch",
            FailureReason::BrokenLink => "broken_link",
            FailureReason::OutOfSequence => "out_of_sequence",
            FailureReason::Malformed => "malformed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ValidationError> for FailureReason {
    fn from(err: &ValidationError) -> Self {
        match err {
            ValidationError::ContentMismatch { .. } => FailureReason::ContentMismatch,
            ValidationError::BrokenLink { .. } => FailureReason::BrokenLink,
            ValidationError::OutOfSequence { .. } => FailureReason::OutOfSequence,
            ValidationError::Malformed { .. } => FailureReason::Malformed,
        }
    }
}

/// A single failure found in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainFault {
    pub position: u64,
    pub reason: FailureReason,
}

impl From<ValidationError> for ChainFault {
    fn from(err: ValidationError) -> Self {
        Self {
            position: err.position(),
            reason: FailureReason::from(&err),
        }
    }
}

/// Result of validating an ordered sequence of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Whether every record checked out.
    pub valid: bool,

    /// Number of records in the validated sequence.
    pub length: u64,

    /// Position of the first failing record, if any.
    pub first_failure_position: Option<u64>,

    /// Reason of the first failure, if any.
    pub reason: Option<FailureReason>,
}

impl Verdict {
    /// A passing verdict over `length` records.
    pub fn valid(length: u64) -> Self {
        Self {
            valid: true,
            length,
            first_failure_position: None,
            reason: None,
        }
    }

    /// A failing verdict.
    pub fn failed(length: u64, fault: ChainFault) -> Self {
        Self {
            valid: false,
            length,
            first_failure_position: Some(fault.position),
            reason: Some(fault.reason),
        }
    }

    /// The first failure, if any.
    pub fn failure(&self) -> Option<ChainFault> {
        match (self.first_failure_position, self.reason) {
            (Some(position), Some(reason)) => Some(ChainFault { position, reason }),
            _ => None,
        }
    }
}

/// Check that a record's stored self hash matches its fields.
pub fn check_record(record: &Record) -> Result<(), ValidationError> {
    if record.is_intact() {
        Ok(())
    } else {
        Err(ValidationError::ContentMismatch {
            position: record.position,
        })
    }
}

/// Check that `record` is a valid successor of `tail` (genesis if `None`).
///
/// Checks, in order: sequence, content, link.
pub fn check_extends(tail: Option<&Record>, record: &Record) -> Result<(), ValidationError> {
    let expected = tail.map_or(0, |t| t.position + 1);
    check_sequence(expected, record)?;
    check_record(record)?;
    check_link(tail.map(|t| &t.self_hash), record)
}

fn check_sequence(expected: u64, record: &Record) -> Result<(), ValidationError> {
    if record.position == expected {
        Ok(())
    } else {
        Err(ValidationError::OutOfSequence {
            expected,
            got: record.position,
        })
    }
}

/// `previous` is the predecessor's self hash, or `None` at genesis.
fn check_link(previous: Option<&RecordHash>, record: &Record) -> Result<(), ValidationError> {
    let linked = match previous {
        None => record.link_hash.is_genesis(),
        Some(hash) => record.link_hash == LinkHash::Record(*hash),
    };
    if linked {
        Ok(())
    } else {
        Err(ValidationError::BrokenLink {
            position: record.position,
        })
    }
}

#[derive(Clone, Copy)]
enum Row<'a> {
    Decoded(&'a Record),
    Malformed(&'a MalformedRecord),
}

impl<'a> From<&'a StoredRecord> for Row<'a> {
    fn from(stored: &'a StoredRecord) -> Self {
        match stored {
            StoredRecord::Decoded(record) => Row::Decoded(record),
            StoredRecord::Malformed(row) => Row::Malformed(row),
        }
    }
}

impl<'a> Row<'a> {
    fn position(self) -> u64 {
        match self {
            Row::Decoded(record) => record.position,
            Row::Malformed(row) => row.position,
        }
    }

    fn self_hash(self) -> Option<&'a RecordHash> {
        match self {
            Row::Decoded(record) => Some(&record.self_hash),
            Row::Malformed(row) => row.self_hash.as_ref(),
        }
    }

    /// Sequence, content and link checks for the row at `index`.
    ///
    /// A malformed row fails its content check and has no link to check. A
    /// record after a malformed row is only link-checked if that row's self
    /// hash survived.
    fn checks(self, index: u64, previous: Option<Row<'_>>) -> [Result<(), ValidationError>; 3] {
        let position = self.position();
        let sequence = if position == index {
            Ok(())
        } else {
            Err(ValidationError::OutOfSequence {
                expected: index,
                got: position,
            })
        };

        match self {
            Row::Decoded(record) => {
                let link = match previous {
                    None => check_link(None, record),
                    Some(prev) => prev
                        .self_hash()
                        .map_or(Ok(()), |hash| check_link(Some(hash), record)),
                };
                [sequence, check_record(record), link]
            }
            Row::Malformed(_) => [sequence, Err(ValidationError::Malformed { position }), Ok(())],
        }
    }
}

fn first_fault<'a>(rows: impl Iterator<Item = Row<'a>>) -> Option<ChainFault> {
    let mut previous = None;
    for (index, row) in rows.enumerate() {
        let index = index as u64;
        if let Some(err) = row.checks(index, previous).into_iter().find_map(Result::err) {
            return Some(ChainFault {
                position: index,
                reason: FailureReason::from(&err),
            });
        }
        previous = Some(row);
    }
    None
}

fn all_faults<'a>(rows: impl Iterator<Item = Row<'a>>) -> Vec<ChainFault> {
    let mut faults = Vec::new();
    let mut previous = None;
    for (index, row) in rows.enumerate() {
        let index = index as u64;
        for err in row.checks(index, previous).into_iter().filter_map(Result::err) {
            faults.push(ChainFault {
                position: index,
                reason: FailureReason::from(&err),
            });
        }
        previous = Some(row);
    }
    faults
}

/// Validate an ordered sequence, stopping at the first failure.
///
/// The sequence must be ordered by position, starting at 0. A record whose
/// position differs from its index fails as out of sequence at that index.
/// The empty sequence is valid.
pub fn validate_chain(records: &[Record]) -> Verdict {
    let length = records.len() as u64;
    match first_fault(records.iter().map(Row::Decoded)) {
        Some(fault) => Verdict::failed(length, fault),
        None => Verdict::valid(length),
    }
}

/// Validate rows as read from storage, stopping at the first failure.
///
/// Same rules as [`validate_chain`]. A row that did not decode fails as
/// [`FailureReason::Malformed`] at its index.
pub fn validate_stored(rows: &[StoredRecord]) -> Verdict {
    let length = rows.len() as u64;
    match first_fault(rows.iter().map(Row::from)) {
        Some(fault) => Verdict::failed(length, fault),
        None => Verdict::valid(length),
    }
}

/// Validate an ordered sequence, reporting every failure.
///
/// Each record is checked for sequence, content and link independently, so
/// one record may contribute more than one fault.
pub fn audit_chain(records: &[Record]) -> Vec<ChainFault> {
    all_faults(records.iter().map(Row::Decoded))
}

/// [`audit_chain`] over rows as read from storage.
pub fn audit_stored(rows: &[StoredRecord]) -> Vec<ChainFault> {
    all_faults(rows.iter().map(Row::from))
}
