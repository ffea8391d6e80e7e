use crate::delta::operation::DeltaType;
use thiserror::Error;

/// Why an operation batch was rejected.
///
/// Every variant names the offending operation by its position in the
/// caller's batch (0-based). Line numbers in messages are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    #[error("operations[{index}]: could not find context {block:?}{}", describe_near_miss(.closest))]
    ContextNotFound {
        index: usize,
        block: Vec<String>,
        closest: Option<NearMiss>,
    },

    #[error("operations[{index}]: requested match {requested} but only found {found}")]
    OccurrenceOutOfRange {
        index: usize,
        requested: usize,
        found: usize,
    },

    #[error(
        "operations[{index}]: gap between before and after contexts \
         (after context expected at line {expected_line}, found at line {found_line})"
    )]
    AmbiguousInsertGap {
        index: usize,
        expected_line: usize,
        found_line: usize,
    },

    #[error("operations[{index}]: {reason}")]
    InvalidOperationShape { index: usize, reason: ShapeViolation },

    #[error("operations[{index}]: {reason}")]
    OutOfBoundsRange { index: usize, reason: BoundsViolation },

    #[error(
        "operations[{first}] at line {first_line} overlaps with \
         operations[{second}] at line {second_line}"
    )]
    OverlapConflict {
        first: usize,
        first_line: usize,
        second: usize,
        second_line: usize,
    },
}

impl DeltaError {
    /// Position of the offending operation in the batch.
    ///
    /// For overlaps this is the later of the two colliding operations.
    pub fn index(&self) -> usize {
        match self {
            DeltaError::ContextNotFound { index, .. }
            | DeltaError::OccurrenceOutOfRange { index, .. }
            | DeltaError::AmbiguousInsertGap { index, .. }
            | DeltaError::InvalidOperationShape { index, .. }
            | DeltaError::OutOfBoundsRange { index, .. } => *index,
            DeltaError::OverlapConflict { second, .. } => *second,
        }
    }
}

/// The closest existing line to the first line of a context block that
/// failed to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearMiss {
    /// 1-based line number
    pub line: usize,
    pub text: String,
}

fn describe_near_miss(closest: &Option<NearMiss>) -> String {
    match closest {
        Some(miss) => format!(" (closest line {}: {:?})", miss.line, miss.text),
        None => String::new(),
    }
}

/// Wrong combination of fields for an opcode.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeViolation {
    #[error("{0} operation requires content")]
    MissingContent(DeltaType),

    #[error("DELETE operation cannot have content")]
    UnexpectedContent,

    #[error("{0} operation requires end line")]
    MissingEnd(DeltaType),

    #[error("INSERT operation cannot specify end line")]
    UnexpectedEnd,

    #[error("INSERT operation cannot specify a length")]
    UnexpectedLength,

    #[error("length must be at least 1")]
    ZeroLength,

    #[error("target lines must not be empty")]
    EmptyTarget,

    #[error("nth_match is 1-based and must be at least 1")]
    ZeroOccurrence,
}

/// Line numbers or spans outside the document.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsViolation {
    #[error("Start line {start} is negative")]
    NegativeStart { start: i64 },

    #[error("Start line {start} exceeds file length {line_count}")]
    StartExceedsLength { start: i64, line_count: usize },

    #[error("Start line 0 is before the first line; {opcode} ranges are 1-based")]
    StartBeforeFirstLine { opcode: DeltaType },

    #[error("End line {end} is less than start line {start}")]
    EndBeforeStart { start: i64, end: i64 },

    #[error("End line {end} exceeds file length {line_count}")]
    EndExceedsLength { end: i64, line_count: usize },

    #[error("range [{start}, {end}) extends past end of file ({line_count} lines)")]
    PastEndOfFile {
        start: usize,
        end: usize,
        line_count: usize,
    },
}
