//! Structural checks on operations and their resolved ranges.
//!
//! # Rules
//!
//! 1. **Shape**: INSERT and REPLACE carry content, DELETE does not; INSERT
//!    never names an end line or a length.
//! 2. **Bounds**: every range lies inside the original document.
//! 3. **No overlap**: no two operations touch the same line position or
//!    insertion point, and none rewrites the before anchor of a
//!    context-addressed DELETE/REPLACE. Checked in the original numbering,
//!    never against partially patched text.

use crate::delta::errors::{BoundsViolation, DeltaError, ShapeViolation};
use crate::delta::locator::ResolvedRange;
use crate::delta::operation::{DeltaType, Location, Operation};

/// Check the opcode/field combination of one operation.
pub fn check_shape(index: usize, operation: &Operation) -> Result<(), DeltaError> {
    let fail = |reason| Err(DeltaError::InvalidOperationShape { index, reason });

    match operation.opcode {
        DeltaType::Insert | DeltaType::Replace if operation.content.is_none() => {
            return fail(ShapeViolation::MissingContent(operation.opcode));
        }
        DeltaType::Delete if operation.content.is_some() => {
            return fail(ShapeViolation::UnexpectedContent);
        }
        _ => {}
    }

    if operation.location.nth_match() == Some(0) {
        return fail(ShapeViolation::ZeroOccurrence);
    }

    match &operation.location {
        Location::Lines { end, .. } => match (operation.opcode, end) {
            (DeltaType::Insert, Some(_)) => fail(ShapeViolation::UnexpectedEnd),
            (DeltaType::Delete | DeltaType::Replace, None) => {
                fail(ShapeViolation::MissingEnd(operation.opcode))
            }
            _ => Ok(()),
        },
        Location::Target(target) if target.lines.is_empty() => fail(ShapeViolation::EmptyTarget),
        Location::Target(target) => match (operation.opcode, target.length) {
            (DeltaType::Insert, Some(_)) => fail(ShapeViolation::UnexpectedLength),
            (_, Some(0)) => fail(ShapeViolation::ZeroLength),
            _ => Ok(()),
        },
        Location::Context(_) => Ok(()),
    }
}

/// Check 1-based line numbers against the document and convert them to a
/// 0-based half-open region.
pub fn check_line_bounds(
    index: usize,
    opcode: DeltaType,
    start: i64,
    end: Option<i64>,
    line_count: usize,
) -> Result<(usize, usize), DeltaError> {
    let fail = |reason| Err(DeltaError::OutOfBoundsRange { index, reason });

    if start < 0 {
        return fail(BoundsViolation::NegativeStart { start });
    }
    let first = match usize::try_from(start) {
        Ok(first) if first <= line_count => first,
        _ => return fail(BoundsViolation::StartExceedsLength { start, line_count }),
    };

    match opcode {
        DeltaType::Insert => Ok((first, first)),
        DeltaType::Delete | DeltaType::Replace => {
            let Some(end) = end else {
                return Err(DeltaError::InvalidOperationShape {
                    index,
                    reason: ShapeViolation::MissingEnd(opcode),
                });
            };
            if first == 0 {
                return fail(BoundsViolation::StartBeforeFirstLine { opcode });
            }
            if end < start {
                return fail(BoundsViolation::EndBeforeStart { start, end });
            }
            match usize::try_from(end) {
                Ok(last) if last <= line_count => Ok((first - 1, last)),
                _ => fail(BoundsViolation::EndExceedsLength { end, line_count }),
            }
        }
    }
}

/// Validate a batch of resolved ranges: bounds, then pairwise overlap.
pub fn validate(ranges: &[ResolvedRange<'_>], line_count: usize) -> Result<(), DeltaError> {
    for range in ranges {
        if range.start > range.end || range.end > line_count {
            return Err(DeltaError::OutOfBoundsRange {
                index: range.index,
                reason: BoundsViolation::PastEndOfFile {
                    start: range.start,
                    end: range.end,
                    line_count,
                },
            });
        }
    }
    check_overlaps(ranges)
}

/// Reject any two ranges whose footprints intersect.
///
/// Ranges are ordered by footprint start; once sorted, an overlap anywhere
/// implies an overlap between some adjacent pair, so adjacent checks suffice.
pub fn check_overlaps(ranges: &[ResolvedRange<'_>]) -> Result<(), DeltaError> {
    let mut ordered: Vec<&ResolvedRange<'_>> = ranges.iter().collect();
    ordered.sort_by_key(|range| (range.footprint().0, range.index));

    for pair in ordered.windows(2) {
        let (earlier, later) = (pair[0], pair[1]);
        if earlier.footprint().1 >= later.footprint().0 {
            return Err(DeltaError::OverlapConflict {
                first: earlier.index,
                first_line: earlier.first_line(),
                second: later.index,
                second_line: later.first_line(),
            });
        }
    }
    Ok(())
}
