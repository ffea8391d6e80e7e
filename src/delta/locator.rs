//! Resolve each operation to concrete line indices in the original text.

use crate::delta::errors::{BoundsViolation, DeltaError, NearMiss};
use crate::delta::lines;
use crate::delta::operation::{Context, DeltaType, Location, Operation, Target};
use crate::delta::validator;
use std::ops::Range;

/// Similarity (normalized Damerau-Levenshtein) above which an existing line
/// is reported as the probable intended context.
const NEAR_MISS_THRESHOLD: f64 = 0.75;

/// Concrete line-index boundaries for one operation.
///
/// All indices are 0-based positions in the *original* line sequence.
/// `start..end` is the region the operation consumes; for an insertion
/// point `start == end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange<'op> {
    /// Position of the operation in the caller's batch
    pub index: usize,
    pub operation: &'op Operation,
    pub start: usize,
    pub end: usize,
    /// Matched before block (context addressing) or target block
    pub before: Option<Range<usize>>,
    /// Matched after block (context addressing) or `followed_by` block
    pub after: Option<Range<usize>>,
}

impl ResolvedRange<'_> {
    pub fn opcode(&self) -> DeltaType {
        self.operation.opcode
    }

    pub fn is_point(&self) -> bool {
        self.start == self.end
    }

    /// Closed interval of line positions this range occupies.
    ///
    /// A point at `p` occupies position `p`: the insertion point belongs to
    /// the line that follows it. A context-addressed DELETE/REPLACE also
    /// claims the last line of its before block, so no other operation may
    /// rewrite the anchor it was located by.
    pub fn footprint(&self) -> (usize, usize) {
        let last = if self.is_point() {
            self.start
        } else {
            self.end - 1
        };
        (self.anchor_line().unwrap_or(self.start), last)
    }

    /// Last line of the before block for context-addressed DELETE/REPLACE.
    fn anchor_line(&self) -> Option<usize> {
        match (&self.operation.location, self.opcode()) {
            (Location::Context(_), DeltaType::Delete | DeltaType::Replace) => self
                .before
                .as_ref()
                .and_then(|before| before.end.checked_sub(1)),
            _ => None,
        }
    }

    /// 1-based line number of the first affected position.
    pub fn first_line(&self) -> usize {
        self.start + 1
    }
}

/// Why a block search failed, before it is attributed to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMiss {
    NotFound,
    TooFew { found: usize },
}

/// Find the `occurrence`-th (1-based) window at or after `start_from` where
/// `block` matches line for line. When `followed_by` is given, only windows
/// immediately followed by it count.
pub fn find_block(
    lines: &[String],
    block: &[String],
    start_from: usize,
    occurrence: usize,
    followed_by: Option<&[String]>,
) -> Result<usize, BlockMiss> {
    let tail = followed_by.map_or(0, <[String]>::len);
    let span = block.len() + tail;
    if span > lines.len() {
        return Err(BlockMiss::NotFound);
    }

    let mut found = 0;
    for idx in start_from..=(lines.len() - span) {
        if lines[idx..idx + block.len()] != *block {
            continue;
        }
        if let Some(follow) = followed_by {
            let after = idx + block.len();
            if lines[after..after + follow.len()] != *follow {
                continue;
            }
        }
        found += 1;
        tracing::trace!(line = idx + 1, found, "context block matched");
        if found == occurrence {
            return Ok(idx);
        }
    }

    if found == 0 {
        Err(BlockMiss::NotFound)
    } else {
        Err(BlockMiss::TooFew { found })
    }
}

/// Resolve one operation against `lines`.
///
/// Assumes the operation already passed [`validator::check_shape`].
pub fn locate<'op>(
    lines: &[String],
    index: usize,
    operation: &'op Operation,
) -> Result<ResolvedRange<'op>, DeltaError> {
    let range = match &operation.location {
        Location::Context(context) => locate_context(lines, index, operation, context)?,
        Location::Target(target) => locate_target(lines, index, operation, target)?,
        Location::Lines { start, end } => {
            let (start, end) =
                validator::check_line_bounds(index, operation.opcode, *start, *end, lines.len())?;
            ResolvedRange {
                index,
                operation,
                start,
                end,
                before: None,
                after: None,
            }
        }
    };

    tracing::debug!(
        index,
        opcode = %operation.opcode,
        start = range.start,
        end = range.end,
        "resolved operation"
    );
    Ok(range)
}

fn locate_context<'op>(
    lines: &[String],
    index: usize,
    operation: &'op Operation,
    context: &Context,
) -> Result<ResolvedRange<'op>, DeltaError> {
    let line_count = lines.len();
    let after_block = context.after.as_deref().map(lines::block);

    let (before, region_start, after_occurrence) = match context.before.as_deref() {
        Some(text) => {
            let block = lines::block(text);
            let start = search(lines, &block, 0, context.nth_match, None, index)?;
            let end = start + block.len();
            (Some(start..end), end, 1)
        }
        // Beginning of file: the occurrence index moves to the after block.
        None => (None, 0, context.nth_match),
    };

    let after = match &after_block {
        Some(block) => {
            let start = search(lines, block, region_start, after_occurrence, None, index)?;
            Some(start..start + block.len())
        }
        None => None,
    };
    let after_start = after.as_ref().map_or(line_count, |range| range.start);

    let end = match operation.opcode {
        DeltaType::Insert => {
            if after_start != region_start && after.is_some() {
                return Err(DeltaError::AmbiguousInsertGap {
                    index,
                    expected_line: region_start + 1,
                    found_line: after_start + 1,
                });
            }
            region_start
        }
        DeltaType::Delete | DeltaType::Replace => after_start,
    };

    Ok(ResolvedRange {
        index,
        operation,
        start: region_start,
        end,
        before,
        after,
    })
}

fn locate_target<'op>(
    lines: &[String],
    index: usize,
    operation: &'op Operation,
    target: &Target,
) -> Result<ResolvedRange<'op>, DeltaError> {
    let block = lines::block(&target.lines);
    let follow = target.followed_by.as_deref().map(lines::block);
    let found = search(
        lines,
        &block,
        0,
        target.nth_match,
        follow.as_deref(),
        index,
    )?;
    let block_end = found + block.len();
    let after = follow.as_ref().map(|f| block_end..block_end + f.len());

    let (start, end) = match operation.opcode {
        DeltaType::Insert => (block_end, block_end),
        DeltaType::Delete | DeltaType::Replace => {
            let length = target.length.unwrap_or(block.len());
            match found.checked_add(length) {
                Some(end) if end <= lines.len() => (found, end),
                end => {
                    return Err(DeltaError::OutOfBoundsRange {
                        index,
                        reason: BoundsViolation::PastEndOfFile {
                            start: found,
                            end: end.unwrap_or(usize::MAX),
                            line_count: lines.len(),
                        },
                    });
                }
            }
        }
    };

    Ok(ResolvedRange {
        index,
        operation,
        start,
        end,
        before: Some(found..block_end),
        after,
    })
}

fn search(
    lines: &[String],
    block: &[String],
    start_from: usize,
    occurrence: usize,
    followed_by: Option<&[String]>,
    index: usize,
) -> Result<usize, DeltaError> {
    find_block(lines, block, start_from, occurrence, followed_by).map_err(|miss| match miss {
        BlockMiss::NotFound => DeltaError::ContextNotFound {
            index,
            block: block.to_vec(),
            closest: near_miss(lines, block, start_from),
        },
        BlockMiss::TooFew { found } => DeltaError::OccurrenceOutOfRange {
            index,
            requested: occurrence,
            found,
        },
    })
}

fn near_miss(lines: &[String], block: &[String], start_from: usize) -> Option<NearMiss> {
    let wanted = block.first()?;
    if wanted.trim().is_empty() {
        return None;
    }

    lines
        .iter()
        .enumerate()
        .skip(start_from)
        .map(|(idx, line)| (idx, strsim::normalized_damerau_levenshtein(wanted, line)))
        .filter(|(_, score)| *score >= NEAR_MISS_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(idx, _)| NearMiss {
            line: idx + 1,
            text: lines[idx].clone(),
        })
}
