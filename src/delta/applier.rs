//! Splice validated ranges into the original lines in one pass.

use crate::delta::lines::{Document, TrailingNewline};
use crate::delta::locator::ResolvedRange;
use crate::delta::operation::DeltaType;

/// Apply validated ranges to `lines`, returning the new line sequence.
///
/// Ranges must have passed [`crate::delta::validator::validate`]; the order
/// they are supplied in does not matter.
pub fn apply(lines: &[String], ranges: &[ResolvedRange<'_>]) -> Vec<String> {
    let original = Document::from_parts(lines.to_vec(), false);
    Splice::run(&original, ranges).lines
}

/// Apply validated ranges to a document, settling its final terminator
/// according to `policy`.
pub fn apply_document(
    document: &Document,
    ranges: &[ResolvedRange<'_>],
    policy: TrailingNewline,
) -> Document {
    let splice = Splice::run(document, ranges);
    let trailing_newline = match policy {
        TrailingNewline::Preserve if !document.is_empty() => document.trailing_newline(),
        TrailingNewline::Preserve | TrailingNewline::FollowContent => splice.last_terminated,
    };
    Document::from_parts(splice.lines, trailing_newline)
}

struct Splice {
    lines: Vec<String>,
    /// Whether the line most recently emitted carried a terminator in its
    /// source (original document or operation content).
    last_terminated: bool,
}

impl Splice {
    fn run(document: &Document, ranges: &[ResolvedRange<'_>]) -> Self {
        let mut ordered: Vec<&ResolvedRange<'_>> = ranges.iter().collect();
        ordered.sort_by_key(|range| (range.start, range.index));

        let mut splice = Splice {
            lines: Vec::with_capacity(document.line_count()),
            last_terminated: false,
        };
        let mut cursor = 0;

        for range in ordered {
            splice.copy(document, cursor, range.start);
            match range.opcode() {
                DeltaType::Insert | DeltaType::Replace => {
                    let content = range.operation.content.as_deref().unwrap_or_default();
                    splice.insert(Document::parse(content));
                }
                DeltaType::Delete => {}
            }
            cursor = cursor.max(range.end);
        }
        splice.copy(document, cursor, document.line_count());

        splice
    }

    fn copy(&mut self, document: &Document, from: usize, to: usize) {
        if from >= to {
            return;
        }
        self.lines.extend_from_slice(&document.lines()[from..to]);
        self.last_terminated = document.is_terminated(to - 1);
    }

    fn insert(&mut self, content: Document) {
        if content.is_empty() {
            return;
        }
        self.last_terminated = content.trailing_newline();
        self.lines.extend(content.into_lines());
    }
}
