//! Entry points: tokenize, locate, validate, apply.

use crate::delta::applier;
use crate::delta::errors::DeltaError;
use crate::delta::lines::{Document, TrailingNewline};
use crate::delta::locator::{self, ResolvedRange};
use crate::delta::operation::Operation;
use crate::delta::validator;

/// Knobs for a single engine invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaOptions {
    pub trailing_newline: TrailingNewline,
}

/// Apply `operations` to `text` with default options.
///
/// All-or-nothing: if any operation fails to locate or validate, the error
/// is returned and no text is produced.
///
/// # Example
///
/// ```
/// use delta_patcher::{apply_operations, Context, Operation};
///
/// let text = "def example():\n    return True\n";
/// let ops = [Operation::insert(
///     Context::before("def example():"),
///     "    \"\"\"Example function.\"\"\"\n",
/// )];
///
/// let patched = apply_operations(text, &ops).unwrap();
/// assert_eq!(
///     patched,
///     "def example():\n    \"\"\"Example function.\"\"\"\n    return True\n"
/// );
/// ```
pub fn apply_operations(text: &str, operations: &[Operation]) -> Result<String, DeltaError> {
    apply_operations_with(text, operations, &DeltaOptions::default())
}

pub fn apply_operations_with(
    text: &str,
    operations: &[Operation],
    options: &DeltaOptions,
) -> Result<String, DeltaError> {
    let document = Document::parse(text);
    Ok(patch_document(&document, operations, options)?.render())
}

/// Apply `operations` to an already tokenized document.
pub fn patch_document(
    document: &Document,
    operations: &[Operation],
    options: &DeltaOptions,
) -> Result<Document, DeltaError> {
    if operations.is_empty() {
        return Ok(document.clone());
    }

    let ranges = plan(document.lines(), operations)?;
    Ok(applier::apply_document(
        document,
        &ranges,
        options.trailing_newline,
    ))
}

/// Check shapes, locate every operation and validate the batch without
/// applying anything.
pub fn plan<'op>(
    lines: &[String],
    operations: &'op [Operation],
) -> Result<Vec<ResolvedRange<'op>>, DeltaError> {
    for (index, operation) in operations.iter().enumerate() {
        validator::check_shape(index, operation)?;
    }

    let ranges = operations
        .iter()
        .enumerate()
        .map(|(index, operation)| locator::locate(lines, index, operation))
        .collect::<Result<Vec<_>, _>>()?;

    if let Err(err) = validator::validate(&ranges, lines.len()) {
        tracing::debug!(error = %err, "operation batch rejected");
        return Err(err);
    }

    tracing::debug!(
        operations = ranges.len(),
        line_count = lines.len(),
        "operation batch validated"
    );
    Ok(ranges)
}
