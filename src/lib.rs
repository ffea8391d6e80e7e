//! Delta Patcher: line-context patching for plain text
//!
//! Applies batches of INSERT / DELETE / REPLACE operations to text. Each
//! operation is anchored by surrounding lines of context, by the lines it
//! touches, or by explicit line numbers, so edits survive unrelated changes
//! elsewhere in the file.
//!
//! # Architecture
//!
//! Every operation in a batch is resolved against the *original* text to a
//! half-open line range. The batch is then validated as a whole (shape,
//! bounds, no overlaps) and applied in a single pass. Nothing is produced
//! unless every operation succeeds.
//!
//! Around the engine:
//!
//! - [`accessor`] reads and writes target content ([`FileAccessor`] writes
//!   atomically and refuses to clobber concurrent changes).
//! - [`config`] loads TOML delta files and applies them to a workspace.
//! - [`safety`] keeps targets inside the workspace.
//!
//! # Example
//!
//! ```
//! use delta_patcher::{apply_operations, Location, Operation, Target};
//!
//! let text = "a\nb\nc\n";
//! let ops = [
//!     Operation::replace(Target::new("b"), "B\n"),
//!     Operation::insert(Location::lines(0, None), "start\n"),
//! ];
//!
//! assert_eq!(apply_operations(text, &ops).unwrap(), "start\na\nB\nc\n");
//! ```

pub mod accessor;
pub mod config;
pub mod delta;
pub mod logging;
pub mod safety;

// Re-exports
pub use accessor::{
    write_pieces, AccessError, ContentAccessor, FileAccessor, MemoryAccessor, WriteError,
    WriteOptions, WriteReport,
};
pub use config::{
    apply_deltas, load_from_path, load_from_str, ApplicationError, ApplyMode, ConfigError,
    DeltaConfig, DeltaResult,
};
pub use delta::{
    apply_operations, apply_operations_with, patch_document, Context, DeltaError, DeltaOptions,
    DeltaType, Document, Location, Operation, Target, TrailingNewline,
};
pub use safety::{SafetyError, WorkspaceGuard};
