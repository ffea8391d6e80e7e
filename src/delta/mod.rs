//! Line-context delta engine.
//!
//! Operations are resolved against the original text, validated as a batch,
//! and applied in a single left-to-right pass:
//!
//! 1. [`lines`] tokenizes text into a [`Document`].
//! 2. [`locator`] turns each [`Operation`] into a [`ResolvedRange`].
//! 3. [`validator`] checks shapes, bounds and overlaps.
//! 4. [`applier`] splices content into a new document.

pub mod applier;
pub mod engine;
pub mod errors;
pub mod lines;
pub mod locator;
pub mod operation;
pub mod validator;

pub use engine::{apply_operations, apply_operations_with, patch_document, plan, DeltaOptions};
pub use errors::{BoundsViolation, DeltaError, NearMiss, ShapeViolation};
pub use lines::{Document, TrailingNewline};
pub use locator::ResolvedRange;
pub use operation::{Context, DeltaType, Location, Operation, Target, WireError};
