pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{apply_deltas, ApplicationError, ApplyMode, DeltaResult};
pub use loader::{load_from_path, load_from_str, ConfigError, Origin};
pub use schema::{DeltaConfig, DeltaDefinition, Metadata, ValidationError, ValidationIssue};
