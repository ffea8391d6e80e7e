//! Delta applicator: runs every delta definition of a config against a
//! workspace.
//!
//! - Each delta is one all-or-nothing operation batch against one file.
//! - Deltas run in config order; several deltas may target the same file,
//!   and each sees the text left by the ones before it.
//! - A failing delta is reported and does not stop the others.
//! - In [`ApplyMode::Check`] nothing is written; files are patched in memory.

use crate::accessor::{
    write_pieces, AccessError, ContentAccessor, FileAccessor, MemoryAccessor, WriteError,
    WriteOptions, WriteReport,
};
use crate::config::schema::{DeltaConfig, DeltaDefinition};
use crate::delta::{DeltaError, DeltaOptions};
use crate::safety::{SafetyError, WorkspaceGuard};
use std::collections::hash_map::{Entry, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Write patched files.
    Apply,
    /// Report what would happen without touching any file.
    Check,
}

/// Result of applying a single delta
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "DeltaResult should be checked for success/failure"]
pub enum DeltaResult {
    /// The batch changed the file (or would have, in check mode)
    Applied {
        file: PathBuf,
        bytes_written: usize,
        original: String,
        patched: String,
    },
    /// The batch produced identical text
    Unchanged { file: PathBuf },
}

impl DeltaResult {
    pub fn file(&self) -> &Path {
        match self {
            DeltaResult::Applied { file, .. } | DeltaResult::Unchanged { file } => file,
        }
    }
}

impl fmt::Display for DeltaResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaResult::Applied {
                file,
                bytes_written,
                ..
            } => {
                write!(f, "Applied delta to {} ({} bytes)", file.display(), bytes_written)
            }
            DeltaResult::Unchanged { file } => {
                write!(f, "No change to {}", file.display())
            }
        }
    }
}

/// Errors during delta application
#[derive(Debug)]
pub enum ApplicationError {
    /// Workspace root could not be resolved
    Workspace { root: PathBuf, reason: String },
    /// Target escaped the workspace or hit a forbidden directory
    Safety(SafetyError),
    /// Reading or writing the target failed
    Access(AccessError),
    /// The operation batch was rejected
    Delta { file: PathBuf, source: DeltaError },
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Workspace { root, reason } => {
                write!(f, "invalid workspace {}: {}", root.display(), reason)
            }
            ApplicationError::Safety(e) => write!(f, "unsafe target: {}", e),
            ApplicationError::Access(e) => write!(f, "{}", e),
            ApplicationError::Delta { file, source } => {
                write!(f, "{}: {}", file.display(), source)
            }
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Safety(e) => Some(e),
            ApplicationError::Access(e) => Some(e),
            ApplicationError::Delta { source, .. } => Some(source),
            ApplicationError::Workspace { .. } => None,
        }
    }
}

impl From<SafetyError> for ApplicationError {
    fn from(e: SafetyError) -> Self {
        ApplicationError::Safety(e)
    }
}

impl From<AccessError> for ApplicationError {
    fn from(e: AccessError) -> Self {
        ApplicationError::Access(e)
    }
}

/// Apply every delta in `config` to the workspace.
///
/// Returns one result per delta, in config order.
pub fn apply_deltas(
    config: &DeltaConfig,
    workspace_root: &Path,
    mode: ApplyMode,
) -> Vec<(String, Result<DeltaResult, ApplicationError>)> {
    let guard = match WorkspaceGuard::new(workspace_root) {
        Ok(guard) => guard,
        Err(err) => {
            let reason = err.to_string();
            return config
                .deltas
                .iter()
                .map(|delta| {
                    (
                        delta.id.clone(),
                        Err(ApplicationError::Workspace {
                            root: workspace_root.to_path_buf(),
                            reason: reason.clone(),
                        }),
                    )
                })
                .collect();
        }
    };

    let options = WriteOptions {
        delta: DeltaOptions {
            trailing_newline: config.meta.trailing_newline,
        },
        dry_run: false,
        return_content: false,
    };

    // Check mode patches an in-memory copy of each file so later deltas on
    // the same file see earlier results.
    let mut staged: HashMap<PathBuf, MemoryAccessor> = HashMap::new();

    config
        .deltas
        .iter()
        .map(|delta| {
            let result = match mode {
                ApplyMode::Apply => apply_delta(config, &guard, delta, &options),
                ApplyMode::Check => check_delta(config, &guard, delta, &options, &mut staged),
            };
            match &result {
                Ok(outcome) => tracing::debug!(delta = %delta.id, "{outcome}"),
                Err(err) => tracing::warn!(delta = %delta.id, error = %err, "delta rejected"),
            }
            (delta.id.clone(), result)
        })
        .collect()
}

fn resolve_target(
    config: &DeltaConfig,
    guard: &WorkspaceGuard,
    delta: &DeltaDefinition,
) -> Result<PathBuf, ApplicationError> {
    let file = if config.meta.workspace_relative {
        guard.workspace_root().join(&delta.file)
    } else {
        // Relative to the invoking directory; the guard still confines it.
        let file = PathBuf::from(&delta.file);
        match std::env::current_dir() {
            Ok(cwd) if file.is_relative() => cwd.join(file),
            _ => file,
        }
    };
    Ok(guard.validate_path(file)?)
}

fn apply_delta(
    config: &DeltaConfig,
    guard: &WorkspaceGuard,
    delta: &DeltaDefinition,
    options: &WriteOptions,
) -> Result<DeltaResult, ApplicationError> {
    let file = resolve_target(config, guard, delta)?;
    let accessor = FileAccessor::new(&file);
    let report = write_pieces(&accessor, &delta.operations, options)
        .map_err(|err| remap_write_error(err, &file))?;
    Ok(into_result(file, report))
}

fn check_delta(
    config: &DeltaConfig,
    guard: &WorkspaceGuard,
    delta: &DeltaDefinition,
    options: &WriteOptions,
    staged: &mut HashMap<PathBuf, MemoryAccessor>,
) -> Result<DeltaResult, ApplicationError> {
    let file = resolve_target(config, guard, delta)?;
    let accessor = match staged.entry(file.clone()) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => {
            let current = FileAccessor::new(&file).acquire()?;
            entry.insert(MemoryAccessor::new(file.display().to_string(), current))
        }
    };

    let report = write_pieces(&*accessor, &delta.operations, options)
        .map_err(|err| remap_write_error(err, &file))?;
    Ok(into_result(file, report))
}

fn into_result(file: PathBuf, report: WriteReport) -> DeltaResult {
    if report.changed {
        DeltaResult::Applied {
            file,
            bytes_written: report.bytes_written,
            original: report.original,
            patched: report.patched,
        }
    } else {
        DeltaResult::Unchanged { file }
    }
}

fn remap_write_error(err: WriteError, file: &Path) -> ApplicationError {
    match err {
        WriteError::Access(e) => ApplicationError::Access(e),
        WriteError::Delta(source) => ApplicationError::Delta {
            file: file.to_path_buf(),
            source,
        },
    }
}
