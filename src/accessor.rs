//! Content accessors: where patched text comes from and goes to.
//!
//! The delta engine only ever sees strings. An accessor supplies the current
//! text of a target and accepts the updated text, reporting bytes written.
//! [`write_pieces`] ties the two together.

use crate::delta::{self, DeltaError, DeltaOptions, Operation};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("File I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    Utf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("{path} changed on disk since it was read")]
    ConcurrentModification { path: PathBuf },
}

/// Source and sink for the full text of one target.
pub trait ContentAccessor {
    /// Human-readable location used in reports.
    fn location(&self) -> String;

    /// Current full text. A target that does not exist yet reads as empty.
    fn acquire(&self) -> Result<String, AccessError>;

    /// Replace the full text, returning the number of bytes written.
    fn update(&self, content: &str) -> Result<usize, AccessError>;
}

/// What a file looked like when it was last read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Snapshot {
    Missing,
    Hash(u64),
}

impl Snapshot {
    fn of(content: &str) -> Self {
        Snapshot::Hash(xxh3_64(content.as_bytes()))
    }
}

/// File-backed accessor with atomic writes.
///
/// `update` refuses to write if the file no longer matches what `acquire`
/// returned.
#[derive(Debug)]
pub struct FileAccessor {
    path: PathBuf,
    snapshot: Cell<Option<Snapshot>>,
}

impl FileAccessor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: Cell::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>, AccessError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AccessError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|source| AccessError::Utf8 {
                path: self.path.clone(),
                source,
            })
    }
}

impl ContentAccessor for FileAccessor {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn acquire(&self) -> Result<String, AccessError> {
        let content = self.read()?;
        let snapshot = content.as_deref().map_or(Snapshot::Missing, Snapshot::of);
        self.snapshot.set(Some(snapshot));
        Ok(content.unwrap_or_default())
    }

    fn update(&self, content: &str) -> Result<usize, AccessError> {
        if let Some(expected) = self.snapshot.get() {
            let current = self
                .read()?
                .as_deref()
                .map_or(Snapshot::Missing, Snapshot::of);
            if current != expected {
                return Err(AccessError::ConcurrentModification {
                    path: self.path.clone(),
                });
            }
        }

        atomic_write(&self.path, content.as_bytes()).map_err(|source| AccessError::Io {
            path: self.path.clone(),
            source,
        })?;

        // Bump mtime so build tools notice the change even within one tick.
        filetime::set_file_mtime(&self.path, filetime::FileTime::now()).map_err(|source| {
            AccessError::Io {
                path: self.path.clone(),
                source,
            }
        })?;

        self.snapshot.set(Some(Snapshot::of(content)));
        tracing::info!(path = %self.path.display(), bytes = content.len(), "wrote file");
        Ok(content.len())
    }
}

/// In-memory accessor, for callers whose text does not live on disk.
#[derive(Debug, Default)]
pub struct MemoryAccessor {
    name: String,
    content: RefCell<String>,
}

impl MemoryAccessor {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: RefCell::new(content.into()),
        }
    }

    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }
}

impl ContentAccessor for MemoryAccessor {
    fn location(&self) -> String {
        self.name.clone()
    }

    fn acquire(&self) -> Result<String, AccessError> {
        Ok(self.content.borrow().clone())
    }

    fn update(&self, content: &str) -> Result<usize, AccessError> {
        *self.content.borrow_mut() = content.to_string();
        Ok(content.len())
    }
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            ))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub delta: DeltaOptions,
    /// Compute the result without calling [`ContentAccessor::update`].
    pub dry_run: bool,
    /// Include the new content, keyed by 1-based line number, in the report.
    pub return_content: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub location: String,
    /// Bytes written, or that would have been written on a dry run. Zero
    /// when the operations left the text unchanged.
    pub bytes_written: usize,
    pub changed: bool,
    pub original: String,
    pub patched: String,
    pub content: Option<BTreeMap<usize, String>>,
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Delta(#[from] DeltaError),
}

/// Acquire the target's text, apply `operations`, and write the result back.
///
/// Engine failures are reported before the accessor is asked to write, so
/// the target is never left partially patched.
pub fn write_pieces(
    accessor: &dyn ContentAccessor,
    operations: &[Operation],
    options: &WriteOptions,
) -> Result<WriteReport, WriteError> {
    let original = accessor.acquire()?;
    let patched = delta::apply_operations_with(&original, operations, &options.delta)?;
    let changed = patched != original;

    let bytes_written = if !changed {
        0
    } else if options.dry_run {
        patched.len()
    } else {
        accessor.update(&patched)?
    };

    let content = options.return_content.then(|| {
        delta::Document::parse(&patched)
            .into_lines()
            .into_iter()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line))
            .collect()
    });

    Ok(WriteReport {
        location: accessor.location(),
        bytes_written,
        changed,
        original,
        patched,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{Context, Location, Target};

    #[test]
    fn test_memory_write_pieces() {
        let accessor = MemoryAccessor::new("memory://example", "a\nb\n");
        let ops = [Operation::replace(Target::new("b"), "B\n")];

        let report = write_pieces(&accessor, &ops, &WriteOptions::default()).unwrap();
        assert!(report.changed);
        assert_eq!(report.bytes_written, 4);
        assert_eq!(accessor.content(), "a\nB\n");
        assert!(report.content.is_none());
    }

    #[test]
    fn test_write_pieces_returns_numbered_content() {
        let accessor = MemoryAccessor::new("memory://example", "a\nb");
        let ops = [Operation::insert(Location::lines(1, None), "x")];
        let options = WriteOptions {
            return_content: true,
            ..WriteOptions::default()
        };

        let report = write_pieces(&accessor, &ops, &options).unwrap();
        let content = report.content.unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[&2], "x");
    }

    #[test]
    fn test_write_pieces_failure_leaves_target_untouched() {
        let accessor = MemoryAccessor::new("memory://example", "a\nb\n");
        let ops = [
            Operation::replace(Target::new("a"), "A"),
            Operation::insert(Context::before("missing"), "x"),
        ];

        let err = write_pieces(&accessor, &ops, &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, WriteError::Delta(DeltaError::ContextNotFound { index: 1, .. })));
        assert_eq!(accessor.content(), "a\nb\n");
    }

    #[test]
    fn test_write_pieces_dry_run() {
        let accessor = MemoryAccessor::new("memory://example", "a\n");
        let ops = [Operation::insert(Location::lines(1, None), "b\n")];
        let options = WriteOptions {
            dry_run: true,
            ..WriteOptions::default()
        };

        let report = write_pieces(&accessor, &ops, &options).unwrap();
        assert_eq!(report.patched, "a\nb\n");
        assert_eq!(report.bytes_written, 4);
        assert_eq!(accessor.content(), "a\n");
    }

    #[test]
    fn test_file_accessor_missing_file_reads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let accessor = FileAccessor::new(temp_dir.path().join("new.py"));
        assert_eq!(accessor.acquire().unwrap(), "");

        let ops = [Operation::insert(Context::bof(), "#!/usr/bin/env python3\n")];
        let report = write_pieces(&accessor, &ops, &WriteOptions::default()).unwrap();
        assert_eq!(report.bytes_written, 23);
        assert_eq!(
            fs::read_to_string(accessor.path()).unwrap(),
            "#!/usr/bin/env python3\n"
        );
    }

    #[test]
    fn test_file_accessor_atomic_update() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test.txt");
        fs::write(&path, "line1\nline2\nline3\n").unwrap();

        let accessor = FileAccessor::new(&path);
        let ops = [Operation::delete(Location::lines(2, Some(2)))];
        write_pieces(&accessor, &ops, &WriteOptions::default()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "line1\nline3\n");
    }

    #[test]
    fn test_file_accessor_detects_concurrent_modification() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test.txt");
        fs::write(&path, "original\n").unwrap();

        let accessor = FileAccessor::new(&path);
        accessor.acquire().unwrap();
        fs::write(&path, "someone else\n").unwrap();

        let result = accessor.update("patched\n");
        assert!(matches!(
            result,
            Err(AccessError::ConcurrentModification { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "someone else\n");
    }

    #[test]
    fn test_file_accessor_rejects_invalid_utf8() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("binary.bin");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let accessor = FileAccessor::new(&path);
        assert!(matches!(accessor.acquire(), Err(AccessError::Utf8 { .. })));
    }

    #[test]
    fn test_unchanged_result_skips_write() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("test.txt");
        fs::write(&path, "a\n").unwrap();

        let accessor = FileAccessor::new(&path);
        let report = write_pieces(&accessor, &[], &WriteOptions::default()).unwrap();
        assert!(!report.changed);
        assert_eq!(report.bytes_written, 0);
    }
}
