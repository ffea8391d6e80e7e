use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Confines delta targets to a workspace root.
///
/// Targets may not exist yet (an INSERT into an empty document creates the
/// file), so a missing target is checked through its nearest existing
/// ancestor.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    workspace_root: PathBuf,
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Target is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Target is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Target path has no file name: {0}")]
    NoFileName(PathBuf),

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl WorkspaceGuard {
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;

        let mut forbidden_paths = Vec::new();
        if let Some(home) = home::home_dir() {
            for dir in [".cargo/registry", ".cargo/git", ".rustup"] {
                if let Ok(path) = home.join(dir).canonicalize() {
                    forbidden_paths.push(path);
                }
            }
        }
        for dir in [".git", "target"] {
            if let Ok(path) = workspace_root.join(dir).canonicalize() {
                forbidden_paths.push(path);
            }
        }

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Resolve `path` against the workspace and check it is safe to patch.
    ///
    /// Returns the absolute path to hand to a
    /// [`FileAccessor`](crate::accessor::FileAccessor).
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let resolved = match absolute.canonicalize() {
            Ok(canonical) => canonical,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                resolve_missing(&absolute)?
            }
            Err(err) => return Err(err.into()),
        };

        self.check_resolved(&resolved)?;
        Ok(resolved)
    }

    fn check_resolved(&self, resolved: &Path) -> Result<(), SafetyError> {
        if !resolved.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: resolved.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        }

        if let Some(forbidden) = self
            .forbidden_paths
            .iter()
            .find(|forbidden| resolved.starts_with(forbidden))
        {
            return Err(SafetyError::ForbiddenPath {
                path: resolved.to_path_buf(),
                forbidden: forbidden.clone(),
            });
        }

        Ok(())
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    #[cfg(test)]
    pub fn with_forbidden(
        workspace_root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        let workspace_root = workspace_root.as_ref().canonicalize()?;
        Ok(Self {
            workspace_root,
            forbidden_paths: forbidden,
        })
    }
}

/// Canonicalize the deepest existing ancestor of a missing path and re-attach
/// the remaining components. `..` in the missing tail is rejected by
/// resolving it lexically against the canonical ancestor.
fn resolve_missing(absolute: &Path) -> Result<PathBuf, SafetyError> {
    if absolute.file_name().is_none() {
        return Err(SafetyError::NoFileName(absolute.to_path_buf()));
    }

    let mut existing = absolute;
    let mut tail = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                let mut resolved = canonical;
                for component in tail.iter().rev() {
                    match component {
                        Component::ParentDir => {
                            resolved.pop();
                        }
                        Component::CurDir => {}
                        other => resolved.push(other.as_os_str()),
                    }
                }
                return Ok(resolved);
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let (Some(parent), Some(last)) = (existing.parent(), existing.components().next_back())
                else {
                    return Err(err.into());
                };
                tail.push(last);
                existing = parent;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
