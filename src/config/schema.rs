use crate::delta::{Operation, TrailingNewline};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A delta file: metadata plus an ordered list of per-file operation batches.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DeltaConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub deltas: Vec<DeltaDefinition>,
}

impl DeltaConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.deltas.is_empty() {
            issues.push(ValidationIssue::EmptyDeltaList);
        }

        let mut seen = HashSet::new();
        for delta in &self.deltas {
            let delta_id = if delta.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    delta_id: None,
                    field: "id",
                });
                None
            } else {
                if !seen.insert(delta.id.as_str()) {
                    issues.push(ValidationIssue::InvalidCombo {
                        delta_id: Some(delta.id.clone()),
                        message: "duplicate delta id".to_string(),
                    });
                }
                Some(delta.id.clone())
            };

            if delta.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    delta_id: delta_id.clone(),
                    field: "file",
                });
            }
            if delta.operations.is_empty() {
                issues.push(ValidationIssue::InvalidCombo {
                    delta_id,
                    message: "delta has no operations".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Resolve `file` against the workspace root rather than the current
    /// directory.
    #[serde(default)]
    pub workspace_relative: bool,
    #[serde(default)]
    pub trailing_newline: TrailingNewline,
}

/// One operation batch against one file. Applied all-or-nothing.
#[derive(Debug, Deserialize, Clone)]
pub struct DeltaDefinition {
    pub id: String,
    pub file: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyDeltaList,
    MissingField {
        delta_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        delta_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyDeltaList => write!(f, "delta config contains no deltas"),
            ValidationIssue::MissingField { delta_id, field } => match delta_id {
                Some(id) => write!(f, "delta '{id}' missing required field '{field}'"),
                None => write!(f, "delta missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { delta_id, message } => match delta_id {
                Some(id) => write!(f, "delta '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid delta configuration: {message}"),
            },
        }
    }
}
