//! Reading delta files from disk or from a string.

use crate::config::schema::{DeltaConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a delta config was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Inline,
    File(PathBuf),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Inline => f.write_str("<inline delta config>"),
            Origin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read delta config from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}: failed to parse delta config TOML: {source}")]
    Toml {
        origin: Origin,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("{origin}: invalid delta config: {source}")]
    Validation {
        origin: Origin,
        #[source]
        source: ValidationError,
    },
}

pub fn load_from_str(input: &str) -> Result<DeltaConfig, ConfigError> {
    parse(input, Origin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<DeltaConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, Origin::File(path.to_path_buf()))
}

fn parse(input: &str, origin: Origin) -> Result<DeltaConfig, ConfigError> {
    let config: DeltaConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Toml { origin, source }),
    };
    if let Err(source) = config.validate() {
        return Err(ConfigError::Validation { origin, source });
    }

    tracing::debug!(
        %origin,
        deltas = config.deltas.len(),
        operations = config.deltas.iter().map(|d| d.operations.len()).sum::<usize>(),
        "loaded delta config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ValidationIssue;
    use crate::delta::{DeltaType, Location, TrailingNewline};

    #[test]
    fn test_load_minimal_config() {
        let config = load_from_str(
            r#"
[meta]
name = "docstrings"
trailing_newline = "follow-content"

[[deltas]]
id = "add-docstring"
file = "src/example.py"

[[deltas.operations]]
opcode = "insert"
context = { before = "def example():" }
content = "    \"\"\"Example function.\"\"\"\n"

[[deltas.operations]]
opcode = "delete"
start = 5
end = 6
"#,
        )
        .unwrap();

        assert_eq!(config.meta.name, "docstrings");
        assert_eq!(config.meta.trailing_newline, TrailingNewline::FollowContent);
        assert_eq!(config.deltas.len(), 1);

        let ops = &config.deltas[0].operations;
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].opcode, DeltaType::Insert);
        assert_eq!(ops[1].location, Location::lines(5, Some(6)));
    }

    #[test]
    fn test_trailing_newline_defaults_to_preserve() {
        let config = load_from_str(
            r#"
[[deltas]]
id = "x"
file = "a.txt"
operations = [{ opcode = "delete", target = { lines = "gone" } }]
"#,
        )
        .unwrap();
        assert_eq!(config.meta.trailing_newline, TrailingNewline::Preserve);
        assert!(!config.meta.workspace_relative);
    }

    #[test]
    fn test_empty_config_is_invalid() {
        let err = load_from_str("[meta]\nname = \"empty\"\n").unwrap_err();
        match err {
            ConfigError::Validation { source, .. } => {
                assert_eq!(source.issues, vec![ValidationIssue::EmptyDeltaList]);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_validation_collects_every_issue() {
        let err = load_from_str(
            r#"
[[deltas]]
id = "dup"
file = ""

[[deltas]]
id = "dup"
file = "b.txt"
operations = [{ opcode = "delete", start = 1, end = 1 }]
"#,
        )
        .unwrap_err();

        let ConfigError::Validation { source, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(source.issues.len(), 3);
        assert!(source.issues.contains(&ValidationIssue::MissingField {
            delta_id: Some("dup".to_string()),
            field: "file",
        }));
        assert!(source.to_string().contains("duplicate delta id"));
        assert!(source.to_string().contains("delta has no operations"));
    }

    #[test]
    fn test_malformed_operation_is_a_toml_error() {
        let err = load_from_str(
            r#"
[[deltas]]
id = "x"
file = "a.txt"
operations = [{ opcode = "delete", start = 1, end = 1, target = { lines = "a" } }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(err.to_string().contains("only one of"));
    }

    #[test]
    fn test_load_from_path_attaches_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[[deltas]\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        match &err {
            ConfigError::Toml {
                origin: Origin::File(p),
                ..
            } => assert_eq!(p, &path),
            other => panic!("expected TOML error with path, got {other}"),
        }
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_inline_errors_name_their_origin() {
        let err = load_from_str("[[deltas]\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Toml {
                origin: Origin::Inline,
                ..
            }
        ));
        assert!(err.to_string().starts_with("<inline delta config>: "));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = load_from_path("/nonexistent/deltas.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
