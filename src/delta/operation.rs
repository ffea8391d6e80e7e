//! Operation descriptors and their wire shape.
//!
//! An [`Operation`] pairs an opcode with one of three ways of addressing
//! lines:
//!
//! - [`Location::Context`]: the edit region lies strictly *between* a
//!   `before` block and an `after` block.
//! - [`Location::Target`]: the edit region *is* the matched block (or
//!   `length` lines starting there).
//! - [`Location::Lines`]: explicit 1-based line numbers.
//!
//! On the wire the variant is chosen by which key is present:
//!
//! ```json
//! {"opcode": "insert", "context": {"before": "def f():"}, "content": "    pass\n"}
//! {"opcode": "replace", "target": {"lines": "    return True", "nth_match": 2}, "content": "    return False\n"}
//! {"opcode": "delete", "start": 3, "end": 4}
//! ```

use serde::Deserialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaType {
    Insert,
    Delete,
    Replace,
}

impl fmt::Display for DeltaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaType::Insert => write!(f, "INSERT"),
            DeltaType::Delete => write!(f, "DELETE"),
            DeltaType::Replace => write!(f, "REPLACE"),
        }
    }
}

fn first_match() -> usize {
    1
}

/// Between-addressing: edit the span strictly between two context blocks.
///
/// `None` for `before` anchors at beginning of file; `None` for `after`
/// anchors at end of file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Context {
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
    /// Which `before` match to use (1-based). Applies to `after` when
    /// `before` is absent.
    #[serde(default = "first_match")]
    pub nth_match: usize,
}

impl Context {
    /// Anchor at beginning of file.
    pub fn bof() -> Self {
        Self {
            before: None,
            after: None,
            nth_match: 1,
        }
    }

    pub fn before(text: impl Into<String>) -> Self {
        Self {
            before: Some(text.into()),
            ..Self::bof()
        }
    }

    pub fn with_after(mut self, text: impl Into<String>) -> Self {
        self.after = Some(text.into());
        self
    }

    pub fn with_nth_match(mut self, nth_match: usize) -> Self {
        self.nth_match = nth_match;
        self
    }
}

/// At-addressing: edit the matched block itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    pub lines: String,
    /// Must appear immediately after `lines` for a window to count as a match.
    #[serde(default)]
    pub followed_by: Option<String>,
    #[serde(default = "first_match")]
    pub nth_match: usize,
    /// Lines consumed by DELETE/REPLACE, counted from the match start.
    /// Defaults to the length of `lines`.
    #[serde(default)]
    pub length: Option<usize>,
}

impl Target {
    pub fn new(lines: impl Into<String>) -> Self {
        Self {
            lines: lines.into(),
            followed_by: None,
            nth_match: 1,
            length: None,
        }
    }

    pub fn followed_by(mut self, text: impl Into<String>) -> Self {
        self.followed_by = Some(text.into());
        self
    }

    pub fn with_nth_match(mut self, nth_match: usize) -> Self {
        self.nth_match = nth_match;
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Context(Context),
    Target(Target),
    /// 1-based line numbers. INSERT goes after line `start` (0 = very
    /// beginning); DELETE/REPLACE cover `start..=end`.
    Lines { start: i64, end: Option<i64> },
}

impl Location {
    pub fn lines(start: i64, end: Option<i64>) -> Self {
        Location::Lines { start, end }
    }

    pub fn nth_match(&self) -> Option<usize> {
        match self {
            Location::Context(context) => Some(context.nth_match),
            Location::Target(target) => Some(target.nth_match),
            Location::Lines { .. } => None,
        }
    }
}

impl From<Context> for Location {
    fn from(context: Context) -> Self {
        Location::Context(context)
    }
}

impl From<Target> for Location {
    fn from(target: Target) -> Self {
        Location::Target(target)
    }
}

/// A single delta operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawOperation")]
pub struct Operation {
    pub opcode: DeltaType,
    pub location: Location,
    pub content: Option<String>,
}

impl Operation {
    pub fn insert(location: impl Into<Location>, content: impl Into<String>) -> Self {
        Self {
            opcode: DeltaType::Insert,
            location: location.into(),
            content: Some(content.into()),
        }
    }

    pub fn delete(location: impl Into<Location>) -> Self {
        Self {
            opcode: DeltaType::Delete,
            location: location.into(),
            content: None,
        }
    }

    pub fn replace(location: impl Into<Location>, content: impl Into<String>) -> Self {
        Self {
            opcode: DeltaType::Replace,
            location: location.into(),
            content: Some(content.into()),
        }
    }
}

/// Errors turning a wire operation into an [`Operation`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("operation needs one of 'context', 'target' or 'start'")]
    MissingLocation,

    #[error("operation may use only one of 'context', 'target' or 'start', found {0}")]
    ConflictingLocations(String),

    #[error("'end' is only valid together with 'start'")]
    EndWithoutStart,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOperation {
    opcode: DeltaType,
    #[serde(default)]
    context: Option<Context>,
    #[serde(default)]
    target: Option<Target>,
    #[serde(default)]
    start: Option<i64>,
    #[serde(default)]
    end: Option<i64>,
    #[serde(default)]
    content: Option<String>,
}

impl TryFrom<RawOperation> for Operation {
    type Error = WireError;

    fn try_from(raw: RawOperation) -> Result<Self, Self::Error> {
        let mut present = Vec::new();
        if raw.context.is_some() {
            present.push("context");
        }
        if raw.target.is_some() {
            present.push("target");
        }
        if raw.start.is_some() {
            present.push("start");
        }
        if present.len() > 1 {
            return Err(WireError::ConflictingLocations(present.join(", ")));
        }
        if raw.end.is_some() && raw.start.is_none() {
            return Err(WireError::EndWithoutStart);
        }

        let location = match (raw.context, raw.target, raw.start) {
            (Some(context), _, _) => Location::Context(context),
            (_, Some(target), _) => Location::Target(target),
            (_, _, Some(start)) => Location::Lines {
                start,
                end: raw.end,
            },
            (None, None, None) => return Err(WireError::MissingLocation),
        };

        Ok(Operation {
            opcode: raw.opcode,
            location,
            content: raw.content,
        })
    }
}
