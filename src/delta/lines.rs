//! Line tokenization.
//!
//! [`split`] and [`join`] are the raw `\n` primitives. [`Document`] adds the
//! one property they lose: whether the text ended with a newline.

use serde::Deserialize;

/// Split text on `\n`. Empty text yields no lines, so "no lines" and
/// "one empty line" stay distinguishable.
pub fn split(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(str::to_owned).collect()
}

/// Inverse of [`split`].
pub fn join<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(line.as_ref());
    }
    out
}

/// Split a context block. Unlike [`split`], an empty string is one empty
/// line: a block always has at least one line to match.
pub fn block(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_owned).collect()
}

/// Policy for the final line terminator of patched output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrailingNewline {
    /// Output ends with `\n` iff the input did. Empty input has no
    /// convention, so the output follows the last content line.
    #[default]
    Preserve,
    /// Output ends with `\n` iff whichever line ends up last was terminated.
    FollowContent,
}

impl std::str::FromStr for TrailingNewline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preserve" => Ok(TrailingNewline::Preserve),
            "follow-content" => Ok(TrailingNewline::FollowContent),
            other => Err(format!(
                "unknown trailing newline policy '{other}' (expected 'preserve' or 'follow-content')"
            )),
        }
    }
}

/// Text as a sequence of lines plus its trailing-newline state.
///
/// Every line but the last is terminated by `\n`; the last one is
/// terminated iff `trailing_newline` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        let mut lines = split(text);
        let trailing_newline = text.ends_with('\n');
        if trailing_newline {
            lines.pop();
        }
        Self {
            lines,
            trailing_newline,
        }
    }

    /// Build from parts. A document without lines has no terminator.
    pub fn from_parts(lines: Vec<String>, trailing_newline: bool) -> Self {
        let trailing_newline = trailing_newline && !lines.is_empty();
        Self {
            lines,
            trailing_newline,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// Whether line `idx` carries a `\n` terminator.
    pub fn is_terminated(&self, idx: usize) -> bool {
        idx + 1 < self.lines.len() || self.trailing_newline
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn render(&self) -> String {
        let mut out = join(&self.lines);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }
}
