//! Positional line diff used to compare two snapshot bodies.
//!
//! This is not a minimal-edit diff. Both texts are walked line by line with
//! two cursors; a mismatch emits the old line as removed and the new line as
//! added and advances both cursors. An insertion in the middle of a body
//! therefore shows up as a run of removed/added pairs for every line after it.

use serde::{Deserialize, Serialize};

/// How a line relates the old text to the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Same,
    Added,
    Removed,
}

impl DiffKind {
    /// String representation for display, logging, and serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Same => "same",
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }

    /// Gutter marker used when rendering a diff as text.
    pub fn marker(&self) -> char {
        match self {
            Self::Same => ' ',
            Self::Added => '+',
            Self::Removed => '-',
        }
    }
}

impl std::fmt::Display for DiffKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line in a diff result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffKind,
    pub line: String,
}

impl DiffLine {
    fn new(kind: DiffKind, line: &str) -> Self {
        Self {
            kind,
            line: line.to_string(),
        }
    }
}

/// Line counts per kind for a diff result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub same: usize,
    pub added: usize,
    pub removed: usize,
}

impl DiffSummary {
    pub fn from_lines(lines: &[DiffLine]) -> Self {
        lines.iter().fold(Self::default(), |mut acc, l| {
            match l.kind {
                DiffKind::Same => acc.same += 1,
                DiffKind::Added => acc.added += 1,
                DiffKind::Removed => acc.removed += 1,
            }
            acc
        })
    }

    /// Whether the two texts were line-for-line identical.
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Compare two texts line by line, positionally.
///
/// Texts are split on `\n`, so an empty text is a single empty line and a
/// trailing newline yields a trailing empty line.
pub fn diff_lines(old_text: &str, new_text: &str) -> Vec<DiffLine> {
    let old_lines: Vec<&str> = old_text.split('\n').collect();
    let new_lines: Vec<&str> = new_text.split('\n').collect();

    let mut result = Vec::with_capacity(old_lines.len().max(new_lines.len()));
    let mut i = 0;
    let mut j = 0;

    while i < old_lines.len() || j < new_lines.len() {
        if i >= old_lines.len() {
            result.push(DiffLine::new(DiffKind::Added, new_lines[j]));
            j += 1;
        } else if j >= new_lines.len() {
            result.push(DiffLine::new(DiffKind::Removed, old_lines[i]));
            i += 1;
        } else if old_lines[i] == new_lines[j] {
            result.push(DiffLine::new(DiffKind::Same, old_lines[i]));
            i += 1;
            j += 1;
        } else {
            result.push(DiffLine::new(DiffKind::Removed, old_lines[i]));
            result.push(DiffLine::new(DiffKind::Added, new_lines[j]));
            i += 1;
            j += 1;
        }
    }

    result
}

/// Render diff lines as marker-prefixed text, one line per entry.
pub fn render_diff(lines: &[DiffLine]) -> String {
    lines
        .iter()
        .map(|l| format!("{} {}", l.kind.marker(), l.line))
        .collect::<Vec<_>>()
        .join("\n")
}
