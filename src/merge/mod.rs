//! Anchored text-region merges.
//!
//! Every target format handled here is edited the same way: split the file
//! into lines, locate the region the tool owns (a map body, an INI section, a
//! recipe block), then upsert keyed lines inside that region and leave every
//! other line as it was. The format adapters in the submodules only describe
//! how a line carries a key and how a new line is rendered; [`upsert`] does
//! the rest.
pub mod gitignore;
pub mod ini;
pub mod recipe;
pub mod tengo;

use std::ops::Range;

/// A document held as a sequence of lines.
///
/// Rendering always joins lines with `\n` and ends non-empty output with a
/// single trailing newline, so a second merge over rendered output is a
/// no-op.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextDocument {
    lines: Vec<String>,
}

impl TextDocument {
    /// Split `text` into lines.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(String::from).collect(),
        }
    }

    /// Render the document back to text.
    #[must_use]
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// All lines.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Line at `idx`, if any.
    #[must_use]
    pub fn line(&self, idx: usize) -> Option<&str> {
        self.lines.get(idx).map(String::as_str)
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the document has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Replace the line at `idx`, returning whether its content changed.
    pub fn replace(&mut self, idx: usize, line: String) -> bool {
        match self.lines.get_mut(idx) {
            Some(slot) if *slot != line => {
                *slot = line;
                true
            }
            _ => false,
        }
    }

    /// Insert `line` before `idx` (clamped to the end).
    pub fn insert(&mut self, idx: usize, line: String) {
        let idx = idx.min(self.lines.len());
        self.lines.insert(idx, line);
    }

    /// Append `line` at the end.
    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    /// Replace the lines in `range` with `replacement`, returning whether the
    /// document changed.
    pub fn splice(&mut self, range: Range<usize>, replacement: Vec<String>) -> bool {
        let end = range.end.min(self.lines.len());
        let start = range.start.min(end);
        if self.lines.get(start..end) == Some(replacement.as_slice()) {
            return false;
        }
        self.lines.splice(start..end, replacement);
        true
    }

    /// Index one past the last non-blank line in `range`, or `range.start`.
    #[must_use]
    pub fn end_of_content(&self, range: Range<usize>) -> usize {
        let start = range.start;
        range
            .rev()
            .find(|&i| self.line(i).is_some_and(|l| !l.trim().is_empty()))
            .map_or(start, |i| i + 1)
    }
}

/// The part of a document a merge owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Line holding the region's anchor (section header, map opener), if any.
    pub header: Option<usize>,
    /// Lines inside the region, excluding the header and any closing line.
    pub body: Range<usize>,
}

impl Region {
    /// A region spanning the whole document with no header.
    #[must_use]
    pub const fn whole(doc: &TextDocument) -> Self {
        Self {
            header: None,
            body: 0..doc.lines.len(),
        }
    }
}

/// Outcome of a single keyed upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// The key existed with an equivalent value.
    Unchanged,
    /// The key existed and its line was rewritten.
    Replaced,
    /// The key was absent and a new line was inserted.
    Inserted,
}

impl Change {
    /// Whether the document was modified.
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Line-level syntax of one merge target.
pub trait LineFormat {
    /// The value written for a key.
    type Value: ?Sized;

    /// Key carried by `line`, or `None` for opaque lines.
    fn key_of(&self, line: &str) -> Option<String>;

    /// Render the line for `key`. `existing` is the line being replaced, so
    /// formats can keep its indentation or trailing comment.
    fn render(&self, key: &str, value: &Self::Value, existing: Option<&str>) -> String;

    /// Whether `existing` already carries `value` for `key`.
    fn equivalent(&self, existing: &str, key: &str, value: &Self::Value) -> bool {
        existing == self.render(key, value, Some(existing))
    }

    /// Where a new keyed line goes: after the last keyed line in the region,
    /// else after the region's last non-blank line.
    fn insertion_point(&self, doc: &TextDocument, region: &Region) -> usize {
        region
            .body
            .clone()
            .rev()
            .find(|&i| doc.line(i).is_some_and(|l| self.key_of(l).is_some()))
            .map_or_else(|| doc.end_of_content(region.body.clone()), |i| i + 1)
    }
}

/// Set `key` to `value` inside `region`.
///
/// The first keyed line matching `key` is rewritten when its value differs;
/// when no line matches, a new line is inserted at the format's insertion
/// point and the region grows to include it. Lines outside the region and
/// keyed lines for other keys are never touched.
pub fn upsert<F: LineFormat>(
    doc: &mut TextDocument,
    region: &mut Region,
    format: &F,
    key: &str,
    value: &F::Value,
) -> Change {
    let existing = region.body.clone().find(|&i| {
        doc.line(i)
            .and_then(|l| format.key_of(l))
            .is_some_and(|k| k == key)
    });

    if let Some(idx) = existing {
        let Some(line) = doc.line(idx).map(String::from) else {
            return Change::Unchanged;
        };
        if format.equivalent(&line, key, value) {
            return Change::Unchanged;
        }
        let rendered = format.render(key, value, Some(&line));
        doc.replace(idx, rendered);
        return Change::Replaced;
    }

    let at = format
        .insertion_point(doc, region)
        .clamp(region.body.start, region.body.end);
    doc.insert(at, format.render(key, value, None));
    region.body.end += 1;
    Change::Inserted
}
