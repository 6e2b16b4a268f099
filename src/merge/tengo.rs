//! Merge entries into a named map literal inside a Tengo script.
//!
//! The map is expected in the flat, one-entry-per-line shape Vale's Tengo
//! scripts use:
//!
//! ```text
//! allow := {
//!   "API": true,
//!   "limit": 10, // comment kept on rewrite
//! }
//! ```
//!
//! Existing entries are only ever overwritten or left alone; new entries go
//! just before the closing brace. The last entry may omit its trailing comma;
//! it gains one when an entry is added after it.
use std::path::Path;

use super::{LineFormat, Region, TextDocument, upsert};
use crate::config::entries::{Entry, MapValue, Number};
use crate::error::MapNotFoundError;

/// Result of merging entries into a map literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapMerge {
    /// The rewritten script.
    pub text: String,
    /// Entries that were inserted or had their value replaced.
    pub changed: usize,
}

/// Merge `entries` into the map named `map_name` in `text`.
///
/// `path` is only used to label errors.
///
/// # Errors
///
/// Returns [`MapNotFoundError`] if no line declares `map_name := {`, if more
/// than one does, or if the map's closing brace cannot be found.
pub fn merge_entries(
    text: &str,
    map_name: &str,
    entries: &[Entry],
    path: &Path,
) -> Result<MapMerge, MapNotFoundError> {
    let not_found = |reason: &str| MapNotFoundError {
        path: path.to_path_buf(),
        map: map_name.to_string(),
        reason: reason.to_string(),
    };
    if map_name.trim().is_empty() {
        return Err(not_found("map name must not be empty"));
    }

    let mut doc = TextDocument::parse(text);
    let headers: Vec<usize> = doc
        .lines()
        .iter()
        .enumerate()
        .filter(|(_, l)| is_map_header(l, map_name))
        .map(|(i, _)| i)
        .collect();
    let header = match headers.as_slice() {
        [] => return Err(not_found("no map literal with this name")),
        [one] => *one,
        many => {
            return Err(not_found(&format!(
                "declared {} times; refusing to guess which to update",
                many.len()
            )));
        }
    };
    let close = find_closing_line(&doc, header).ok_or_else(|| not_found("closing brace not found"))?;

    let map_indent = leading_whitespace(doc.line(header).unwrap_or_default()).to_string();
    let entry_indent = (header + 1..close)
        .find_map(|i| doc.line(i).and_then(parse_entry).map(|e| e.indent.to_string()))
        .unwrap_or_else(|| format!("{map_indent}  "));

    let format = TengoEntry { entry_indent };
    let mut region = Region {
        header: Some(header),
        body: header + 1..close,
    };
    let changed = entries
        .iter()
        .map(|e| upsert(&mut doc, &mut region, &format, &e.key, &e.value))
        .filter(|c| c.is_change())
        .count();

    let text = if changed == 0 {
        text.to_string()
    } else {
        terminate_entries(&mut doc, &region);
        doc.render()
    };
    Ok(MapMerge { text, changed })
}

/// Add the separating comma to every entry in `region` that is followed by
/// another entry.
fn terminate_entries(doc: &mut TextDocument, region: &Region) {
    let entries: Vec<usize> = region
        .body
        .clone()
        .filter(|&i| doc.line(i).and_then(parse_entry).is_some())
        .collect();
    for &idx in entries.iter().rev().skip(1) {
        let Some(line) = doc.line(idx) else {
            continue;
        };
        let Some(entry) = parse_entry(line).filter(|e| !e.comma) else {
            continue;
        };
        let code = line.get(..line.len() - entry.comment.len()).unwrap_or(line);
        let terminated = format!("{code},{}", entry.comment);
        doc.replace(idx, terminated);
    }
}

/// Whether `line` reads `<name> := {` with nothing after the brace.
fn is_map_header(line: &str, name: &str) -> bool {
    line.trim_start()
        .strip_prefix(name)
        .and_then(|rest| rest.trim_start().strip_prefix(":="))
        .is_some_and(|rest| rest.trim() == "{")
}

/// Index of the line that closes the map opened at `header`.
fn find_closing_line(doc: &TextDocument, header: usize) -> Option<usize> {
    let mut depth: i64 = 1;
    for idx in header + 1..doc.len() {
        depth += brace_delta(doc.line(idx)?);
        if depth <= 0 {
            return Some(idx);
        }
    }
    None
}

/// Net `{`/`}` count on a line, ignoring string literals and `//` comments.
fn brace_delta(line: &str) -> i64 {
    let mut delta = 0;
    let mut in_string = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if in_string => {
                chars.next();
            }
            '"' => in_string = !in_string,
            '/' if !in_string && chars.peek() == Some(&'/') => break,
            '{' if !in_string => delta += 1,
            '}' if !in_string => delta -= 1,
            _ => {}
        }
    }
    delta
}

fn leading_whitespace(line: &str) -> &str {
    line.get(..line.len() - line.trim_start().len())
        .unwrap_or_default()
}

/// A `"key": value,` line split into its parts.
#[derive(Debug, PartialEq, Eq)]
struct ParsedEntry<'a> {
    indent: &'a str,
    key: String,
    value: &'a str,
    /// Whether the value is followed by `,`.
    comma: bool,
    comment: &'a str,
}

fn parse_entry(line: &str) -> Option<ParsedEntry<'_>> {
    let indent = leading_whitespace(line);
    let rest = line.get(indent.len()..)?.strip_prefix('"')?;

    let mut escaped = false;
    let key_end = rest.char_indices().find_map(|(i, c)| {
        if escaped {
            escaped = false;
            None
        } else if c == '\\' {
            escaped = true;
            None
        } else if c == '"' {
            Some(i)
        } else {
            None
        }
    })?;
    let raw_key = rest.get(..key_end)?;
    if raw_key.is_empty() {
        return None;
    }
    let after_key = rest.get(key_end + 1..)?.trim_start().strip_prefix(':')?;

    let code_end = comment_start(after_key).unwrap_or(after_key.len());
    let code = after_key.get(..code_end)?.trim_end();
    let comment = if code_end < after_key.len() {
        after_key.get(code.len()..)?
    } else {
        ""
    };
    let (value, comma) = code.strip_suffix(',').map_or((code, false), |v| (v, true));
    let value = value.trim();
    // A bare opener starts a nested literal spanning several lines.
    if value.is_empty() || (!comma && value.ends_with(['{', '[', '('])) {
        return None;
    }

    Some(ParsedEntry {
        indent,
        key: decode_key(raw_key),
        value,
        comma,
        comment,
    })
}

/// Byte offset of a `//` that is not inside a string literal.
fn comment_start(text: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => return Some(i),
            _ => {}
        }
    }
    None
}

fn decode_key(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

/// Interpret an existing Tengo literal so values can be compared by meaning.
fn parse_literal(raw: &str) -> Option<MapValue> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => return Some(MapValue::Bool(true)),
        "false" => return Some(MapValue::Bool(false)),
        _ => {}
    }
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Some(MapValue::String(
            serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.trim_matches('"').to_string()),
        ));
    }
    Number::parse(raw).map(MapValue::Number)
}

/// Line syntax of Tengo map entries.
struct TengoEntry {
    entry_indent: String,
}

impl LineFormat for TengoEntry {
    type Value = MapValue;

    fn key_of(&self, line: &str) -> Option<String> {
        parse_entry(line).map(|e| e.key)
    }

    fn render(&self, key: &str, value: &MapValue, existing: Option<&str>) -> String {
        let (indent, comment) = existing
            .and_then(parse_entry)
            .map_or((self.entry_indent.as_str(), ""), |e| (e.indent, e.comment));
        let key = serde_json::Value::String(key.to_string());
        format!("{indent}{key}: {},{comment}", value.render())
    }

    fn equivalent(&self, existing: &str, _key: &str, value: &MapValue) -> bool {
        parse_entry(existing).is_some_and(|e| {
            parse_literal(e.value).is_some_and(|v| v == *value) || e.value == value.render()
        })
    }

    fn insertion_point(&self, _doc: &TextDocument, region: &Region) -> usize {
        region.body.end
    }
}
