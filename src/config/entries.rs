//! Flat `KEY=value` entry lists used to feed Tengo maps.
//!
//! A source file holds one entry per line. Blank lines and `#` comments are
//! ignored, and a trailing comment (whitespace followed by `#`) is dropped.
//! `\=`, `\#` and `\\` escape the characters that would otherwise split or
//! terminate the line.
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{SourceFormatError, StilyagiError, TargetNotFoundError};

/// How the text after `=` in a source line is interpreted.
///
/// # Examples
///
/// ```
/// use stilyagi::config::entries::ValueCoercion;
///
/// assert_eq!("=n".parse::<ValueCoercion>(), Ok(ValueCoercion::Number));
/// assert_eq!(ValueCoercion::Presence.token(), "true");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueCoercion {
    /// The whole line is the key; the value is always `true`.
    #[default]
    Presence,
    /// The literal text after `=`.
    String,
    /// A truthy or falsy token.
    Bool,
    /// An integer or floating literal.
    Number,
}

impl ValueCoercion {
    /// Every coercion, in token order.
    pub const ALL: [Self; 4] = [Self::Presence, Self::String, Self::Bool, Self::Number];

    /// The command-line and manifest token for this coercion.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Presence => "true",
            Self::String => "=",
            Self::Bool => "=b",
            Self::Number => "=n",
        }
    }
}

impl fmt::Display for ValueCoercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ValueCoercion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.token() == token)
            .ok_or_else(|| {
                format!("unknown value type '{token}' (expected one of: true, =, =b, =n)")
            })
    }
}

/// A numeric map value, kept as written so integers render without a
/// fractional part.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// Integer literal.
    Int(i64),
    /// Floating literal.
    Float(f64),
}

impl Number {
    /// Parse an integer, then a finite float.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Some(Self::Int(i));
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Self::Float)
    }

    #[allow(clippy::cast_precision_loss)]
    const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// A typed value destined for a Tengo map.
#[derive(Debug, Clone, PartialEq)]
pub enum MapValue {
    /// `true` / `false`.
    Bool(bool),
    /// Rendered as a double-quoted string.
    String(String),
    /// Rendered as a bare numeral.
    Number(Number),
}

impl MapValue {
    /// Render the value as Tengo literal syntax.
    ///
    /// # Examples
    ///
    /// ```
    /// use stilyagi::config::entries::{MapValue, Number};
    ///
    /// assert_eq!(MapValue::Bool(true).render(), "true");
    /// assert_eq!(MapValue::String("a \"b\"".into()).render(), r#""a \"b\"""#);
    /// assert_eq!(MapValue::Number(Number::Float(10.0)).render(), "10.0");
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::String(s) => serde_json::Value::String(s.clone()).to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// One parsed key/value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Map key.
    pub key: String,
    /// Coerced value.
    pub value: MapValue,
}

/// The result of parsing a source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceEntries {
    /// Number of entry lines read, duplicates included.
    pub provided: usize,
    /// Unique entries in first-seen order; later duplicates overwrite values.
    pub entries: Vec<Entry>,
}

/// Read and parse the entry file at `path`.
///
/// # Errors
///
/// Returns [`TargetNotFoundError`] if `path` is not a file, an I/O error if it
/// cannot be read, or a [`SourceFormatError`] for a malformed line.
pub fn read_source_entries(
    path: &Path,
    coercion: ValueCoercion,
) -> Result<SourceEntries, StilyagiError> {
    if !path.is_file() {
        return Err(TargetNotFoundError {
            path: path.to_path_buf(),
        }
        .into());
    }
    let text = fs::read_to_string(path).map_err(|e| StilyagiError::io(path, e))?;
    Ok(parse_source_entries(&text, coercion, path)?)
}

/// Parse entry lines from `text`; `path` is used only for error messages.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use stilyagi::config::entries::{parse_source_entries, MapValue, ValueCoercion};
///
/// let parsed = parse_source_entries("a=1\nb=2 # note\na=3\n", ValueCoercion::String, Path::new("x"))
///     .unwrap();
/// assert_eq!(parsed.provided, 3);
/// assert_eq!(parsed.entries[0].value, MapValue::String("3".into()));
/// ```
///
/// # Errors
///
/// Returns a [`SourceFormatError`] naming the line when a typed line lacks
/// `=`, has an empty key, or its value cannot be coerced.
pub fn parse_source_entries(
    text: &str,
    coercion: ValueCoercion,
    path: &Path,
) -> Result<SourceEntries, SourceFormatError> {
    let mut parsed = SourceEntries::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fail = |message: String| SourceFormatError {
            path: path.to_path_buf(),
            line: idx + 1,
            message,
        };

        let chars = unescape(trimmed);
        let entry = parse_line(&chars, coercion).map_err(|m| fail(format!("{m}: {trimmed}")))?;
        let Some(entry) = entry else {
            continue;
        };

        parsed.provided += 1;
        if let Some(&pos) = positions.get(&entry.key) {
            if let Some(slot) = parsed.entries.get_mut(pos) {
                slot.value = entry.value;
            }
        } else {
            positions.insert(entry.key.clone(), parsed.entries.len());
            parsed.entries.push(entry);
        }
    }

    Ok(parsed)
}

/// A character and whether it was produced by a backslash escape.
type Char = (char, bool);

/// Resolve escapes and cut the line at the first unescaped whitespace run
/// followed by `#`.
///
/// Outside a quoted value only `\=`, `\#` and `\\` are escapes; any other
/// backslash is kept as written. A value opening with `"` right after the
/// separator is copied verbatim up to its closing quote so JSON escapes reach
/// [`parse_string`] intact.
fn unescape(line: &str) -> Vec<Char> {
    let mut out: Vec<Char> = Vec::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        if quoted {
            out.push((c, false));
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push((next, false));
                    }
                }
                '"' => quoted = false,
                _ => {}
            }
        } else if c == '\\' {
            match chars.peek() {
                Some(&next @ ('=' | '#' | '\\')) => {
                    chars.next();
                    out.push((next, true));
                }
                _ => out.push((c, false)),
            }
        } else if c == '"' && opens_value(&out) {
            quoted = true;
            out.push((c, false));
        } else if c.is_whitespace() {
            let mut run = vec![c];
            while let Some(&w) = chars.peek()
                && w.is_whitespace()
            {
                run.push(w);
                chars.next();
            }
            if chars.peek() == Some(&'#') {
                break;
            }
            out.extend(run.into_iter().map(|w| (w, false)));
        } else {
            out.push((c, false));
        }
    }
    out
}

/// Whether the last non-blank character is the first unescaped `=`.
fn opens_value(out: &[Char]) -> bool {
    let last = out.iter().rposition(|&(c, _)| !c.is_whitespace());
    let first_eq = out.iter().position(|&(c, escaped)| c == '=' && !escaped);
    last.is_some() && last == first_eq
}

fn collect(chars: &[Char]) -> String {
    chars.iter().map(|&(c, _)| c).collect::<String>().trim().to_string()
}

fn parse_line(chars: &[Char], coercion: ValueCoercion) -> Result<Option<Entry>, String> {
    if coercion == ValueCoercion::Presence {
        let key = collect(chars);
        if key.is_empty() {
            return Ok(None);
        }
        return Ok(Some(Entry {
            key,
            value: MapValue::Bool(true),
        }));
    }

    let split = chars
        .iter()
        .position(|&(c, escaped)| c == '=' && !escaped)
        .ok_or_else(|| format!("expected KEY=value for value type '{coercion}'"))?;
    let (key_chars, rest) = chars.split_at(split);
    let key = collect(key_chars);
    if key.is_empty() {
        return Err("map keys may not be empty".to_string());
    }
    let raw = collect(rest.get(1..).unwrap_or_default());

    let value = match coercion {
        ValueCoercion::Presence | ValueCoercion::String => MapValue::String(parse_string(&raw)),
        ValueCoercion::Bool => {
            MapValue::Bool(parse_bool(&raw).ok_or_else(|| format!("invalid boolean '{raw}'"))?)
        }
        ValueCoercion::Number => MapValue::Number(
            Number::parse(&raw).ok_or_else(|| format!("could not parse number '{raw}'"))?,
        ),
    };
    Ok(Some(Entry { key, value }))
}

/// Decode a JSON-quoted string, or take the text as written.
fn parse_string(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return serde_json::from_str::<String>(raw)
            .unwrap_or_else(|_| raw.trim_matches('"').to_string());
    }
    raw.to_string()
}

/// Accept common truthy and falsy spellings, case-insensitively.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn parse(text: &str, coercion: ValueCoercion) -> SourceEntries {
        parse_source_entries(text, coercion, Path::new("entries.txt")).expect("parse")
    }

    fn single(text: &str, coercion: ValueCoercion) -> Entry {
        let parsed = parse(text, coercion);
        assert_eq!(parsed.entries.len(), 1);
        parsed.entries[0].clone()
    }

    #[test]
    fn coercion_tokens_round_trip() {
        for c in ValueCoercion::ALL {
            assert_eq!(c.token().parse::<ValueCoercion>(), Ok(c));
        }
        assert!("=x".parse::<ValueCoercion>().is_err());
    }

    #[test]
    fn presence_yields_true() {
        let e = single("x\n", ValueCoercion::Presence);
        assert_eq!(e.key, "x");
        assert_eq!(e.value, MapValue::Bool(true));
    }

    #[test]
    fn presence_keeps_equals_in_key() {
        let e = single("a=b\n", ValueCoercion::Presence);
        assert_eq!(e.key, "a=b");
    }

    #[test]
    fn string_takes_literal_text() {
        let e = single("x=hi there", ValueCoercion::String);
        assert_eq!(e.value, MapValue::String("hi there".to_string()));
    }

    #[test]
    fn string_decodes_json_quotes() {
        let e = single(r#"x="a\tb""#, ValueCoercion::String);
        assert_eq!(e.value, MapValue::String("a\tb".to_string()));
    }

    #[test]
    fn string_keeps_escaped_quotes() {
        let e = single(r#"x="say \"hi\"""#, ValueCoercion::String);
        assert_eq!(e.value, MapValue::String(r#"say "hi""#.to_string()));
    }

    #[test]
    fn quoted_value_keeps_hash_and_backslashes() {
        let e = single(r#"x="a #b\\c" # note"#, ValueCoercion::String);
        assert_eq!(e.value, MapValue::String(r"a #b\c".to_string()));
    }

    #[test]
    fn unknown_escape_keeps_backslash() {
        let e = single(r"x=C:\dir", ValueCoercion::String);
        assert_eq!(e.value, MapValue::String(r"C:\dir".to_string()));
    }

    #[test]
    fn bool_accepts_truthy_and_falsy_tokens() {
        assert_eq!(single("x=yes", ValueCoercion::Bool).value, MapValue::Bool(true));
        assert_eq!(single("x=ON", ValueCoercion::Bool).value, MapValue::Bool(true));
        assert_eq!(single("x=0", ValueCoercion::Bool).value, MapValue::Bool(false));
        assert_eq!(single("x=False", ValueCoercion::Bool).value, MapValue::Bool(false));
    }

    #[test]
    fn bool_rejects_other_text() {
        let err = parse_source_entries("x=maybe", ValueCoercion::Bool, Path::new("b.txt"))
            .unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("maybe"));
    }

    #[test]
    fn number_parses_int_and_float() {
        assert_eq!(
            single("x=3.5", ValueCoercion::Number).value,
            MapValue::Number(Number::Float(3.5))
        );
        assert_eq!(
            single("x=7", ValueCoercion::Number).value,
            MapValue::Number(Number::Int(7))
        );
    }

    #[test]
    fn number_rejects_non_numeric_and_non_finite() {
        let err = parse_source_entries("a=1\nx=notanumber\n", ValueCoercion::Number, Path::new("n.txt"))
            .unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.path, Path::new("n.txt"));
        assert!(err.message.contains("notanumber"));
        assert!(parse_source_entries("x=inf", ValueCoercion::Number, Path::new("n")).is_err());
    }

    #[test]
    fn typed_line_without_equals_fails() {
        let err =
            parse_source_entries("\n\nlonely\n", ValueCoercion::String, Path::new("s.txt"))
                .unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("KEY=value"));
    }

    #[test]
    fn empty_key_fails() {
        assert!(parse_source_entries("=1", ValueCoercion::Number, Path::new("n")).is_err());
    }

    #[test]
    fn last_duplicate_wins_and_keeps_first_position() {
        let parsed = parse("a=1\nb=5\na=2\n", ValueCoercion::Number);
        assert_eq!(parsed.provided, 3);
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].key, "a");
        assert_eq!(parsed.entries[0].value, MapValue::Number(Number::Int(2)));
        assert_eq!(parsed.entries[1].key, "b");
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let parsed = parse("# heading\n\n  # indented\nAPI # trailing\n", ValueCoercion::Presence);
        assert_eq!(parsed.provided, 1);
        assert_eq!(parsed.entries[0].key, "API");
    }

    #[test]
    fn hash_without_leading_whitespace_is_kept() {
        let e = single("C#", ValueCoercion::Presence);
        assert_eq!(e.key, "C#");
    }

    #[test]
    fn escapes_protect_separators() {
        let e = single(r"a\=b=c \#1", ValueCoercion::String);
        assert_eq!(e.key, "a=b");
        assert_eq!(e.value, MapValue::String("c #1".to_string()));

        let e = single(r"back\\slash", ValueCoercion::Presence);
        assert_eq!(e.key, r"back\slash");
    }

    #[test]
    fn number_equality_is_semantic() {
        assert_eq!(Number::Int(10), Number::Float(10.0));
        assert_ne!(Number::Int(10), Number::Float(10.5));
    }

    #[test]
    fn render_values() {
        assert_eq!(MapValue::Bool(false).render(), "false");
        assert_eq!(MapValue::Number(Number::Int(-4)).render(), "-4");
        assert_eq!(MapValue::Number(Number::Float(2.5)).render(), "2.5");
        assert_eq!(MapValue::String("x".into()).render(), "\"x\"");
    }

    #[test]
    fn read_missing_file_is_target_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_source_entries(&dir.path().join("nope.txt"), ValueCoercion::Presence)
            .unwrap_err();
        assert!(matches!(err, StilyagiError::TargetNotFound(_)));
    }

    #[test]
    fn read_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        fs::write(&path, "NASA\nESA\n").unwrap();
        let parsed = read_source_entries(&path, ValueCoercion::Presence).unwrap();
        assert_eq!(parsed.provided, 2);
    }
}
