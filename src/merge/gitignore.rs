//! Add a pattern to `.gitignore` unless an equivalent one is already listed.
use super::{LineFormat, Region, TextDocument, upsert};

/// Return `text` with `pattern` appended when no existing line ignores the
/// same path. Trailing `/` and surrounding whitespace are ignored when
/// comparing; comment lines never match.
///
/// # Examples
///
/// ```
/// use stilyagi::merge::gitignore::merge_gitignore;
///
/// assert_eq!(merge_gitignore("target/\n", "styles/"), "target/\nstyles/\n");
/// assert_eq!(merge_gitignore("styles\n", "styles/"), "styles\n");
/// ```
#[must_use]
pub fn merge_gitignore(text: &str, pattern: &str) -> String {
    let Some(key) = normalize(pattern) else {
        return text.to_string();
    };
    let mut doc = TextDocument::parse(text);
    let mut region = Region::whole(&doc);
    if upsert(&mut doc, &mut region, &Pattern, &key, pattern.trim()).is_change() {
        doc.render()
    } else {
        text.to_string()
    }
}

fn normalize(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let key = trimmed.trim_end_matches('/');
    if key.is_empty() {
        return None;
    }
    Some(key.to_string())
}

/// One ignore pattern per line.
struct Pattern;

impl LineFormat for Pattern {
    type Value = str;

    fn key_of(&self, line: &str) -> Option<String> {
        normalize(line)
    }

    fn render(&self, _key: &str, pattern: &str, _existing: Option<&str>) -> String {
        pattern.to_string()
    }

    fn equivalent(&self, _existing: &str, _key: &str, _pattern: &str) -> bool {
        true
    }

    fn insertion_point(&self, doc: &TextDocument, region: &Region) -> usize {
        doc.end_of_content(region.body.clone())
    }
}
