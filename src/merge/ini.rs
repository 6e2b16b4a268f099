//! Upsert keys into an INI document such as `.vale.ini`.
//!
//! Keys before the first `[header]` form the root section. Requested keys are
//! rewritten in place or added after the last key of their section; sections
//! that do not exist yet are appended at the end of the document. Comments,
//! blank lines and unrelated sections pass through untouched.
use super::{Change, LineFormat, Region, TextDocument, upsert};

/// One key assignment.
pub type Assignment = (String, String);

/// Keys to write into the root section and into named sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniRequest {
    /// Assignments for the root (untitled) section.
    pub root: Vec<Assignment>,
    /// Sections in creation order, each with its assignments.
    pub sections: Vec<(String, Vec<Assignment>)>,
}

/// Apply `request` to `text` and return the merged document.
///
/// # Examples
///
/// ```
/// use stilyagi::merge::ini::{IniRequest, merge_ini};
///
/// let request = IniRequest {
///     root: vec![("MinAlertLevel".into(), "warning".into())],
///     sections: vec![("*.md".into(), vec![("BasedOnStyles".into(), "Vale".into())])],
/// };
/// let merged = merge_ini("# mine\nStylesPath = styles\n", &request);
/// assert_eq!(
///     merged,
///     "# mine\nStylesPath = styles\nMinAlertLevel = warning\n\n[*.md]\nBasedOnStyles = Vale\n",
/// );
/// ```
#[must_use]
pub fn merge_ini(text: &str, request: &IniRequest) -> String {
    let mut doc = TextDocument::parse(text);

    let mut root = root_region(&doc);
    let mut root_grew = false;
    for (key, value) in &request.root {
        root_grew |= upsert(&mut doc, &mut root, &IniKey, key, value) == Change::Inserted;
    }
    if root_grew
        && root.body.end < doc.len()
        && doc.line(root.body.end - 1).is_some_and(|l| !l.trim().is_empty())
    {
        doc.insert(root.body.end, String::new());
    }

    for (header, assignments) in &request.sections {
        let mut region =
            find_section(&doc, header).unwrap_or_else(|| append_section(&mut doc, header));
        for (key, value) in assignments {
            upsert(&mut doc, &mut region, &IniKey, key, value);
        }
    }

    let merged = doc.render();
    if merged == text { text.to_string() } else { merged }
}

/// Value of `key` in the root section, if set.
///
/// # Examples
///
/// ```
/// use stilyagi::merge::ini::root_value;
///
/// let text = "StylesPath = .vale/styles\n[*]\nStylesPath = no\n";
/// assert_eq!(root_value(text, "StylesPath").as_deref(), Some(".vale/styles"));
/// assert_eq!(root_value("[*]\nStylesPath = no\n", "StylesPath"), None);
/// ```
#[must_use]
pub fn root_value(text: &str, key: &str) -> Option<String> {
    let doc = TextDocument::parse(text);
    root_region(&doc)
        .body
        .filter_map(|i| doc.line(i).and_then(parse_kv_line))
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v)
        .last()
}

/// Lines before the first section header.
fn root_region(doc: &TextDocument) -> Region {
    let end = (0..doc.len())
        .find(|&i| doc.line(i).and_then(parse_raw_header).is_some())
        .unwrap_or(doc.len());
    Region {
        header: None,
        body: 0..end,
    }
}

/// The first section whose header matches `name` exactly.
fn find_section(doc: &TextDocument, name: &str) -> Option<Region> {
    let header = (0..doc.len())
        .find(|&i| doc.line(i).and_then(parse_raw_header).as_deref() == Some(name))?;
    let end = (header + 1..doc.len())
        .find(|&i| doc.line(i).and_then(parse_raw_header).is_some())
        .unwrap_or(doc.len());
    Some(Region {
        header: Some(header),
        body: header + 1..end,
    })
}

/// Append an empty `[name]` section, separated from earlier content by one
/// blank line.
fn append_section(doc: &mut TextDocument, name: &str) -> Region {
    if doc.lines().last().is_some_and(|l| !l.trim().is_empty()) {
        doc.push(String::new());
    }
    doc.push(format!("[{name}]"));
    Region {
        header: Some(doc.len() - 1),
        body: doc.len()..doc.len(),
    }
}

/// Parse a `[header]` line preserving original case.
fn parse_raw_header(line: &str) -> Option<String> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Parse a `key = value` line. Comment lines (`#` or `;`) carry no key.
fn parse_kv_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return None;
    }
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// `key = value` lines.
struct IniKey;

impl LineFormat for IniKey {
    type Value = str;

    fn key_of(&self, line: &str) -> Option<String> {
        parse_kv_line(line).map(|(k, _)| k)
    }

    fn render(&self, key: &str, value: &str, _existing: Option<&str>) -> String {
        format!("{key} = {value}")
    }

    fn equivalent(&self, existing: &str, _key: &str, value: &str) -> bool {
        parse_kv_line(existing).is_some_and(|(_, v)| v == value)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn kv(pairs: &[(&str, &str)]) -> Vec<Assignment> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn request() -> IniRequest {
        IniRequest {
            root: kv(&[("Packages", "https://example.test/s.zip"), ("MinAlertLevel", "warning")]),
            sections: vec![
                ("docs/**/*.md".to_string(), kv(&[("BasedOnStyles", "concordat")])),
                ("README.md".to_string(), kv(&[("BasedOnStyles", "concordat"), ("concordat.Pronouns", "NO")])),
            ],
        }
    }

    #[test]
    fn empty_document_is_built_from_scratch() {
        let merged = merge_ini("", &request());
        insta::assert_snapshot!(merged, @r"
        Packages = https://example.test/s.zip
        MinAlertLevel = warning

        [docs/**/*.md]
        BasedOnStyles = concordat

        [README.md]
        BasedOnStyles = concordat
        concordat.Pronouns = NO
        ");
    }

    #[test]
    fn existing_keys_are_replaced_and_others_kept() {
        let text = "\
# Project prose settings
StylesPath = styles
MinAlertLevel = suggestion

[README.md]
BasedOnStyles = Vale
Vale.Spelling = NO
; keep me
";
        let merged = merge_ini(text, &request());
        insta::assert_snapshot!(merged, @r"
        # Project prose settings
        StylesPath = styles
        MinAlertLevel = warning
        Packages = https://example.test/s.zip

        [README.md]
        BasedOnStyles = concordat
        Vale.Spelling = NO
        concordat.Pronouns = NO
        ; keep me

        [docs/**/*.md]
        BasedOnStyles = concordat
        ");
    }

    #[test]
    fn merge_is_idempotent() {
        let once = merge_ini("StylesPath = x\n[other]\nA = 1\n", &request());
        let twice = merge_ini(&once, &request());
        assert_eq!(once, twice);
    }

    #[test]
    fn root_keys_abutting_a_header_get_a_separator() {
        let merged = merge_ini(
            "[*]\nBasedOnStyles = Vale\n",
            &IniRequest {
                root: kv(&[("Vocab", "Concordat")]),
                sections: vec![],
            },
        );
        assert_eq!(merged, "Vocab = Concordat\n\n[*]\nBasedOnStyles = Vale\n");
    }

    #[test]
    fn same_key_in_other_section_is_not_touched() {
        let merged = merge_ini(
            "[*.txt]\nMinAlertLevel = error\n",
            &IniRequest {
                root: kv(&[("MinAlertLevel", "warning")]),
                sections: vec![],
            },
        );
        assert!(merged.contains("[*.txt]\nMinAlertLevel = error"));
        assert!(merged.starts_with("MinAlertLevel = warning\n"));
    }

    #[test]
    fn unchanged_input_is_returned_verbatim() {
        let text = "Vocab = A\n\n\n";
        let merged = merge_ini(
            text,
            &IniRequest {
                root: kv(&[("Vocab", "A")]),
                sections: vec![],
            },
        );
        assert_eq!(merged, text);
    }

    #[test]
    fn root_value_reads_last_root_assignment() {
        assert_eq!(root_value("A = 1\nA = 2\n", "A").as_deref(), Some("2"));
        assert_eq!(root_value("", "A"), None);
    }

    #[test]
    fn header_parsing() {
        assert_eq!(parse_raw_header("[ *.md ]").as_deref(), Some("*.md"));
        assert_eq!(parse_raw_header("[]"), None);
        assert_eq!(parse_raw_header("key = [x]"), None);
    }

    #[test]
    fn kv_parsing_keeps_equals_in_value() {
        assert_eq!(
            parse_kv_line("BlockIgnores = (?s)a=b"),
            Some(("BlockIgnores".to_string(), "(?s)a=b".to_string()))
        );
        assert_eq!(parse_kv_line("# A = 1"), None);
    }
}
