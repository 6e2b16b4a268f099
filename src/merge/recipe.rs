//! Own one target of a Makefile.
//!
//! The merge makes sure the target is declared `.PHONY`, that the variables
//! its commands use have a default, and that the target's block (header line
//! plus tab-indented commands) matches the requested recipe exactly. Every
//! other target, assignment and comment is left alone.
use super::{Change, LineFormat, Region, TextDocument, upsert};

/// The block a merge owns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recipe {
    /// Target name, e.g. `vale`.
    pub target: String,
    /// Prerequisite targets listed after the colon.
    pub prerequisites: Vec<String>,
    /// `## help` text shown by self-documenting Makefiles.
    pub help: Option<String>,
    /// Command lines, without the leading tab.
    pub commands: Vec<String>,
    /// Comment line written above the block when it is first created.
    pub header_comment: Option<String>,
}

impl Recipe {
    /// The `target: prereqs ## help` line.
    #[must_use]
    pub fn header_line(&self) -> String {
        let mut line = format!("{}:", self.target);
        for prerequisite in &self.prerequisites {
            line.push(' ');
            line.push_str(prerequisite);
        }
        if let Some(help) = &self.help {
            line.push_str(" ## ");
            line.push_str(help);
        }
        line
    }

    fn block(&self) -> Vec<String> {
        std::iter::once(self.header_line())
            .chain(self.commands.iter().map(|c| format!("\t{c}")))
            .collect()
    }
}

/// A recipe plus the variables it needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecipeRequest {
    /// `(name, default)` pairs; `name ?= default` is added only when the
    /// Makefile assigns no value to `name`.
    pub variables: Vec<(String, String)>,
    /// The target block.
    pub recipe: Recipe,
}

/// Apply `request` to `text` and return the merged Makefile.
///
/// # Examples
///
/// ```
/// use stilyagi::merge::recipe::{Recipe, RecipeRequest, merge_recipe};
///
/// let request = RecipeRequest {
///     variables: vec![],
///     recipe: Recipe {
///         target: "lint".into(),
///         commands: vec!["cargo clippy".into()],
///         ..Recipe::default()
///     },
/// };
/// let merged = merge_recipe("build:\n\tcargo build\n", &request);
/// assert_eq!(merged, ".PHONY: lint\n\nbuild:\n\tcargo build\n\nlint:\n\tcargo clippy\n");
/// ```
#[must_use]
pub fn merge_recipe(text: &str, request: &RecipeRequest) -> String {
    let mut doc = TextDocument::parse(text);

    for (name, default) in &request.variables {
        prepend_if_absent(&mut doc, &Variable, name, default);
    }
    let target = request.recipe.target.as_str();
    if !doc.lines().iter().any(|l| phony_targets(l).any(|t| t == target)) {
        prepend_if_absent(&mut doc, &Phony, ".PHONY", target);
    }

    let block = request.recipe.block();
    if let Some(region) = find_target(&doc, &request.recipe.target) {
        let start = region.header.unwrap_or(region.body.start);
        doc.splice(start..region.body.end, block);
    } else {
        if doc.lines().last().is_some_and(|l| !l.trim().is_empty()) {
            doc.push(String::new());
        }
        if let Some(comment) = &request.recipe.header_comment {
            doc.push(format!("# {comment}"));
        }
        for line in block {
            doc.push(line);
        }
    }

    let merged = doc.render();
    if merged == text { text.to_string() } else { merged }
}

/// Upsert a line that belongs at the top of the file, followed by a blank
/// separator when other content follows.
fn prepend_if_absent<F: LineFormat<Value = str>>(
    doc: &mut TextDocument,
    format: &F,
    key: &str,
    value: &str,
) {
    let had_content = !doc.is_empty();
    let mut region = Region::whole(doc);
    if upsert(doc, &mut region, format, key, value) == Change::Inserted && had_content {
        doc.insert(1, String::new());
    }
}

/// The block for `target`: its header line and following tab-indented lines.
fn find_target(doc: &TextDocument, target: &str) -> Option<Region> {
    let header = (0..doc.len()).find(|&i| {
        doc.line(i)
            .and_then(|l| l.split_once(':'))
            .is_some_and(|(name, rest)| name.trim_end() == target && !rest.starts_with('='))
    })?;
    let end = (header + 1..doc.len())
        .find(|&i| !doc.line(i).is_some_and(|l| l.starts_with('\t')))
        .unwrap_or(doc.len());
    Some(Region {
        header: Some(header),
        body: header + 1..end,
    })
}

/// Targets listed on a `.PHONY` line; empty for any other line.
fn phony_targets(line: &str) -> impl Iterator<Item = &str> {
    line.trim_start()
        .strip_prefix(".PHONY")
        .and_then(|rest| rest.trim_start().strip_prefix(':'))
        .unwrap_or_default()
        .split_whitespace()
}

/// `NAME = value` style assignments. An existing assignment is always kept.
struct Variable;

impl LineFormat for Variable {
    type Value = str;

    fn key_of(&self, line: &str) -> Option<String> {
        let name_end = line
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(line.len());
        let (name, rest) = line.split_at(name_end);
        if name.is_empty() {
            return None;
        }
        let rest = rest.trim_start();
        let rest = rest
            .strip_prefix('?')
            .or_else(|| rest.strip_prefix(':'))
            .unwrap_or(rest);
        rest.starts_with('=').then(|| name.to_string())
    }

    fn render(&self, key: &str, value: &str, _existing: Option<&str>) -> String {
        format!("{key} ?= {value}")
    }

    fn equivalent(&self, _existing: &str, _key: &str, _value: &str) -> bool {
        true
    }

    fn insertion_point(&self, _doc: &TextDocument, _region: &Region) -> usize {
        0
    }
}

/// The first `.PHONY:` line, extended with missing target names.
struct Phony;

impl LineFormat for Phony {
    type Value = str;

    fn key_of(&self, line: &str) -> Option<String> {
        line.trim_start()
            .starts_with(".PHONY")
            .then(|| ".PHONY".to_string())
    }

    fn render(&self, _key: &str, target: &str, existing: Option<&str>) -> String {
        existing.map_or_else(
            || format!(".PHONY: {target}"),
            |line| format!("{} {target}", line.trim_end()),
        )
    }

    fn equivalent(&self, existing: &str, _key: &str, target: &str) -> bool {
        phony_targets(existing).any(|t| t == target)
    }

    fn insertion_point(&self, _doc: &TextDocument, _region: &Region) -> usize {
        0
    }
}
