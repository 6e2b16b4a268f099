//! The `[install]` manifest shipped inside a packaged style archive.
//!
//! ```toml
//! [install]
//! style_name = "concordat"
//! vocab = "concordat"
//! min_alert_level = "warning"
//!
//! [[install.post_sync_steps]]
//! action = "update-tengo-map"
//! source = ".config/common-acronyms"
//! dest = ".vale/styles/concordat/Acronyms.tengo"
//! value_type = "true"
//! ```
//!
//! Post-sync steps are validated all-or-nothing: one bad step rejects the
//! whole manifest. A manifest that is missing, or that is not TOML at all,
//! yields [`InstallManifest::default_for`].
use std::fmt;
use std::str::FromStr;

use toml::Value;

use super::entries::ValueCoercion;
use crate::error::ManifestSchemaError;

/// File names recognised as the install manifest inside an archive.
pub const MANIFEST_FILE_NAMES: [&str; 2] = ["stilyagi.toml", "manifest.toml"];

/// Lowest Vale alert level reported by the consumer repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertLevel {
    /// `suggestion`
    Suggestion,
    /// `warning`
    #[default]
    Warning,
    /// `error`
    Error,
}

impl AlertLevel {
    /// The value written to `MinAlertLevel`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Suggestion => "suggestion",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suggestion" => Ok(Self::Suggestion),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown alert level '{other}' (expected suggestion, warning or error)"
            )),
        }
    }
}

/// Actions a post-sync step may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSyncAction {
    /// Merge an entry list into a Tengo map (`update-tengo-map`).
    UpdateTengoMap,
}

impl PostSyncAction {
    /// Name used in manifests and as the CLI subcommand.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UpdateTengoMap => "update-tengo-map",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        [Self::UpdateTengoMap]
            .into_iter()
            .find(|a| a.name() == name.trim())
    }
}

/// One validated `install.post_sync_steps` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostSyncStep {
    /// What to run.
    pub action: PostSyncAction,
    /// Entry list, relative to the consumer project root.
    pub source: String,
    /// Tengo script (optionally `path::map`), relative to the project root.
    pub dest: String,
    /// How entry values are coerced.
    pub value_type: ValueCoercion,
}

/// Where an [`InstallManifest`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestOrigin {
    /// Parsed from a packaged manifest file.
    Packaged,
    /// Built-in defaults; no usable manifest was found.
    Default,
}

/// Install settings for a packaged style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallManifest {
    /// Style name used in `BasedOnStyles`.
    pub style_name: String,
    /// Vocabulary name written to `Vocab`.
    pub vocab: String,
    /// Value written to `MinAlertLevel`.
    pub min_alert_level: AlertLevel,
    /// Steps run after `vale sync`, in order.
    pub post_sync_steps: Vec<PostSyncStep>,
    /// Whether these values came from a manifest or are defaults.
    pub origin: ManifestOrigin,
}

impl InstallManifest {
    /// Defaults for a style with no manifest.
    ///
    /// # Examples
    ///
    /// ```
    /// use stilyagi::config::manifest::{AlertLevel, InstallManifest, ManifestOrigin};
    ///
    /// let m = InstallManifest::default_for("concordat");
    /// assert_eq!(m.vocab, "concordat");
    /// assert_eq!(m.min_alert_level, AlertLevel::Warning);
    /// assert_eq!(m.origin, ManifestOrigin::Default);
    /// ```
    #[must_use]
    pub fn default_for(style_name: &str) -> Self {
        Self {
            style_name: style_name.to_string(),
            vocab: style_name.to_string(),
            min_alert_level: AlertLevel::default(),
            post_sync_steps: Vec::new(),
            origin: ManifestOrigin::Default,
        }
    }
}

/// Parse manifest text, falling back to defaults for `default_style`.
///
/// `None`, text that is not valid TOML, and documents without an `[install]`
/// table all produce [`InstallManifest::default_for`].
///
/// # Errors
///
/// Returns [`ManifestSchemaError`] naming the offending field when `[install]`
/// exists but any of its values is malformed.
pub fn parse_manifest(
    text: Option<&str>,
    default_style: &str,
) -> Result<InstallManifest, ManifestSchemaError> {
    let Some(text) = text else {
        return Ok(InstallManifest::default_for(default_style));
    };
    let doc = match toml::from_str::<toml::Table>(text) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("manifest is not valid TOML, using defaults: {e}");
            return Ok(InstallManifest::default_for(default_style));
        }
    };
    let Some(Value::Table(install)) = doc.get("install") else {
        tracing::debug!("manifest has no [install] table, using defaults");
        return Ok(InstallManifest::default_for(default_style));
    };

    let style_name = optional_string(install, "style_name", "install.style_name")?
        .unwrap_or_else(|| default_style.to_string());
    let vocab = optional_string(install, "vocab", "install.vocab")?
        .unwrap_or_else(|| style_name.clone());
    let min_alert_level = optional_string(install, "min_alert_level", "install.min_alert_level")?
        .map(|level| {
            level
                .parse::<AlertLevel>()
                .map_err(|m| ManifestSchemaError::new("install.min_alert_level", m))
        })
        .transpose()?
        .unwrap_or_default();

    let post_sync_steps = match install.get("post_sync_steps") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| parse_step(idx, item))
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(ManifestSchemaError::new(
                "install.post_sync_steps",
                format!("must be an array of tables, got {}", other.type_str()),
            ));
        }
    };

    Ok(InstallManifest {
        style_name,
        vocab,
        min_alert_level,
        post_sync_steps,
        origin: ManifestOrigin::Packaged,
    })
}

/// A trimmed string field; blank values count as absent.
fn optional_string(
    table: &toml::Table,
    key: &str,
    location: &str,
) -> Result<Option<String>, ManifestSchemaError> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(ManifestSchemaError::new(
            location,
            format!("must be a string, got {}", other.type_str()),
        )),
    }
}

fn parse_step(idx: usize, item: &Value) -> Result<PostSyncStep, ManifestSchemaError> {
    let at = |field: &str| format!("install.post_sync_steps[{idx}].{field}");
    let Value::Table(step) = item else {
        return Err(ManifestSchemaError::new(
            format!("install.post_sync_steps[{idx}]"),
            format!("must be a table, got {}", item.type_str()),
        ));
    };

    let action_name = optional_string(step, "action", &at("action"))?
        .ok_or_else(|| ManifestSchemaError::new(at("action"), "missing required field"))?;
    let action = PostSyncAction::from_name(&action_name).ok_or_else(|| {
        ManifestSchemaError::new(
            at("action"),
            format!("unsupported action '{action_name}' (expected 'update-tengo-map')"),
        )
    })?;

    let source = optional_string(step, "source", &at("source"))?
        .ok_or_else(|| ManifestSchemaError::new(at("source"), "missing required field"))?;
    let dest = optional_string(step, "dest", &at("dest"))?
        .ok_or_else(|| ManifestSchemaError::new(at("dest"), "missing required field"))?;

    let type_key = if step.contains_key("value_type") {
        "value_type"
    } else {
        "type"
    };
    let value_type = match optional_string(step, type_key, &at(type_key))? {
        None => ValueCoercion::default(),
        Some(token) => token
            .parse::<ValueCoercion>()
            .map_err(|m| ManifestSchemaError::new(at(type_key), m))?,
    };

    Ok(PostSyncStep {
        action,
        source,
        dest,
        value_type,
    })
}
