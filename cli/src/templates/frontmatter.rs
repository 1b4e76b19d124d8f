//! YAML frontmatter checks for `.mdc` rule files.
//!
//! A rule file starts with a block delimited by `---` lines:
//!
//! ```text
//! ---
//! title: Shared rules
//! description: Conventions for every platform
//! platform: shared
//! ---
//! ```
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Fields every rule must declare.
pub const REQUIRED_FIELDS: &[&str] = &["title", "description", "platform"];

/// Fields a rule may declare.
pub const OPTIONAL_FIELDS: &[&str] = &["created", "user", "version", "author", "tags", "deprecated"];

/// Accepted values of `platform`.
pub const VALID_PLATFORMS: &[&str] = &[
    "shared", "linux", "macos", "windows", "ci-linux", "ci-macos", "ci-windows",
];

/// Outcome of checking one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Problems that make the rule invalid.
    pub errors: Vec<String>,
    /// Problems worth fixing that do not invalidate the rule.
    pub warnings: Vec<String>,
}

impl Report {
    /// Whether no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Split `content` into its frontmatter text and body.
#[must_use]
pub fn split(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((rest.get(..offset)?, rest.get(offset + line.len()..)?));
        }
        offset += line.len();
    }
    None
}

/// Check the frontmatter of a rule file's content.
#[must_use]
pub fn check(content: &str) -> Report {
    let mut report = Report::default();

    let Some((yaml, _)) = split(content) else {
        report.errors.push("no YAML frontmatter found".to_string());
        return report;
    };

    let fields: Mapping = match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(m)) => m,
        Ok(Value::Null) => Mapping::new(),
        Ok(_) => {
            report
                .errors
                .push("frontmatter must be a mapping".to_string());
            return report;
        }
        Err(e) => {
            report.errors.push(format!("invalid YAML syntax: {e}"));
            return report;
        }
    };

    for field in REQUIRED_FIELDS {
        match fields.get(*field) {
            None => report.errors.push(format!("missing required field: {field}")),
            Some(Value::String(_)) => {}
            Some(_) => report
                .errors
                .push(format!("field '{field}' must be a string")),
        }
    }

    if let Some(Value::String(platform)) = fields.get("platform")
        && !VALID_PLATFORMS.contains(&platform.as_str())
    {
        report.errors.push(format!(
            "invalid platform '{platform}'; expected one of: {}",
            VALID_PLATFORMS.join(", ")
        ));
    }

    for (field, ok) in [
        ("created", fields.get("created").is_none_or(Value::is_string)),
        ("user", fields.get("user").is_none_or(Value::is_string)),
        ("version", fields.get("version").is_none_or(Value::is_string)),
        ("author", fields.get("author").is_none_or(Value::is_string)),
        ("tags", fields.get("tags").is_none_or(Value::is_sequence)),
        ("deprecated", fields.get("deprecated").is_none_or(Value::is_bool)),
    ] {
        if !ok {
            report
                .warnings
                .push(format!("field '{field}' has an unexpected type"));
        }
    }

    if let Some(Value::String(created)) = fields.get("created")
        && !is_iso_date(created)
    {
        report
            .warnings
            .push(format!("field 'created' should be an ISO 8601 date: {created}"));
    }

    let unknown: Vec<String> = fields
        .keys()
        .filter_map(Value::as_str)
        .filter(|k| !REQUIRED_FIELDS.contains(k) && !OPTIONAL_FIELDS.contains(k))
        .map(ToString::to_string)
        .collect();
    if !unknown.is_empty() {
        report
            .warnings
            .push(format!("unknown fields: {}", unknown.join(", ")));
    }

    report
}

/// Check a file on disk.
#[must_use]
pub fn check_file(path: &Path) -> Report {
    if path.extension().is_none_or(|e| e != "mdc") {
        return Report {
            errors: vec![format!("not a .mdc file: {}", path.display())],
            warnings: Vec::new(),
        };
    }
    match std::fs::read_to_string(path) {
        Ok(content) => check(&content),
        Err(e) => Report {
            errors: vec![format!("cannot read {}: {e}", path.display())],
            warnings: Vec::new(),
        },
    }
}

fn is_iso_date(value: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}
