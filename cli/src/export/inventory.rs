//! What a deployed `.cursor` directory currently contains.
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::IGNORE_FILE;
use super::bundle::parse_ignore_file;

/// Summary of `mcp.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum McpConfig {
    /// No `mcp.json`.
    Missing,
    /// Parsed; server names from `mcpServers`.
    Valid {
        /// Configured server names, sorted.
        servers: Vec<String>,
    },
    /// Present but not valid JSON.
    Invalid {
        /// Parser message.
        message: String,
    },
}

/// Contents of a `.cursor` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inventory {
    /// The directory scanned.
    pub cursor_dir: PathBuf,
    /// Whether it exists.
    pub exists: bool,
    /// Rule names (`rules/*.mdc`, without extension).
    pub rules: Vec<String>,
    /// Prompt names (`prompts/*.md`, without extension).
    pub prompts: Vec<String>,
    /// MCP server configuration.
    pub mcp: McpConfig,
    /// Ignore file entries.
    pub ignore_entries: Vec<String>,
}

impl Inventory {
    /// Scan `cursor_dir`. Unreadable entries are treated as absent.
    #[must_use]
    pub fn scan(cursor_dir: &Path) -> Self {
        let ignore_entries = std::fs::read_to_string(cursor_dir.join(IGNORE_FILE))
            .map(|c| parse_ignore_file(&c))
            .unwrap_or_default();
        Self {
            cursor_dir: cursor_dir.to_path_buf(),
            exists: cursor_dir.is_dir(),
            rules: stems(&cursor_dir.join("rules"), "mdc"),
            prompts: stems(&cursor_dir.join("prompts"), "md"),
            mcp: read_mcp(&cursor_dir.join("mcp.json")),
            ignore_entries,
        }
    }

    /// Whether `mcp.json` exists and parses.
    #[must_use]
    pub const fn has_mcp_config(&self) -> bool {
        matches!(self.mcp, McpConfig::Valid { .. })
    }
}

/// Sorted file stems in `dir` with extension `ext` (not recursive).
fn stems(dir: &Path, ext: &str) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == ext))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

fn read_mcp(path: &Path) -> McpConfig {
    let Ok(content) = std::fs::read_to_string(path) else {
        return McpConfig::Missing;
    };
    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value) => {
            let mut servers: Vec<String> = value
                .get("mcpServers")
                .and_then(serde_json::Value::as_object)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();
            servers.sort();
            McpConfig::Valid { servers }
        }
        Err(e) => McpConfig::Invalid {
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Inventory::scan(&dir.path().join(".cursor"));
        assert!(!inv.exists);
        assert!(inv.rules.is_empty());
        assert_eq!(inv.mcp, McpConfig::Missing);
    }

    #[test]
    fn counts_rules_prompts_and_servers() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("rules")).unwrap();
        std::fs::create_dir_all(root.join("prompts")).unwrap();
        std::fs::write(root.join("rules/shared.mdc"), "").unwrap();
        std::fs::write(root.join("rules/linux-dev.mdc"), "").unwrap();
        std::fs::write(root.join("rules/notes.txt"), "").unwrap();
        std::fs::write(root.join("prompts/openssl-coding-standards.md"), "").unwrap();
        std::fs::write(
            root.join("mcp.json"),
            r#"{"mcpServers": {"openssl-context": {}, "build-intelligence": {}}}"#,
        )
        .unwrap();
        std::fs::write(root.join(IGNORE_FILE), "# header\n*.log\n\n!mcp.json\n").unwrap();

        let inv = Inventory::scan(root);

        assert!(inv.exists);
        assert_eq!(inv.rules, ["linux-dev", "shared"]);
        assert_eq!(inv.prompts, ["openssl-coding-standards"]);
        assert_eq!(
            inv.mcp,
            McpConfig::Valid {
                servers: vec!["build-intelligence".into(), "openssl-context".into()]
            }
        );
        assert_eq!(inv.ignore_entries, ["*.log", "!mcp.json"]);
    }

    #[test]
    fn invalid_mcp_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mcp.json"), "{ nope").unwrap();
        let inv = Inventory::scan(dir.path());
        assert!(matches!(inv.mcp, McpConfig::Invalid { .. }));
        assert!(!inv.has_mcp_config());
    }
}
