//! Serializable exports of a plan or of a deployed `.cursor` directory.
use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::IGNORE_FILE;
use crate::error::{ConfigError, TemplateError};
use crate::plan::DeploymentPlan;
use crate::platform::PlatformContext;
use crate::resources::helpers::fs::{list_files, sha256_hex};
use crate::templates::{Renderer, display_path};

/// Conan package reference used to scope profile options.
const PROFILE_PACKAGE: &str = "mcp-orchestrator/*";

/// Output format for `export-config`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Pretty-printed JSON bundle.
    #[default]
    Json,
    /// Conan-style profile with `[settings]`, `[options]` and `[env]`.
    Profile,
}

/// Where and for whom a bundle was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// RFC 3339 timestamp.
    pub exported_at: String,
    /// Operating system name.
    pub platform: String,
    /// CPU architecture.
    pub arch: String,
    /// User that ran the export.
    pub user: String,
    /// Project type the files were generated for.
    pub project_type: String,
    /// Orchestrator version.
    pub version: String,
}

impl ExportMetadata {
    /// Metadata for an export of `project_type` on `ctx` at `exported_at`.
    #[must_use]
    pub fn new(ctx: &PlatformContext, project_type: &str, exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            platform: ctx.os.to_string(),
            arch: ctx.arch.clone(),
            user: ctx.user.clone(),
            project_type: project_type.to_string(),
            version: crate::version().to_string(),
        }
    }
}

/// One file in a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFile {
    /// Path relative to the `.cursor` directory, forward slashes.
    pub path: String,
    /// Lowercase hex SHA-256 of `content`.
    pub sha256: String,
    /// File content.
    pub content: String,
}

impl ExportedFile {
    fn new(path: String, content: String) -> Self {
        Self {
            path,
            sha256: sha256_hex(content.as_bytes()),
            content,
        }
    }
}

/// A self-contained, serializable copy of a Cursor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBundle {
    /// Provenance.
    pub metadata: ExportMetadata,
    /// Files in application order.
    pub files: Vec<ExportedFile>,
    /// Entries of the ignore file.
    pub ignore_entries: Vec<String>,
}

impl ExportBundle {
    /// Render the bundle in `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render(&self, format: ExportFormat) -> Result<String, serde_json::Error> {
        match format {
            ExportFormat::Json => serde_json::to_string_pretty(self).map(|s| s + "\n"),
            ExportFormat::Profile => Ok(self.to_profile()),
        }
    }

    /// Conan-style profile describing this configuration.
    ///
    /// File contents are not embedded; each file is listed with its digest.
    #[must_use]
    pub fn to_profile(&self) -> String {
        let m = &self.metadata;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "# mcp-orchestrator {} profile for '{}' ({})",
            m.version, m.project_type, m.exported_at
        );
        let _ = writeln!(out, "[settings]");
        let _ = writeln!(out, "os={}", conan_os(&m.platform));
        let _ = writeln!(out, "arch={}", conan_arch(&m.arch));
        let _ = writeln!(out);
        let _ = writeln!(out, "[options]");
        let _ = writeln!(out, "{PROFILE_PACKAGE}:project_type={}", m.project_type);
        let _ = writeln!(out, "{PROFILE_PACKAGE}:platform={}", m.platform);
        let _ = writeln!(out);
        let _ = writeln!(out, "[env]");
        let _ = writeln!(out, "MCP_ORCHESTRATOR_PROJECT_TYPE={}", m.project_type);
        let _ = writeln!(out, "MCP_ORCHESTRATOR_PLATFORM={}", m.platform);
        let paths: Vec<&str> = self.files.iter().map(|f| f.path.as_str()).collect();
        let _ = writeln!(out, "CURSOR_CONFIG_FILES={}", paths.join(";"));
        for file in &self.files {
            let _ = writeln!(out, "# {} sha256={}", file.path, file.sha256);
        }
        out
    }
}

/// Render every file of `plan` into a bundle without writing anything.
///
/// # Errors
///
/// Returns the first rendering failure.
pub fn export(
    plan: &DeploymentPlan,
    renderer: &Renderer,
    metadata: ExportMetadata,
) -> Result<ExportBundle, TemplateError> {
    let files = plan
        .files
        .iter()
        .map(|f| {
            renderer
                .render(&f.descriptor, &f.variables)
                .map(|content| ExportedFile::new(f.descriptor.target_display(), content))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ExportBundle {
        metadata,
        files,
        ignore_entries: plan.ignore_entries.clone(),
    })
}

/// Bundle the files already present in `cursor_dir`.
///
/// The ignore file is not bundled as a file; its entries populate
/// `ignore_entries`. A missing directory yields an empty bundle.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if a file cannot be read as UTF-8 text.
pub fn snapshot(cursor_dir: &Path, metadata: ExportMetadata) -> Result<ExportBundle, ConfigError> {
    let io_error = |path: &Path, source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    let mut ignore_entries = Vec::new();
    for rel in list_files(cursor_dir).map_err(|e| io_error(cursor_dir, e))? {
        let path = cursor_dir.join(&rel);
        let content = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        let rel = display_path(&rel);
        if rel == IGNORE_FILE {
            ignore_entries = parse_ignore_file(&content);
        } else {
            files.push(ExportedFile::new(rel, content));
        }
    }
    Ok(ExportBundle {
        metadata,
        files,
        ignore_entries,
    })
}

/// Non-comment, non-empty lines of an ignore file.
#[must_use]
pub fn parse_ignore_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

fn conan_os(os: &str) -> &str {
    match os {
        "linux" => "Linux",
        "macos" => "Macos",
        "windows" => "Windows",
        other => other,
    }
}

fn conan_arch(arch: &str) -> &str {
    match arch {
        "aarch64" | "arm64" => "armv8",
        "x86_64" | "amd64" => "x86_64",
        "x86" | "i686" => "x86",
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::export::render_ignore_file;
    use crate::plan::{DeployOptions, LOCAL_ONLY_PATTERNS, PlannedFile};
    use crate::config::EnvSnapshot;
    use crate::exec::test_helpers::MockExecutor;
    use crate::platform::PlatformDetector;
    use crate::templates::renderer::Variables;
    use crate::templates::{Layer, TemplateDescriptor, TemplateKind};
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn metadata() -> ExportMetadata {
        ExportMetadata {
            exported_at: "2026-01-02T03:04:05Z".to_string(),
            platform: "linux".to_string(),
            arch: "aarch64".to_string(),
            user: "dev".to_string(),
            project_type: "openssl".to_string(),
            version: "0.1.0".to_string(),
        }
    }

    fn plan() -> DeploymentPlan {
        let mut variables = Variables::new();
        variables.insert("os".to_string(), "linux".into());
        DeploymentPlan {
            project_type: "openssl".to_string(),
            files: vec![PlannedFile {
                descriptor: TemplateDescriptor {
                    id: "rules/shared.mdc".to_string(),
                    source_path: PathBuf::from("rules/shared.mdc.jinja2"),
                    target: PathBuf::from("rules/shared.mdc"),
                    layer: Layer::Shared,
                    project_types: Vec::new(),
                    required_variables: BTreeSet::from(["os".to_string()]),
                    kind: TemplateKind::Jinja,
                    source: "on {{ os }}\n".to_string(),
                },
                variables,
            }],
            conflicts: Vec::new(),
            ignore_entries: LOCAL_ONLY_PATTERNS.iter().map(ToString::to_string).collect(),
            options: DeployOptions::default(),
            opted_out: false,
        }
    }

    #[test]
    fn export_renders_without_writing() {
        let bundle = export(&plan(), &Renderer::new(), metadata()).unwrap();
        assert_eq!(bundle.files.len(), 1);
        assert_eq!(bundle.files[0].path, "rules/shared.mdc");
        assert_eq!(bundle.files[0].content, "on linux\n");
        assert_eq!(bundle.files[0].sha256, sha256_hex(b"on linux\n"));
        assert_eq!(bundle.ignore_entries.len(), LOCAL_ONLY_PATTERNS.len());
    }

    #[test]
    fn json_round_trips() {
        let bundle = export(&plan(), &Renderer::new(), metadata()).unwrap();
        let json = bundle.render(ExportFormat::Json).unwrap();
        let back: ExportBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bundle);
    }

    #[test]
    fn profile_has_conan_sections() {
        let bundle = export(&plan(), &Renderer::new(), metadata()).unwrap();
        insta::assert_snapshot!(bundle.to_profile(), @r"
        # mcp-orchestrator 0.1.0 profile for 'openssl' (2026-01-02T03:04:05Z)
        [settings]
        os=Linux
        arch=armv8

        [options]
        mcp-orchestrator/*:project_type=openssl
        mcp-orchestrator/*:platform=linux

        [env]
        MCP_ORCHESTRATOR_PROJECT_TYPE=openssl
        MCP_ORCHESTRATOR_PLATFORM=linux
        CURSOR_CONFIG_FILES=rules/shared.mdc
        # rules/shared.mdc sha256=a29638baa0ebf0a71b8a30a232c50aad4f046555e54fb2897943b0a8c6ca6c3f
        ");
    }

    #[test]
    fn snapshot_reads_deployed_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("rules")).unwrap();
        std::fs::write(dir.path().join("rules/shared.mdc"), "on linux\n").unwrap();
        std::fs::write(dir.path().join("mcp.json"), "{}\n").unwrap();
        let entries: Vec<String> = LOCAL_ONLY_PATTERNS.iter().map(ToString::to_string).collect();
        std::fs::write(dir.path().join(IGNORE_FILE), render_ignore_file(&entries)).unwrap();

        let bundle = snapshot(dir.path(), metadata()).unwrap();

        let paths: Vec<&str> = bundle.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["mcp.json", "rules/shared.mdc"]);
        assert!(bundle.ignore_entries.contains(&"*.log".to_string()));
        assert!(bundle.ignore_entries.contains(&"!mcp.json".to_string()));
    }

    #[test]
    fn metadata_from_context() {
        let env = EnvSnapshot::from_pairs([("USER", "dev")]);
        let exec = MockExecutor::empty();
        let ctx = PlatformDetector::new(&env, &exec)
            .with_overrides(Some("macos"), Some("false"))
            .detect();
        let at = DateTime::parse_from_rfc3339("2026-05-06T07:08:09Z")
            .unwrap()
            .with_timezone(&Utc);
        let m = ExportMetadata::new(&ctx, "generic", at);
        assert_eq!(m.exported_at, "2026-05-06T07:08:09Z");
        assert_eq!(m.platform, "macos");
        assert_eq!(m.project_type, "generic");
    }
}
