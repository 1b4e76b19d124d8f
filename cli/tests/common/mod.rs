// Shared helpers for integration tests.
//
// Provides a temporary project directory, a recording logger, and a fake
// executor so each integration test can run the deployment workflow in
// isolation from the host it runs on.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, bail};
use orchestrator_cli::cli::GlobalOpts;
use orchestrator_cli::config::{EnvSnapshot, Settings};
use orchestrator_cli::exec::{ExecResult, Executor};
use orchestrator_cli::logging::{FileStatus, Log};

/// Templates shipped with the crate.
pub fn shipped_templates() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/cursor-rules")
}

/// [`Log`] that keeps every message as `level: message`.
#[derive(Debug, Default)]
pub struct RecordingLog {
    lines: Mutex<Vec<String>>,
}

impl RecordingLog {
    fn push(&self, level: &str, msg: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("{level}: {msg}"));
        }
    }

    /// Every message logged so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl Log for RecordingLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("dry_run", msg);
    }
    fn record_file(&self, target: &str, status: FileStatus, _message: Option<&str>) {
        self.push("file", &format!("{target} {}", status.label()));
    }
}

/// [`Executor`] that reports a fixed set of tools and runs nothing.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    tools: Vec<String>,
}

impl FakeExecutor {
    /// An executor on whose `PATH` only `tools` exist.
    pub fn with_tools(tools: &[&str]) -> Self {
        Self {
            tools: tools.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Executor for FakeExecutor {
    fn run(&self, program: &str, _args: &[&str]) -> Result<ExecResult> {
        bail!("{program} is not available in tests")
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.run(program, args)
    }

    fn which(&self, program: &str) -> bool {
        self.tools.iter().any(|t| t == program)
    }
}

/// An isolated project directory backed by a [`tempfile::TempDir`].
pub struct TestProject {
    /// Temporary project root; `.cursor/` is created below it.
    pub root: tempfile::TempDir,
    /// Flags passed to every resolution.
    pub global: GlobalOpts,
    env: BTreeMap<String, String>,
}

impl TestProject {
    /// A project using the shipped templates, pinned to Linux outside CI.
    pub fn new() -> Self {
        TestProjectBuilder::new().build()
    }

    /// Path to the project root.
    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Path to the deployed `.cursor` directory.
    pub fn cursor_dir(&self) -> PathBuf {
        self.root.path().join(".cursor")
    }

    /// Read a deployed file relative to `.cursor`.
    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.cursor_dir().join(rel))
            .unwrap_or_else(|e| panic!("read {rel}: {e}"))
    }

    /// Resolve settings for the current flags and environment.
    pub fn settings(&self) -> Settings {
        let env = EnvSnapshot::from_pairs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Settings::resolve(&self.global.overrides(), env, self.root.path(), None)
            .expect("resolve settings")
    }

    /// Relative paths of every file below `.cursor`, sorted.
    pub fn deployed_files(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect(&self.cursor_dir(), &self.cursor_dir(), &mut out);
        out.sort();
        out
    }

    /// `(path, content)` for every file below `.cursor`.
    pub fn tree(&self) -> Vec<(String, String)> {
        self.deployed_files()
            .into_iter()
            .map(|rel| {
                let content = self.read(&rel);
                (rel, content)
            })
            .collect()
    }
}

fn collect(base: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(base, &path, out);
        } else if let Ok(rel) = path.strip_prefix(base) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// Fluent builder for [`TestProject`].
pub struct TestProjectBuilder {
    project: TestProject,
}

impl TestProjectBuilder {
    /// Begin with the shipped templates, `--platform linux`, `--no-ci`, and
    /// a minimal login environment.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let global = GlobalOpts {
            templates: Some(shipped_templates()),
            platform: Some("linux".to_string()),
            no_ci: true,
            ..GlobalOpts::default()
        };
        let env = [
            ("HOME", "/home/dev"),
            ("USER", "dev"),
            ("SHELL", "/bin/bash"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            project: TestProject { root, global, env },
        }
    }

    /// Use `project_type`.
    pub fn project_type(mut self, project_type: &str) -> Self {
        self.project.global.project_type = Some(project_type.to_string());
        self
    }

    /// Pretend to run on `platform`.
    pub fn platform(mut self, platform: &str) -> Self {
        self.project.global.platform = Some(platform.to_string());
        self
    }

    /// Pretend to run on a GitHub Actions runner.
    pub fn in_ci(mut self) -> Self {
        self.project.global.no_ci = false;
        self.project.global.ci = true;
        self.env("GITHUB_ACTIONS", "true")
    }

    /// Set an environment variable.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.project.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Adjust the global flags.
    pub fn flags(mut self, f: impl FnOnce(&mut GlobalOpts)) -> Self {
        f(&mut self.project.global);
        self
    }

    /// Write `content` to `<root>/<rel>`, creating parent directories.
    pub fn file(self, rel: &str, content: &str) -> Self {
        let path = self.project.root.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write fixture file");
        self
    }

    /// Use the templates under `<root>/<rel>` instead of the shipped ones.
    pub fn templates_at(mut self, rel: &str) -> Self {
        self.project.global.templates = Some(self.project.root.path().join(rel));
        self
    }

    /// Finalise the project.
    pub fn build(self) -> TestProject {
        self.project
    }
}
