#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for exporting a configuration.
//!
//! A bundle rendered from the plan must match what `deploy` writes, and a
//! snapshot of a deployed directory must round back to the same files.

mod common;

use chrono::{TimeZone, Utc};
use common::{FakeExecutor, RecordingLog, TestProject, TestProjectBuilder};
use orchestrator_cli::cli::ExportConfigOpts;
use orchestrator_cli::commands::export_config;
use orchestrator_cli::export::{self, ExportBundle, ExportFormat, ExportMetadata};
use orchestrator_cli::resources::helpers::fs::sha256_hex;
use orchestrator_cli::templates::Renderer;
use orchestrator_cli::workflow;

fn metadata(project: &TestProject) -> ExportMetadata {
    let settings = project.settings();
    let ctx = workflow::detect(&settings, &FakeExecutor::default(), &RecordingLog::default());
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    ExportMetadata::new(&ctx, &settings.project_type, at)
}

fn rendered_bundle(project: &TestProject) -> ExportBundle {
    let settings = project.settings();
    let log = RecordingLog::default();
    let ctx = workflow::detect(&settings, &FakeExecutor::default(), &log);
    let plan = workflow::prepare(&settings, &ctx, &log).expect("plan");
    export::export(&plan, &Renderer::new(), metadata(project)).expect("export")
}

fn sorted(bundle: &ExportBundle) -> Vec<(String, String)> {
    let mut files: Vec<_> = bundle
        .files
        .iter()
        .map(|f| (f.path.clone(), f.content.clone()))
        .collect();
    files.sort();
    files
}

#[test]
fn export_writes_nothing() {
    let project = TestProject::new();
    let bundle = rendered_bundle(&project);

    assert!(!bundle.files.is_empty());
    assert!(!project.cursor_dir().exists());
}

#[test]
fn export_matches_deploy() {
    let project = TestProjectBuilder::new().project_type("openssl").build();
    let bundle = rendered_bundle(&project);

    workflow::deploy(&project.settings(), &FakeExecutor::default(), &RecordingLog::default())
        .expect("deploy");
    let snapshot = export::snapshot(&project.cursor_dir(), metadata(&project)).expect("snapshot");

    assert_eq!(sorted(&bundle), sorted(&snapshot));
    for entry in &bundle.ignore_entries {
        assert!(snapshot.ignore_entries.contains(entry), "{entry}");
    }
    for file in &snapshot.files {
        assert_eq!(file.sha256, sha256_hex(file.content.as_bytes()), "{}", file.path);
    }
}

#[test]
fn json_bundle_carries_metadata() {
    let project = TestProjectBuilder::new().project_type("openssl").build();
    let json = rendered_bundle(&project)
        .render(ExportFormat::Json)
        .expect("json");

    let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
    assert_eq!(value["metadata"]["project_type"], "openssl");
    assert_eq!(value["metadata"]["platform"], "linux");
    assert_eq!(value["metadata"]["user"], "dev");
    assert_eq!(value["metadata"]["exported_at"], "2024-05-01T12:00:00Z");
    assert!(
        value["files"]
            .as_array()
            .expect("files")
            .iter()
            .any(|f| f["path"] == "mcp.json")
    );
}

#[test]
fn profile_lists_every_file() {
    let project = TestProject::new();
    let bundle = rendered_bundle(&project);
    let profile = bundle.render(ExportFormat::Profile).expect("profile");

    assert!(profile.contains("[settings]\nos=Linux\n"));
    assert!(profile.contains("mcp-orchestrator/*:project_type=generic"));
    for file in &bundle.files {
        assert!(
            profile.contains(&format!("# {} sha256={}", file.path, file.sha256)),
            "{} missing from profile",
            file.path
        );
    }
}

// ---------------------------------------------------------------------------
// Output file
// ---------------------------------------------------------------------------

fn to_file(project: &TestProject, name: &str) -> ExportConfigOpts {
    ExportConfigOpts {
        output: Some(project.root_path().join(name)),
        ..ExportConfigOpts::default()
    }
}

#[test]
fn output_file_is_written() {
    let project = TestProject::new();
    let opts = to_file(&project, "bundle.json");
    let log = RecordingLog::default();

    export_config::export_with(&project.settings(), &opts, &FakeExecutor::default(), &log)
        .expect("export");

    let written = std::fs::read_to_string(project.root_path().join("bundle.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).expect("json");
    assert_eq!(value["metadata"]["project_type"], "generic");
    assert!(log.contains("exported"));
}

#[test]
fn dry_run_does_not_write_output_file() {
    let project = TestProjectBuilder::new().flags(|g| g.dry_run = true).build();
    let opts = to_file(&project, "bundle.json");
    let log = RecordingLog::default();

    export_config::export_with(&project.settings(), &opts, &FakeExecutor::default(), &log)
        .expect("export");

    assert!(!project.root_path().join("bundle.json").exists());
    assert!(!project.cursor_dir().exists());
    assert!(log.contains("dry_run: would create"));
    assert!(!log.contains("exported"));
}

#[test]
fn existing_output_needs_force() {
    let project = TestProjectBuilder::new()
        .file("bundle.json", "keep me\n")
        .build();
    let opts = to_file(&project, "bundle.json");

    let err = export_config::export_with(
        &project.settings(),
        &opts,
        &FakeExecutor::default(),
        &RecordingLog::default(),
    )
    .expect_err("refuses to overwrite");

    assert!(err.to_string().contains("--force"), "{err}");
    assert_eq!(
        std::fs::read_to_string(project.root_path().join("bundle.json")).unwrap(),
        "keep me\n"
    );
}
