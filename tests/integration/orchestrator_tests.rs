//! Profile run tests.
//!
//! Exercise the uri × policy loop end to end against a temporary docroot.

use crate::mocks::*;
use sitecheck::engine::orchestrator::{Orchestrator, RunRequest};
use sitecheck::engine::sandbox::NullSink;
use sitecheck::report::{select_renderer, OutputDestination, RendererKind};
use sitecheck::{Outcome, RemediationStatus, SiteCheckError, Verbosity};
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

fn request(profile: &str, dir: &TempDir) -> RunRequest {
    RunRequest::new(profile, format!("local:{}", dir.path().display()))
        .with_destination(OutputDestination::File(dir.path().join("report.txt")))
}

#[test]
fn test_single_uri_console_run() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "basic", &["mock.pass", "mock.fail"]);
    let dir = tempfile::tempdir().unwrap();

    let report = Orchestrator::new(&registry)
        .with_progress(Arc::new(RecordingProgress::default()))
        .run(&request("basic", &dir).with_uris(["default"]))
        .unwrap();

    assert_eq!(report.matrix.uris().collect::<Vec<_>>(), vec!["default"]);
    let row = report.matrix.flat().unwrap();
    assert_eq!(row.policies().collect::<Vec<_>>(), vec!["mock.pass", "mock.fail"]);
    assert!(row.get("mock.pass").unwrap().is_successful());
    assert!(!row.get("mock.fail").unwrap().is_successful());
    assert_eq!(
        select_renderer(report.uri_count, report.format).unwrap(),
        RendererKind::ConsoleFlat
    );

    let written = std::fs::read_to_string(dir.path().join("report.txt")).unwrap();
    assert!(written.contains("Always passes"));
    assert!(written.contains("Always fails"));
}

#[test]
fn test_matrix_keys_match_uris() {
    let (mut registry, calls) = mock_registry();
    add_profile(&mut registry, "counted", &["mock.pass", "mock.counter", "mock.uri"]);
    let dir = tempfile::tempdir().unwrap();
    let uris = ["site1", "site2", "site3"];

    let report = Orchestrator::new(&registry)
        .execute(&request("counted", &dir).with_uris(uris))
        .unwrap();

    let keys: BTreeSet<&str> = report.matrix.uris().collect();
    assert_eq!(keys, uris.into_iter().collect());
    for (_, row) in report.matrix.rows() {
        assert_eq!(row.len(), 3);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.summary().total, 9);
}

#[test]
fn test_execution_order_is_uri_major() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "ordered", &["mock.pass", "mock.uri"]);
    let dir = tempfile::tempdir().unwrap();
    let progress = Arc::new(RecordingProgress::default());

    Orchestrator::new(&registry)
        .with_progress(progress.clone())
        .execute(&request("ordered", &dir).with_uris(["a", "b"]))
        .unwrap();

    assert_eq!(
        progress.events(),
        vec![
            "started 4",
            "run a Always passes",
            "done a Always passes",
            "run a Echo uri",
            "done a Echo uri",
            "run b Always passes",
            "done b Always passes",
            "run b Echo uri",
            "done b Echo uri",
            "finished",
        ]
    );
}

#[test]
fn test_each_pair_sees_its_own_uri() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "echo", &["mock.uri"]);
    let dir = tempfile::tempdir().unwrap();

    let report = Orchestrator::new(&registry)
        .execute(&request("echo", &dir).with_uris(["site1", "default", "site2"]))
        .unwrap();

    for uri in ["site1", "default", "site2"] {
        assert_eq!(report.matrix.get(uri, "mock.uri").unwrap().outcome.message(), uri);
    }
    assert_eq!(report.target.uri(), Some("site2"));
}

#[test]
fn test_remediation_replaces_failed_response() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "fix", &["mock.fixable"]);
    let dir = tempfile::tempdir().unwrap();
    let progress = Arc::new(RecordingProgress::default());
    let sink = Arc::new(RecordingSink::default());

    let report = Orchestrator::new(&registry)
        .with_progress(progress.clone())
        .with_logger(sink.clone())
        .execute(&request("fix", &dir).with_remediate(true))
        .unwrap();

    let response = report.matrix.get("default", "mock.fixable").unwrap();
    assert!(response.is_successful());
    assert_eq!(response.outcome.message(), "marker present");
    assert_eq!(
        response.remediation,
        Some(RemediationStatus::Remediated {
            action: "Created fixed.txt".to_string()
        })
    );
    assert!(dir.path().join(FIXED_MARKER).exists());
    assert!(progress.events().contains(&"remediate default Fixable".to_string()));
    assert_eq!(sink.lines(), vec!["INFO mock.fixable default wrote marker"]);
    assert_eq!(report.summary().remediated, 1);
}

#[test]
fn test_no_remediation_when_disabled() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "fix", &["mock.fixable", "mock.fail"]);
    let dir = tempfile::tempdir().unwrap();
    let progress = Arc::new(RecordingProgress::default());

    let report = Orchestrator::new(&registry)
        .with_progress(progress.clone())
        .execute(&request("fix", &dir).with_uris(["a", "b"]))
        .unwrap();

    for response in report.matrix.responses() {
        assert!(!response.is_successful());
        assert_eq!(response.remediation, None);
    }
    assert!(!dir.path().join(FIXED_MARKER).exists());
    assert!(!progress.events().iter().any(|e| e.starts_with("remediate")));
}

#[test]
fn test_unsupported_remediation_keeps_outcome() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "nofix", &["mock.fail"]);
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(&registry);

    let plain = orchestrator.execute(&request("nofix", &dir)).unwrap();
    let remediated = orchestrator
        .execute(&request("nofix", &dir).with_remediate(true))
        .unwrap();

    let before = plain.matrix.get("default", "mock.fail").unwrap();
    let after = remediated.matrix.get("default", "mock.fail").unwrap();
    assert_eq!(after.outcome, before.outcome);
    assert!(!after.remediable);
    assert_eq!(after.remediation, Some(RemediationStatus::Unsupported));
    assert_eq!(remediated.summary().unsupported, 1);
}

#[test]
fn test_failed_remediation_is_recorded() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "broken", &["mock.broken_fix", "mock.pass"]);
    let dir = tempfile::tempdir().unwrap();

    let report = Orchestrator::new(&registry)
        .execute(&request("broken", &dir).with_remediate(true))
        .unwrap();

    let response = report.matrix.get("default", "mock.broken_fix").unwrap();
    assert!(matches!(
        response.remediation,
        Some(RemediationStatus::Failed { ref message }) if message.contains("permission denied")
    ));
    assert!(report.matrix.get("default", "mock.pass").unwrap().is_successful());
    assert_eq!(report.summary().remediation_failed, 1);
}

#[test]
fn test_panicking_check_does_not_stop_the_run() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "panic", &["mock.panics", "mock.pass"]);
    let dir = tempfile::tempdir().unwrap();

    let report = Orchestrator::new(&registry)
        .execute(&request("panic", &dir).with_uris(["a", "b"]))
        .unwrap();

    for uri in ["a", "b"] {
        let response = report.matrix.get(uri, "mock.panics").unwrap();
        assert!(matches!(
            response.outcome,
            Outcome::Error { ref message } if message.contains("check exploded")
        ));
        assert!(report.matrix.get(uri, "mock.pass").unwrap().is_successful());
    }
    assert_eq!(report.summary().errored, 2);
}

#[test]
fn test_empty_profile_still_dispatches() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "empty", &[]);
    let dir = tempfile::tempdir().unwrap();

    let report = Orchestrator::new(&registry)
        .with_progress(Arc::new(RecordingProgress::default()))
        .run(&request("empty", &dir).with_uris(["default"]))
        .unwrap();

    assert_eq!(report.matrix.uri_count(), 1);
    assert!(report.matrix.flat().unwrap().is_empty());
    assert_eq!(report.target.uri(), None);
    assert!(dir.path().join("report.txt").exists());
}

#[test]
fn test_duplicate_uri_overwrites_in_place() {
    let (mut registry, calls) = mock_registry();
    add_profile(&mut registry, "counted", &["mock.counter"]);
    let dir = tempfile::tempdir().unwrap();

    let report = Orchestrator::new(&registry)
        .execute(&request("counted", &dir).with_uris(["a", "b", "a"]))
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.matrix.uris().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(report.matrix.get("a", "mock.counter").unwrap().outcome.message(), "call 3");
    assert_eq!(report.uri_count, 3);
}

#[test]
fn test_invalid_format_runs_nothing() {
    let (mut registry, calls) = mock_registry();
    add_profile(&mut registry, "counted", &["mock.counter"]);
    let dir = tempfile::tempdir().unwrap();
    let progress = Arc::new(RecordingProgress::default());

    let err = Orchestrator::new(&registry)
        .with_progress(progress.clone())
        .run(&request("counted", &dir).with_format("xml"))
        .unwrap_err();

    assert_eq!(err.to_string(), "Reporting format 'xml' is not supported");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(progress.events().is_empty());
    assert!(!dir.path().join("report.txt").exists());
}

#[test]
fn test_unknown_profile_runs_nothing() {
    let (registry, calls) = mock_registry();
    let dir = tempfile::tempdir().unwrap();

    let err = Orchestrator::new(&registry)
        .run(&request("missing", &dir))
        .unwrap_err();

    assert!(matches!(err, SiteCheckError::ProfileNotFound(ref p) if p == "missing"));
    assert_eq!(err.to_string(), "missing is not a valid profile");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_missing_docroot_is_invalid_target() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "basic", &["mock.pass"]);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let err = Orchestrator::new(&registry)
        .execute(&RunRequest::new("basic", format!("local:{}", missing.display())))
        .unwrap_err();

    assert!(err.is_configuration());
}

#[test]
fn test_progress_suppressed_for_machine_output_on_stdout() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "basic", &["mock.pass"]);
    let dir = tempfile::tempdir().unwrap();
    let progress = Arc::new(RecordingProgress::default());
    let orchestrator = Orchestrator::new(&registry).with_progress(progress.clone());

    let stdout_json = RunRequest::new("basic", format!("local:{}", dir.path().display()))
        .with_format("json");
    orchestrator.execute(&stdout_json).unwrap();
    assert!(progress.events().is_empty());

    let debug_console = request("basic", &dir).with_verbosity(Verbosity::Debug);
    orchestrator.execute(&debug_console).unwrap();
    assert!(progress.events().is_empty());

    let file_json = request("basic", &dir).with_format("json");
    orchestrator.execute(&file_json).unwrap();
    assert_eq!(progress.events().first().map(String::as_str), Some("started 1"));
}

#[test]
fn test_broken_sink_does_not_affect_outcome() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "echo", &["mock.uri", "mock.fixable"]);
    let dir = tempfile::tempdir().unwrap();

    let broken = Orchestrator::new(&registry)
        .with_logger(Arc::new(BrokenSink))
        .execute(&request("echo", &dir).with_remediate(true))
        .unwrap();
    std::fs::remove_file(dir.path().join(FIXED_MARKER)).unwrap();
    let silent = Orchestrator::new(&registry)
        .with_logger(Arc::new(NullSink))
        .execute(&request("echo", &dir).with_remediate(true))
        .unwrap();

    for policy in ["mock.uri", "mock.fixable"] {
        let a = broken.matrix.get("default", policy).unwrap();
        let b = silent.matrix.get("default", policy).unwrap();
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.remediation, b.remediation);
    }
}

#[test]
fn test_traversing_uri_cannot_touch_files_outside_docroot() {
    use sitecheck::profile::{params, Profile};
    use sitecheck::registry::Registry;

    let mut registry = Registry::builtin().unwrap();
    registry
        .register_profile(
            Profile::new("cleanup", "Cleanup")
                .bind("fs.file_absent", params([("path", "sites/{uri}/victim.txt")]))
                .unwrap(),
        )
        .unwrap();
    let outer = tempfile::tempdir().unwrap();
    let docroot = outer.path().join("docroot");
    std::fs::create_dir_all(docroot.join("sites")).unwrap();
    let victim = outer.path().join("victim.txt");
    std::fs::write(&victim, "keep me").unwrap();

    let request = RunRequest::new("cleanup", format!("local:{}", docroot.display()))
        .with_uris(["../.."])
        .with_remediate(true)
        .with_verbosity(Verbosity::Debug);
    let report = Orchestrator::new(&registry).execute(&request).unwrap();

    let response = report.matrix.get("../..", "fs.file_absent").unwrap();
    assert!(matches!(response.outcome, Outcome::Error { ref message } if message.contains("inside the target root")));
    assert!(!matches!(response.remediation, Some(RemediationStatus::Remediated { .. })));
    assert!(victim.exists());
}
