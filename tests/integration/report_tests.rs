//! Report dispatch tests.

use crate::mocks::*;
use sitecheck::engine::orchestrator::{Orchestrator, RunRequest};
use sitecheck::report::{OutputDestination, ReportDispatcher};
use sitecheck::{Format, SiteCheckError};
use tempfile::TempDir;

fn request(profile: &str, dir: &TempDir, format: &str, file: &str) -> RunRequest {
    RunRequest::new(profile, format!("local:{}", dir.path().display()))
        .with_format(format)
        .with_destination(OutputDestination::File(dir.path().join(file)))
}

#[test]
fn test_multi_uri_html_written_to_file() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "site", &["mock.uri"]);
    let dir = tempfile::tempdir().unwrap();

    let report = Orchestrator::new(&registry)
        .run(&request("site", &dir, "html", "out.html").with_uris(["site1", "site2"]))
        .unwrap();

    assert_eq!(report.matrix.uris().collect::<Vec<_>>(), vec!["site1", "site2"]);
    let html = std::fs::read_to_string(dir.path().join("out.html")).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<h2>site1</h2>"));
    assert!(html.contains("<h2>site2</h2>"));
    assert!(html.contains("Overview"));
}

#[test]
fn test_multi_uri_json_is_rejected_after_checks_run() {
    let (mut registry, calls) = mock_registry();
    add_profile(&mut registry, "counted", &["mock.counter"]);
    let dir = tempfile::tempdir().unwrap();

    let err = Orchestrator::new(&registry)
        .run(&request("counted", &dir, "json", "out.json").with_uris(["site1", "site2"]))
        .unwrap_err();

    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert!(!dir.path().join("out.json").exists());
    assert!(!err.is_configuration());
    assert!(matches!(
        err,
        SiteCheckError::Dispatch { ref source, .. }
            if matches!(**source, SiteCheckError::UnsupportedCombination { uri_count: 2, format: Format::Json })
    ));

    let report = err.into_report().unwrap();
    assert_eq!(report.matrix.uri_count(), 2);
    assert_eq!(report.summary().passed, 2);
}

#[test]
fn test_rejected_run_can_be_dispatched_as_html() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "site", &["mock.pass"]);
    let dir = tempfile::tempdir().unwrap();

    let err = Orchestrator::new(&registry)
        .run(&request("site", &dir, "json", "out.json").with_uris(["a", "b"]))
        .unwrap_err();
    let report = err.into_report().unwrap().with_format(Format::Html);

    let destination = OutputDestination::File(dir.path().join("out.html"));
    report.dispatch(&ReportDispatcher::default(), &destination).unwrap();

    let html = std::fs::read_to_string(dir.path().join("out.html")).unwrap();
    assert!(html.contains("<h2>a</h2>"));
    assert!(!dir.path().join("out.json").exists());
}

#[test]
fn test_single_uri_json_document() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "mixed", &["mock.pass", "mock.fail"]);
    let dir = tempfile::tempdir().unwrap();

    Orchestrator::new(&registry)
        .run(&request("mixed", &dir, "json", "out.json").with_uris(["site1"]))
        .unwrap();

    let text = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["profile"]["name"], "mixed");
    assert_eq!(json["target"]["uri"], "site1");
    assert_eq!(json["summary"]["passed"], 1);
    assert_eq!(json["summary"]["failed"], 1);

    assert_eq!(json["results"].as_object().unwrap().len(), 2);
    let pass_at = text.find("\"mock.pass\"").unwrap();
    let fail_at = text.find("\"mock.fail\"").unwrap();
    assert!(pass_at < fail_at);
}

#[test]
fn test_multi_uri_console_overview() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "site", &["mock.pass", "mock.fail"]);
    let dir = tempfile::tempdir().unwrap();

    let report = Orchestrator::new(&registry)
        .execute(&request("site", &dir, "console", "unused.txt").with_uris(["one", "two"]))
        .unwrap();
    let text = ReportDispatcher::default().render(&report, false).unwrap();

    assert!(text.contains("one"));
    assert!(text.contains("two"));
    assert!(text.contains("OVERVIEW"));
    assert!(!text.contains("\x1b["));
}

#[test]
fn test_unwritable_destination_keeps_results() {
    let (mut registry, _) = mock_registry();
    add_profile(&mut registry, "site", &["mock.pass"]);
    let dir = tempfile::tempdir().unwrap();

    let err = Orchestrator::new(&registry)
        .run(&request("site", &dir, "html", "missing/dir/out.html"))
        .unwrap_err();

    assert!(matches!(
        err,
        SiteCheckError::Dispatch { ref source, .. } if matches!(**source, SiteCheckError::Io(_))
    ));
    assert_eq!(err.into_report().unwrap().summary().passed, 1);
}
