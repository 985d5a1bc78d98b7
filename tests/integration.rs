use std::fs;
use std::path::Path;
use std::time::Duration;

use spectest::parser;
use spectest::Runner;
use spectest::RunnerConfig;
use spectest::RunnerConfigBuilder;

fn run_fixture(name: &str) -> spectest::RunReport {
    run_fixture_with(name, RunnerConfig::default())
}

fn run_fixture_with(name: &str, config: RunnerConfig) -> spectest::RunReport {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name);
    let text = fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {path:?}: {e}"));
    let doc = parser::parse(&text, &path).unwrap_or_else(|e| panic!("parsing {path:?}: {e}"));
    Runner::new(doc, config).run(None)
}

#[test]
fn batch_success_with_substring_stdout() {
    let report = run_fixture("batch_success.spec");
    assert!(report.all_passed(), "{:?}", report.outcomes);
}

#[test]
fn negative_polarity_expects_failure() {
    let report = run_fixture("expected_failure.spec");
    assert!(report.all_passed(), "{:?}", report.outcomes);
}

#[test]
fn captures_and_compares_variable() {
    let report = run_fixture("variable_capture.spec");
    assert!(report.all_passed(), "{:?}", report.outcomes);
}

#[test]
fn file_written_and_matched_exactly() {
    let report = run_fixture("file_exact_match.spec");
    assert!(report.all_passed(), "{:?}", report.outcomes);
}

#[test]
fn snippet_is_reexpanded_with_isolated_state() {
    let report = run_fixture("snippet_reuse.spec");
    assert!(report.all_passed(), "{:?}", report.outcomes);
    assert_eq!(report.outcomes.len(), 3);
}

#[test]
fn empty_content_block_creates_a_zero_byte_file() {
    let report = run_fixture("empty_content_block.spec");
    assert!(report.all_passed(), "{:?}", report.outcomes);
}

#[test]
#[cfg(unix)]
fn interactive_expect_send_round_trip() {
    let report = run_fixture("interactive_session.spec");
    assert!(report.all_passed(), "{:?}", report.outcomes);
}

#[test]
fn shell_timeout_fails_the_test_without_aborting_the_run() {
    let text = "> sleeps past its timeout\n$. sleep 5\n?. stdout \"\"\n> runs afterward\n$. true\n";
    let doc = parser::parse(text, Path::new("timeout.spec")).unwrap();
    let config = RunnerConfigBuilder::default()
        .shell_timeout(Duration::from_millis(200))
        .finish()
        .unwrap();
    let report = Runner::new(doc, config).run(None);
    assert_eq!(report.outcomes.len(), 2);
    assert!(!report.outcomes[0].passed);
    assert!(report.outcomes[1].passed);
}

#[test]
fn parse_error_reports_file_and_line() {
    let err = parser::parse("> t\n~ bogus\n", Path::new("bad.spec")).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("bad.spec"));
    assert!(message.contains(":2:"));
}
