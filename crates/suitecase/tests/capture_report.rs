//! Captured output in failure reports.
//!
//! Runs with capture enabled, so this binary holds a single test.

use std::io::{self, Write};

use suitecase::{EngineConfig, Method, Suite, T, TestResult};
use suitecase_harness::StdDriver;

mod support;

use support::{Journal, entries, note, recorded_engine};

struct NoisySuite {
    journal: Journal,
}

impl NoisySuite {
    fn emit(&self, bytes: &[u8]) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout.write_all(bytes).and_then(|()| stdout.flush()) {
            note(&self.journal, format!("write failed: {e}"));
        }
    }

    fn test_noisy_failure(&self, t: &T) -> TestResult {
        self.emit(b"hello from the test");
        t.fatal("noisy failure")
    }

    fn test_quiet_pass(&self, _t: &T) -> TestResult {
        self.emit(b"discarded on success");
        Ok(())
    }
}

impl Suite for NoisySuite {
    fn methods() -> Vec<Method<Self>> {
        vec![
            Method::context("TestNoisyFailure", Self::test_noisy_failure),
            Method::context("TestQuietPass", Self::test_quiet_pass),
        ]
    }
}

#[test]
fn failure_report_includes_captured_output() {
    let journal = Journal::default();
    let (mut engine, recorder) = recorded_engine(EngineConfig::new());
    engine.add_suite(NoisySuite {
        journal: journal.clone(),
    });

    let report = engine.run(&StdDriver::new());

    assert!(!report.passed());
    assert!(entries(&journal).is_empty());
    let failures = recorder.failures();
    let [failure] = failures.as_slice() else {
        panic!("expected one failure, got {failures:?}");
    };
    assert!(
        failure.report.contains("stdout:\nhello from the test"),
        "report was {:?}",
        failure.report
    );
    assert!(!failure.report.contains("discarded on success"));
    assert!(
        recorder
            .events()
            .contains(&"passed:NoisySuite/TestQuietPass".to_owned())
    );
}
