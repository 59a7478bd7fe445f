//! Shared helpers for engine behaviour tests.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use suitecase::{
    Engine, EngineConfig, Plugin, StatsPlugin, SuiteFinishedStats, TestFailedStats,
    TestPassedStats, TestSkippedStats,
};

/// Shared, ordered log written by suites under test.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Appends `entry` to `journal`.
pub fn note(journal: &Journal, entry: impl Into<String>) {
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(entry.into());
}

/// Returns a copy of the journal's entries.
pub fn entries(journal: &Journal) -> Vec<String> {
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Plugin recording every event it receives as a short string.
#[derive(Default)]
pub struct RecordingPlugin {
    events: Mutex<Vec<String>>,
    failures: Mutex<Vec<TestFailedStats>>,
}

impl RecordingPlugin {
    /// Creates an empty recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Returns the recorded events in delivery order.
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the statistics of every failed test.
    pub fn failures(&self) -> Vec<TestFailedStats> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Plugin for RecordingPlugin {
    fn name(&self) -> &str {
        "recorder"
    }

    fn starting(&self) {
        self.push("starting".to_owned());
    }

    fn suite_starting(&self, suite: &str) {
        self.push(format!("suite_starting:{suite}"));
    }

    fn test_starting(&self, suite: &str, test: &str) {
        self.push(format!("test_starting:{suite}/{test}"));
    }

    fn test_passed(&self, suite: &str, test: &str, _stats: &TestPassedStats) {
        self.push(format!("passed:{suite}/{test}"));
    }

    fn test_failed(&self, suite: &str, test: &str, stats: &TestFailedStats) {
        self.push(format!("failed:{suite}/{test}"));
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(stats.clone());
    }

    fn test_skipped(&self, suite: &str, test: &str, _stats: &TestSkippedStats) {
        self.push(format!("skipped:{suite}/{test}"));
    }

    fn suite_finished(&self, suite: &str, _stats: &SuiteFinishedStats) {
        self.push(format!("suite_finished:{suite}"));
    }

    fn finished(&self) {
        self.push("finished".to_owned());
    }
}

/// Builds an engine with a silent stats plugin and a recorder attached.
#[expect(clippy::expect_used, reason = "test helper should fail loudly")]
pub fn recorded_engine(config: EngineConfig) -> (Engine, Arc<RecordingPlugin>) {
    let mut engine = Engine::with_stats(config, StatsPlugin::with_writer(io::sink()));
    let recorder = RecordingPlugin::new();
    engine
        .register_plugin(recorder.clone())
        .expect("recorder has no prefix");
    (engine, recorder)
}
