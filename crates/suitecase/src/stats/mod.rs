//! Built-in plugin tallying test outcomes per suite.

#[cfg(feature = "diagnostics")]
pub mod json;

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::plugin::{Plugin, TestFailedStats, TestPassedStats, TestSkippedStats};
#[cfg(feature = "diagnostics")]
use crate::plugin::{PluginOption, PluginOptions};

/// Outcome counts for one suite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(serde::Serialize))]
pub struct SuiteTally {
    /// Tests that passed.
    pub passed: usize,
    /// Tests that failed.
    pub failed: usize,
    /// Tests that were skipped.
    pub skipped: usize,
}

impl SuiteTally {
    /// Returns the number of tests that reached a terminal event.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Aggregates pass, fail and skip counts and prints them when the run ends.
///
/// Registered automatically by every [`Engine`](crate::Engine). With the
/// `diagnostics` feature the plugin owns the `stats` option prefix and
/// `stats.json=<path>` additionally writes the tallies as JSON.
///
/// # Examples
///
/// ```
/// use suitecase::{Plugin, StatsPlugin, TestPassedStats};
///
/// let stats = StatsPlugin::with_writer(Vec::new());
/// stats.suite_starting("Cart");
/// stats.test_passed("Cart", "TestTotal", &TestPassedStats::default());
/// assert_eq!(stats.tally("Cart").map(|t| t.total()), Some(1));
/// assert!(stats.render_summary().contains("Cart - Total: 1, Passed: 1"));
/// ```
pub struct StatsPlugin {
    suites: Mutex<BTreeMap<String, SuiteTally>>,
    out: Mutex<Box<dyn Write + Send>>,
    #[cfg(feature = "diagnostics")]
    json_path: Mutex<Option<std::path::PathBuf>>,
}

impl StatsPlugin {
    /// Creates a plugin printing its summary to standard output.
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Creates a plugin printing its summary to `out`.
    #[must_use]
    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            suites: Mutex::new(BTreeMap::new()),
            out: Mutex::new(Box::new(out)),
            #[cfg(feature = "diagnostics")]
            json_path: Mutex::new(None),
        }
    }

    /// Returns the counts recorded for `suite`.
    #[must_use]
    pub fn tally(&self, suite: &str) -> Option<SuiteTally> {
        self.suites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(suite)
            .copied()
    }

    /// Returns a copy of every suite's counts, sorted by suite name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, SuiteTally> {
        self.suites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Renders the `Suite Results:` table, or nothing when no suite ran.
    #[must_use]
    pub fn render_summary(&self) -> String {
        let suites = self.snapshot();
        if suites.is_empty() {
            return String::new();
        }
        let mut out = String::from("\nSuite Results:\n--------------\n");
        for (name, tally) in &suites {
            let _ = writeln!(
                out,
                "{name} - Total: {}, Passed: {}, Failed: {}, Skipped: {}",
                tally.total(),
                tally.passed,
                tally.failed,
                tally.skipped
            );
        }
        out.push('\n');
        out
    }

    fn update(&self, suite: &str, apply: impl FnOnce(&mut SuiteTally)) {
        let mut suites = self.suites.lock().unwrap_or_else(PoisonError::into_inner);
        apply(suites.entry(suite.to_owned()).or_default());
    }

    #[cfg(feature = "diagnostics")]
    fn write_json(&self) {
        let path = self
            .json_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(path) = path else {
            return;
        };
        let written = std::fs::File::create(&path)
            .map_err(|e| e.to_string())
            .and_then(|mut file| json::write(&mut file, &self.snapshot()).map_err(|e| e.to_string()));
        if let Err(e) = written {
            log::warn!("failed to write suite statistics to {}: {e}", path.display());
        }
    }
}

impl Default for StatsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatsPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsPlugin")
            .field("suites", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Plugin for StatsPlugin {
    fn name(&self) -> &str {
        "Test Stats"
    }

    #[cfg(feature = "diagnostics")]
    fn options(&self) -> Option<PluginOptions> {
        Some(PluginOptions::new("stats").with(
            "json",
            PluginOption::new("Write per-suite totals as JSON to this path", ""),
        ))
    }

    #[cfg(feature = "diagnostics")]
    fn set_option(&self, name: &str, value: &str) {
        match name {
            "json" if !value.is_empty() => {
                *self.json_path.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.into());
            }
            _ => log::warn!("ignoring unknown stats option {name}={value}"),
        }
    }

    fn suite_starting(&self, suite: &str) {
        // Suites without any test still appear in the results.
        self.update(suite, |_| {});
    }

    fn test_passed(&self, suite: &str, _test: &str, _stats: &TestPassedStats) {
        self.update(suite, |tally| tally.passed += 1);
    }

    fn test_failed(&self, suite: &str, _test: &str, _stats: &TestFailedStats) {
        self.update(suite, |tally| tally.failed += 1);
    }

    fn test_skipped(&self, suite: &str, _test: &str, _stats: &TestSkippedStats) {
        self.update(suite, |tally| tally.skipped += 1);
    }

    fn finished(&self) {
        let summary = self.render_summary();
        if !summary.is_empty() {
            let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = out.write_all(summary.as_bytes()).and_then(|()| out.flush()) {
                log::warn!("failed to print suite results: {e}");
            }
        }
        #[cfg(feature = "diagnostics")]
        self.write_json();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{PluginBus, PluginEvent};
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        #[expect(clippy::expect_used, reason = "test should fail loudly")]
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().expect("buffer lock").clone()).expect("utf8")
        }
    }

    impl Write for SharedBuffer {
        #[expect(clippy::expect_used, reason = "test should fail loudly")]
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("buffer lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[fixture]
    fn buffer() -> SharedBuffer {
        SharedBuffer::default()
    }

    #[rstest]
    #[expect(clippy::expect_used, reason = "test should fail loudly")]
    fn tallies_three_passed_one_failed_two_skipped(buffer: SharedBuffer) {
        let stats = Arc::new(StatsPlugin::with_writer(buffer.clone()));
        let mut bus = PluginBus::new();
        bus.register(stats.clone(), &[]).expect("register stats");

        bus.emit(PluginEvent::SuiteStarting { suite: "Checkout" });
        let passed = TestPassedStats::default();
        let failed = TestFailedStats::default();
        let skipped = TestSkippedStats::default();
        for test in ["TestA", "TestB", "TestC"] {
            bus.emit(PluginEvent::TestPassed { suite: "Checkout", test, stats: &passed });
        }
        bus.emit(PluginEvent::TestFailed { suite: "Checkout", test: "TestD", stats: &failed });
        for test in ["TestE", "TestF"] {
            bus.emit(PluginEvent::TestSkipped { suite: "Checkout", test, stats: &skipped });
        }
        bus.emit(PluginEvent::Finished);

        let tally = stats.tally("Checkout").expect("tally");
        assert_eq!(
            tally,
            SuiteTally {
                passed: 3,
                failed: 1,
                skipped: 2
            }
        );
        assert_eq!(tally.total(), 6);
        assert_eq!(
            buffer.contents(),
            "\nSuite Results:\n--------------\n\
             Checkout - Total: 6, Passed: 3, Failed: 1, Skipped: 2\n\n"
        );
    }

    #[rstest]
    #[expect(clippy::expect_used, reason = "test should fail loudly")]
    fn empty_suites_are_listed_in_sorted_order(buffer: SharedBuffer) {
        let stats = StatsPlugin::with_writer(buffer.clone());
        stats.suite_starting("Zed");
        stats.suite_starting("Alpha");
        stats.finished();
        let contents = buffer.contents();
        let alpha = contents.find("Alpha - Total: 0").expect("alpha line");
        let zed = contents.find("Zed - Total: 0").expect("zed line");
        assert!(alpha < zed);
    }

    #[rstest]
    fn nothing_is_printed_without_suites(buffer: SharedBuffer) {
        StatsPlugin::with_writer(buffer.clone()).finished();
        assert!(buffer.contents().is_empty());
    }

    #[cfg(feature = "diagnostics")]
    #[rstest]
    #[expect(clippy::expect_used, reason = "test should fail loudly")]
    fn json_option_writes_summary_file(buffer: SharedBuffer) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stats.json");
        let stats = Arc::new(StatsPlugin::with_writer(buffer));
        let mut bus = PluginBus::new();
        let option = format!("stats.json={}", path.display());
        bus.register(stats.clone(), &[option]).expect("register stats");

        stats.suite_starting("Checkout");
        stats.test_failed("Checkout", "TestD", &TestFailedStats::default());
        stats.finished();

        let written = std::fs::read_to_string(&path).expect("json file");
        let value: serde_json::Value = serde_json::from_str(&written).expect("valid json");
        assert_eq!(value["suites"]["Checkout"]["failed"], 1);
        assert_eq!(value["suites"]["Checkout"]["total"], 1);
    }
}
