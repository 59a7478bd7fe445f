//! Per-case handle created by a host driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
struct HostState {
    name: String,
    failed: AtomicBool,
    parallel: AtomicBool,
    log: Mutex<Vec<String>>,
}

/// The host driver's handle for one running case.
///
/// Cloning is cheap and every clone observes the same state, so the handle can
/// be shared with threads the case spawns. The failed flag is monotonic: once
/// set it is never cleared.
///
/// # Examples
///
/// ```
/// use suitecase_harness::HostTest;
///
/// let host = HostTest::new("Suite/TestThing");
/// assert!(!host.failed());
/// host.error("boom");
/// assert!(host.failed());
/// assert_eq!(host.logs(), ["boom"]);
/// ```
#[derive(Clone, Debug)]
pub struct HostTest {
    state: Arc<HostState>,
}

impl HostTest {
    /// Creates a handle for the named case.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(HostState {
                name: name.into(),
                failed: AtomicBool::new(false),
                parallel: AtomicBool::new(false),
                log: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Creates a handle for a nested case named `parent/name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self::new(format!("{}/{name}", self.state.name))
    }

    /// Returns the full case name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Marks the case as failed without stopping it.
    pub fn fail(&self) {
        self.state.failed.store(true, Ordering::SeqCst);
    }

    /// Returns true once the case has failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.state.failed.load(Ordering::SeqCst)
    }

    /// Records a log line and marks the case as failed.
    pub fn error(&self, message: impl Into<String>) {
        self.log(message);
        self.fail();
    }

    /// Appends a line to the case log.
    pub fn log(&self, message: impl Into<String>) {
        self.state
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.into());
    }

    /// Returns a copy of the case log.
    #[must_use]
    pub fn logs(&self) -> Vec<String> {
        self.state
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records that the case asked to run in parallel with its siblings.
    pub fn mark_parallel(&self) {
        self.state.parallel.store(true, Ordering::SeqCst);
    }

    /// Returns true when the case asked to run in parallel.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.state.parallel.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::HostTest;

    #[test]
    fn clones_share_state() {
        let host = HostTest::new("Suite/Test");
        let clone = host.clone();
        clone.fail();
        clone.log("from clone");
        assert!(host.failed());
        assert_eq!(host.logs(), ["from clone"]);
    }

    #[test]
    fn child_names_are_hierarchical_and_independent() {
        let parent = HostTest::new("Suite/Test");
        let child = parent.child("nested");
        assert_eq!(child.name(), "Suite/Test/nested");
        child.fail();
        assert!(!parent.failed());
    }

    #[test]
    fn parallel_marker_is_recorded() {
        let host = HostTest::new("Suite/Test");
        assert!(!host.is_parallel());
        host.mark_parallel();
        assert!(host.is_parallel());
    }
}
