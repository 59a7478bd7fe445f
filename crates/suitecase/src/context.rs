//! The per-test context handed to lifecycle hooks and test procedures.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use suitecase_harness::HostTest;

use crate::signal::{FailureSignal, Signal, SkipSignal, TestResult, recover};

/// Hierarchical name of a running test: `suite/test[/nested...]`.
///
/// # Examples
///
/// ```
/// use suitecase::TestName;
///
/// let name = TestName::new("CartSuite", "TestTotals").child("empty cart");
/// assert_eq!(name.to_string(), "CartSuite/TestTotals/empty cart");
/// assert_eq!(name.suite(), "CartSuite");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TestName {
    suite: String,
    tests: Vec<String>,
}

impl TestName {
    /// Creates the name of a top-level test.
    #[must_use]
    pub fn new(suite: impl Into<String>, test: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            tests: vec![test.into()],
        }
    }

    /// Returns the name of a nested test below this one.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut tests = self.tests.clone();
        tests.push(name.into());
        Self {
            suite: self.suite.clone(),
            tests,
        }
    }

    /// Returns the suite component.
    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Returns the test components below the suite.
    #[must_use]
    pub fn tests(&self) -> &[String] {
        &self.tests
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suite)?;
        for test in &self.tests {
            write!(f, "/{test}")?;
        }
        Ok(())
    }
}

/// Counts outstanding background work registered by a test.
#[derive(Debug, Default)]
struct Tracker {
    pending: Mutex<usize>,
    idle: Condvar,
}

impl Tracker {
    fn acquire(&self) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn release(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    fn wait(&self) {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let _idle = self
            .idle
            .wait_while(pending, |pending| *pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

#[derive(Debug)]
struct Inner {
    name: TestName,
    host: HostTest,
    skipped: AtomicBool,
    failure: Mutex<Option<FailureSignal>>,
    skip_message: Mutex<Option<String>>,
    tracker: Arc<Tracker>,
}

/// Test context passed to `SetUpTest`, `TearDownTest` and test procedures.
///
/// The failed and skipped flags are monotonic. Clones share state, so a
/// context may be moved into threads spawned by the test; such threads must
/// hold a [`BackgroundHandle`] so the runner waits for them before teardown.
///
/// There is no runtime call to opt into parallel execution. A test runs
/// alongside its siblings when declared with [`Method::parallel`] or when its
/// suite returns true from [`Suite::parallel`]; [`T::is_parallel`] reports the
/// outcome.
///
/// [`Method::parallel`]: crate::Method::parallel
/// [`Suite::parallel`]: crate::Suite::parallel
///
/// # Examples
///
/// ```
/// use suitecase::{TestName, T};
/// use suitecase_harness::HostTest;
///
/// let t = T::new(TestName::new("Demo", "TestLogs"), HostTest::new("Demo/TestLogs"));
/// t.log("checking totals");
/// t.error("total was 3");
/// assert!(t.failed());
/// assert_eq!(t.logs(), ["checking totals", "total was 3"]);
/// ```
#[derive(Clone, Debug)]
pub struct T {
    inner: Arc<Inner>,
}

impl T {
    /// Creates a context bound to the host driver's handle for the same test.
    #[must_use]
    pub fn new(name: TestName, host: HostTest) -> Self {
        Self::with_tracker(name, host, Arc::default())
    }

    fn with_tracker(name: TestName, host: HostTest, tracker: Arc<Tracker>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                host,
                skipped: AtomicBool::new(false),
                failure: Mutex::new(None),
                skip_message: Mutex::new(None),
                tracker,
            }),
        }
    }

    /// Returns the full hierarchical name.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.name.to_string()
    }

    /// Returns the structured name.
    #[must_use]
    pub fn test_name(&self) -> &TestName {
        &self.inner.name
    }

    /// Returns the host driver's handle for this test.
    ///
    /// Legacy procedures receive this handle directly; it shares the failed
    /// flag and log with the context.
    #[must_use]
    pub fn host(&self) -> &HostTest {
        &self.inner.host
    }

    /// Appends a line to the test log.
    pub fn log(&self, message: impl Into<String>) {
        self.inner.host.log(message);
    }

    /// Returns the log lines in the order they were written.
    #[must_use]
    pub fn logs(&self) -> Vec<String> {
        self.inner.host.logs()
    }

    /// Logs `message` and marks the test failed without stopping it.
    pub fn error(&self, message: impl Into<String>) {
        self.inner.host.error(message);
    }

    /// Marks the test failed without stopping it.
    pub fn fail(&self) {
        self.inner.host.fail();
    }

    /// Returns true once the test has failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.inner.host.failed()
    }

    /// Marks the test failed and stops it.
    ///
    /// # Errors
    ///
    /// Always returns a failure [`Signal`] to be propagated with `?`.
    #[track_caller]
    pub fn fail_now(&self) -> TestResult {
        self.fail();
        Err(FailureSignal::capture("").into())
    }

    /// Marks the test failed and stops it with `message`.
    ///
    /// # Errors
    ///
    /// Always returns a failure [`Signal`] to be propagated with `?`.
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>) -> TestResult {
        self.fail();
        Err(FailureSignal::capture(message).into())
    }

    /// Marks the test skipped and stops it, logging `message`.
    ///
    /// # Errors
    ///
    /// Always returns a skip [`Signal`] to be propagated with `?`.
    pub fn skip(&self, message: impl Into<String>) -> TestResult {
        let message = message.into();
        self.log(message.clone());
        self.mark_skipped(Some(message.clone()));
        Err(SkipSignal::new(Some(message)).into())
    }

    /// Marks the test skipped and stops it.
    ///
    /// # Errors
    ///
    /// Always returns a skip [`Signal`] to be propagated with `?`.
    pub fn skip_now(&self) -> TestResult {
        self.mark_skipped(None);
        Err(SkipSignal::default().into())
    }

    /// Returns true once the test has been skipped.
    #[must_use]
    pub fn skipped(&self) -> bool {
        self.inner.skipped.load(Ordering::SeqCst)
    }

    /// Returns true when the test was scheduled in parallel with its siblings.
    ///
    /// Set by [`Method::parallel`](crate::Method::parallel) or
    /// [`Suite::parallel`](crate::Suite::parallel). Parallel tests are never
    /// captured.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.inner.host.is_parallel()
    }

    /// Runs `body` as a nested test named `self/name`.
    ///
    /// The nested test gets its own context. When it fails, this test is
    /// marked failed too, its log lines are copied here under a
    /// `--- FAIL:` heading, and its failure message becomes this test's
    /// failure unless one was already recorded. Returns true when the nested
    /// test did not fail.
    pub fn run(&self, name: &str, body: impl FnOnce(&Self) -> TestResult) -> bool {
        let child = Self::with_tracker(
            self.inner.name.child(name),
            self.inner.host.child(name),
            Arc::clone(&self.inner.tracker),
        );
        if let Some(signal) = recover(|| body(&child)) {
            child.record(signal);
        }
        if !child.failed() {
            log::debug!("nested test {} passed", child.name());
            return true;
        }
        self.fail();
        self.log(format!("--- FAIL: {}", child.name()));
        for line in child.logs() {
            self.log(format!("    {line}"));
        }
        if let Some(failure) = child.failure() {
            self.record_failure(failure);
        }
        false
    }

    /// Registers background work that must finish before teardown.
    ///
    /// The runner waits until every handle has been dropped or
    /// [`finished`](BackgroundHandle::finish) before running `TearDownTest`.
    #[must_use]
    pub fn background(&self) -> BackgroundHandle {
        self.inner.tracker.acquire();
        BackgroundHandle {
            context: self.clone(),
        }
    }

    /// Blocks until all registered background work has finished.
    pub(crate) fn wait_background(&self) {
        self.inner.tracker.wait();
    }

    /// Applies a signal recovered from a hook or test body.
    pub(crate) fn record(&self, signal: Signal) {
        match signal {
            Signal::Failure(failure) => self.record_failure(failure),
            Signal::Skip(skip) => self.mark_skipped(skip.message().map(str::to_owned)),
        }
    }

    fn record_failure(&self, failure: FailureSignal) {
        self.fail();
        let mut slot = self
            .inner
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(failure);
        }
    }

    fn mark_skipped(&self, message: Option<String>) {
        self.inner.skipped.store(true, Ordering::SeqCst);
        let mut slot = self
            .inner
            .skip_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = message;
        }
    }

    /// Returns the first recorded failure signal.
    pub(crate) fn failure(&self) -> Option<FailureSignal> {
        self.inner
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the first recorded skip message.
    pub(crate) fn skip_message(&self) -> Option<String> {
        self.inner
            .skip_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Registration of background work owned by a test.
///
/// The work is considered finished when the handle is dropped.
///
/// # Examples
///
/// ```
/// use std::thread;
/// use suitecase::{TestName, T};
/// use suitecase_harness::HostTest;
///
/// let t = T::new(TestName::new("Demo", "TestWorker"), HostTest::new("Demo/TestWorker"));
/// let handle = t.background();
/// let worker = thread::spawn(move || {
///     handle.context().error("worker saw a bad value");
///     handle.finish();
/// });
/// worker.join().unwrap();
/// assert!(t.failed());
/// ```
#[derive(Debug)]
pub struct BackgroundHandle {
    context: T,
}

impl BackgroundHandle {
    /// Returns the context of the owning test.
    #[must_use]
    pub fn context(&self) -> &T {
        &self.context
    }

    /// Marks the work finished.
    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for BackgroundHandle {
    fn drop(&mut self) {
        self.context.inner.tracker.release();
    }
}
