//! Named case and metadata types handed to host drivers.

use crate::host::HostTest;

/// Metadata describing one case submitted to a host driver.
///
/// # Examples
///
/// ```
/// use suitecase_harness::TestMetadata;
///
/// let metadata = TestMetadata::new("LoginSuite/TestSignsIn").parallel(true);
/// assert_eq!(metadata.name(), "LoginSuite/TestSignsIn");
/// assert!(metadata.is_parallel());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestMetadata {
    name: String,
    parallel: bool,
}

impl TestMetadata {
    /// Creates metadata for a sequential case.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parallel: false,
        }
    }

    /// Sets the parallel opt-in marker.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the full case name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true when the case opted into parallel execution.
    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.parallel
    }
}

impl Default for TestMetadata {
    fn default() -> Self {
        Self::new("<unknown>")
    }
}

type CaseBody<'a> = Box<dyn FnOnce(&HostTest) + Send + 'a>;

/// A named procedure submitted to a host driver.
///
/// The procedure receives the [`HostTest`] created for it by the driver and
/// reports failure through that handle.
///
/// # Examples
///
/// ```
/// use suitecase_harness::{HostCase, HostTest, TestMetadata};
///
/// let case = HostCase::new(TestMetadata::new("Demo"), |host: &HostTest| host.fail());
/// let host = HostTest::new(case.metadata().name());
/// case.run(&host);
/// assert!(host.failed());
/// ```
pub struct HostCase<'a> {
    metadata: TestMetadata,
    body: CaseBody<'a>,
}

impl<'a> HostCase<'a> {
    /// Wraps a closure as a named case.
    #[must_use]
    pub fn new(metadata: TestMetadata, body: impl FnOnce(&HostTest) + Send + 'a) -> Self {
        Self {
            metadata,
            body: Box::new(body),
        }
    }

    /// Returns the case metadata.
    #[must_use]
    pub fn metadata(&self) -> &TestMetadata {
        &self.metadata
    }

    /// Consumes the case and runs its body against `host`.
    pub fn run(self, host: &HostTest) {
        (self.body)(host);
    }
}

impl std::fmt::Debug for HostCase<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCase")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
