//! Default host driver built on the standard library.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crate::case::HostCase;
use crate::driver::HostDriver;
use crate::host::HostTest;
use crate::panic::panic_message;

/// Framework-agnostic host driver.
///
/// `StdDriver` runs the sequential cases of a group in submission order on the
/// calling thread, then runs every parallel case of the group concurrently on
/// scoped threads. A panic escaping a case is contained and reported as a
/// failure of that case only.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDriver;

impl StdDriver {
    /// Creates a new standard driver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn run_case(case: HostCase<'_>) -> bool {
        let host = HostTest::new(case.metadata().name());
        if case.metadata().is_parallel() {
            host.mark_parallel();
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| case.run(&host)));
        if let Err(payload) = outcome {
            host.error(format!("panicked: {}", panic_message(payload.as_ref())));
        }
        let passed = !host.failed();
        if passed {
            log::debug!("--- PASS: {}", host.name());
        } else {
            log::info!("--- FAIL: {}", host.name());
            for line in host.logs() {
                log::info!("    {line}");
            }
        }
        passed
    }
}

impl HostDriver for StdDriver {
    fn run_group(&self, cases: Vec<HostCase<'_>>) -> Vec<bool> {
        let mut results = vec![false; cases.len()];
        let (parallel, sequential): (Vec<_>, Vec<_>) = cases
            .into_iter()
            .enumerate()
            .partition(|(_, case)| case.metadata().is_parallel());

        for (index, case) in sequential {
            let passed = Self::run_case(case);
            if let Some(slot) = results.get_mut(index) {
                *slot = passed;
            }
        }

        thread::scope(|scope| {
            let handles: Vec<_> = parallel
                .into_iter()
                .map(|(index, case)| (index, scope.spawn(move || Self::run_case(case))))
                .collect();
            for (index, handle) in handles {
                let passed = handle.join().unwrap_or(false);
                if let Some(slot) = results.get_mut(index) {
                    *slot = passed;
                }
            }
        });

        results
    }
}
