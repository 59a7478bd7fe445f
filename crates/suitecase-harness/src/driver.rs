//! Host driver trait for case execution.

use std::process::ExitCode;

use crate::case::HostCase;

/// Runs groups of named cases inside a host-specific environment.
///
/// Drivers own scheduling: cases whose metadata opts into parallel execution
/// may run concurrently, everything else runs in submission order. Every case
/// in a group has finished when [`HostDriver::run_group`] returns.
///
/// # Examples
///
/// ```
/// use suitecase_harness::{HostCase, HostDriver, HostTest, StdDriver, TestMetadata};
///
/// let driver = StdDriver::new();
/// let results = driver.run_group(vec![
///     HostCase::new(TestMetadata::new("passes"), |_: &HostTest| {}),
///     HostCase::new(TestMetadata::new("fails"), |host: &HostTest| host.fail()),
/// ]);
/// assert_eq!(results, [true, false]);
/// ```
pub trait HostDriver: Sync {
    /// Runs every case and returns their pass outcomes in submission order.
    fn run_group(&self, cases: Vec<HostCase<'_>>) -> Vec<bool>;

    /// Maps the overall run outcome to a process exit status.
    fn exit_status(&self, passed: bool) -> ExitCode {
        if passed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}
