//! Behavioural tests for standard driver scheduling semantics.

use rstest::{fixture, rstest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex};
use suitecase_harness::{HostCase, HostDriver, HostTest, StdDriver, TestMetadata};

#[fixture]
fn driver() -> StdDriver {
    StdDriver::new()
}

#[rstest]
fn std_driver_executes_each_case_once(driver: StdDriver) {
    let calls = AtomicUsize::new(0);
    let cases = (0..3)
        .map(|index| {
            let calls = &calls;
            HostCase::new(TestMetadata::new(format!("case-{index}")), move |_: &HostTest| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();
    let results = driver.run_group(cases);
    assert_eq!(results, [true, true, true]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[rstest]
#[expect(clippy::expect_used, reason = "test should fail loudly")]
fn std_driver_passes_metadata_to_host(driver: StdDriver) {
    let seen = Mutex::new(Vec::new());
    driver.run_group(vec![
        HostCase::new(TestMetadata::new("Suite/TestA"), |host: &HostTest| {
            seen.lock().expect("order lock").push((host.name().to_string(), host.is_parallel()));
        }),
        HostCase::new(
            TestMetadata::new("Suite/TestB").parallel(true),
            |host: &HostTest| {
                seen.lock().expect("order lock").push((host.name().to_string(), host.is_parallel()));
            },
        ),
    ]);
    let seen = seen.into_inner().expect("order lock");
    assert_eq!(
        seen,
        [
            ("Suite/TestA".to_string(), false),
            ("Suite/TestB".to_string(), true)
        ]
    );
}

#[rstest]
fn std_driver_runs_parallel_cases_concurrently(driver: StdDriver) {
    // Both cases must reach the barrier together, which only happens when
    // they run on separate threads.
    let barrier = Barrier::new(2);
    let cases = (0..2)
        .map(|index| {
            let barrier = &barrier;
            HostCase::new(
                TestMetadata::new(format!("parallel-{index}")).parallel(true),
                move |_: &HostTest| {
                    barrier.wait();
                },
            )
        })
        .collect();
    assert_eq!(driver.run_group(cases), [true, true]);
}

#[rstest]
#[expect(clippy::expect_used, reason = "test should fail loudly")]
fn std_driver_runs_sequential_cases_before_parallel_ones(driver: StdDriver) {
    let order = Mutex::new(Vec::new());
    driver.run_group(vec![
        HostCase::new(TestMetadata::new("p").parallel(true), |_: &HostTest| {
            order.lock().expect("order lock").push("parallel");
        }),
        HostCase::new(TestMetadata::new("s"), |_: &HostTest| {
            order.lock().expect("order lock").push("sequential");
        }),
    ]);
    assert_eq!(order.into_inner().expect("order lock"), ["sequential", "parallel"]);
}

#[rstest]
fn std_driver_contains_panics_to_the_failing_case(driver: StdDriver) {
    let results = driver.run_group(vec![
        HostCase::new(TestMetadata::new("panics"), |_: &HostTest| {
            panic!("driver panic containment");
        }),
        HostCase::new(TestMetadata::new("survives"), |_: &HostTest| {}),
    ]);
    assert_eq!(results, [false, true]);
}

#[rstest]
#[case(true, std::process::ExitCode::SUCCESS)]
#[case(false, std::process::ExitCode::FAILURE)]
fn std_driver_maps_outcome_to_exit_status(
    driver: StdDriver,
    #[case] passed: bool,
    #[case] expected: std::process::ExitCode,
) {
    assert_eq!(driver.exit_status(passed), expected);
}
