//! Orchestration of one suite: hook resolution, the test loop and reporting.
//!
//! A suite moves through `SuiteSetup`, `TestLoop` and `SuiteTeardown`. Each
//! test moves through set-up, body, tear-down and report. Signatures are
//! resolved once per suite before any test runs; an unsupported signature
//! aborts the suite's tests while its tear-down is still attempted.

use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use suitecase_harness::{HostCase, HostDriver, HostTest, TestMetadata};

use crate::capture::OutputCapture;
use crate::config::EngineConfig;
use crate::context::{T, TestName};
use crate::deprecation::{DeprecatedUsage, DeprecationLog};
use crate::differ::Differ;
use crate::error::{ConfigurationError, SignatureError};
use crate::plugin::{
    PluginBus, PluginEvent, SuiteFinishedStats, TestFailedStats, TestPassedStats,
    TestSkippedStats,
};
use crate::signal::{
    FailureSignal, ForeignPayload, Frame, Signal, TestResult, catch, describe_payload,
};
use crate::signature::{self, MethodDef};
use crate::suite::{BareFn, Method, Procedure, Suite};

const REPORT_RULE: &str = "-------------------------------------------------";

/// Everything a suite needs from the surrounding run.
pub(crate) struct RunContext<'a> {
    pub(crate) config: &'a EngineConfig,
    pub(crate) bus: &'a PluginBus,
    pub(crate) driver: &'a dyn HostDriver,
}

/// Outcome of one suite.
#[derive(Debug, Default)]
pub(crate) struct SuiteReport {
    pub(crate) passed: bool,
    pub(crate) errors: Vec<ConfigurationError>,
    pub(crate) deprecations: Vec<DeprecatedUsage>,
}

/// Type-erased suite owned by an engine.
pub(crate) trait ErasedSuite: Send {
    fn name(&self) -> String;
    fn parallel(&self) -> bool;
    fn run(&mut self, ctx: &RunContext<'_>, host: &HostTest, suppress: bool) -> SuiteReport;
}

pub(crate) struct SuiteHolder<S> {
    suite: S,
}

impl<S: Suite> SuiteHolder<S> {
    pub(crate) const fn new(suite: S) -> Self {
        Self { suite }
    }
}

impl<S: Suite> ErasedSuite for SuiteHolder<S> {
    fn name(&self) -> String {
        self.suite.name()
    }

    fn parallel(&self) -> bool {
        self.suite.parallel()
    }

    fn run(&mut self, ctx: &RunContext<'_>, host: &HostTest, suppress: bool) -> SuiteReport {
        SuiteRunner::new(&mut self.suite, ctx, host, suppress).run()
    }
}

/// A test scheduled for execution.
struct PlannedTest<S> {
    name: &'static str,
    procedure: Procedure<S>,
    parallel: bool,
}

/// Resolved per-test hooks and tests of one suite.
struct TestPlan<S> {
    set_up: Option<Procedure<S>>,
    tear_down: Option<Procedure<S>>,
    tests: Vec<PlannedTest<S>>,
}

struct SuiteRunner<'s, 'c, S> {
    suite: &'s mut S,
    ctx: &'s RunContext<'c>,
    host: &'s HostTest,
    name: String,
    log: DeprecationLog,
    errors: Vec<ConfigurationError>,
}

impl<'s, 'c, S: Suite> SuiteRunner<'s, 'c, S> {
    fn new(suite: &'s mut S, ctx: &'s RunContext<'c>, host: &'s HostTest, suppress: bool) -> Self {
        let name = suite.name();
        Self {
            suite,
            ctx,
            host,
            name,
            log: DeprecationLog::new(suppress),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> SuiteReport {
        let started = Instant::now();
        log::debug!("suite {} starting", self.name);
        self.ctx.bus.emit(PluginEvent::SuiteStarting { suite: &self.name });

        let methods = S::methods();
        let set_up_suite = self.resolve_suite_hook(&signature::SET_UP_SUITE, &methods);
        let tear_down_suite = self.resolve_suite_hook(&signature::TEAR_DOWN_SUITE, &methods);
        let plan = self.plan_tests(&methods);

        let mut passed = true;
        match set_up_suite {
            Ok(hook) => {
                if hook.is_none_or(|hook| self.invoke_suite_hook("SetUpSuite", hook)) {
                    match plan {
                        Ok(plan) => passed = self.run_tests(&plan),
                        Err(error) => self.fatal(error),
                    }
                }
            }
            Err(error) => self.fatal(error),
        }

        match tear_down_suite {
            Ok(Some(hook)) => {
                self.invoke_suite_hook("TearDownSuite", hook);
            }
            Ok(None) => {}
            Err(error) => self.fatal(error),
        }

        let stats = SuiteFinishedStats {
            time: started.elapsed(),
        };
        self.ctx.bus.emit(PluginEvent::SuiteFinished {
            suite: &self.name,
            stats: &stats,
        });
        log::debug!("suite {} finished in {:?}", self.name, stats.time);

        if !passed {
            self.host.fail();
        }
        SuiteReport {
            passed: passed && !self.host.failed(),
            errors: self.errors,
            deprecations: self.log.usages().to_vec(),
        }
    }

    /// Validates `method` against `def`, noting deprecated conventions.
    fn resolve(
        &mut self,
        def: &MethodDef,
        method: Option<&Method<S>>,
    ) -> Result<Option<Procedure<S>>, ConfigurationError> {
        match def.validate(method.map(|m| m.procedure().params())) {
            Ok(resolved) => {
                if let Some(method) = method.filter(|_| resolved.deprecated) {
                    self.log.note(&self.name, method.name(), resolved.version);
                }
                Ok(method.map(Method::procedure))
            }
            Err(SignatureError::InvalidValue) => Ok(None),
            Err(SignatureError::UnsupportedMethod { .. }) => {
                Err(ConfigurationError::UnsupportedMethod {
                    suite: self.name.clone(),
                    method: method.map_or(def.name(), Method::name).to_owned(),
                })
            }
        }
    }

    fn resolve_suite_hook(
        &mut self,
        def: &MethodDef,
        methods: &[Method<S>],
    ) -> Result<Option<BareFn<S>>, ConfigurationError> {
        let method = methods.iter().find(|m| m.name() == def.name());
        Ok(self.resolve(def, method)?.and_then(|procedure| match procedure {
            Procedure::Bare(hook) => Some(hook),
            Procedure::Legacy(_) | Procedure::Context(_) => None,
        }))
    }

    fn plan_tests(&mut self, methods: &[Method<S>]) -> Result<TestPlan<S>, ConfigurationError> {
        let find = |def: &MethodDef| methods.iter().find(|m| m.name() == def.name());
        let set_up = self.resolve(&signature::SET_UP_TEST, find(&signature::SET_UP_TEST))?;
        let tear_down = self.resolve(&signature::TEAR_DOWN_TEST, find(&signature::TEAR_DOWN_TEST))?;
        let mut tests = Vec::new();
        for method in methods.iter().filter(|m| m.name().starts_with(signature::TEST.name())) {
            if let Some(procedure) = self.resolve(&signature::TEST, Some(method))? {
                tests.push(PlannedTest {
                    name: method.name(),
                    procedure,
                    parallel: method.is_parallel(),
                });
            }
        }
        Ok(TestPlan {
            set_up,
            tear_down,
            tests,
        })
    }

    fn fatal(&mut self, error: ConfigurationError) {
        log::error!("{error}");
        self.host.error(error.to_string());
        self.errors.push(error);
    }

    /// Runs a suite-level hook; returns false when it panicked.
    fn invoke_suite_hook(&mut self, label: &str, hook: BareFn<S>) -> bool {
        let suite = &mut *self.suite;
        match panic::catch_unwind(AssertUnwindSafe(|| hook(suite))) {
            Ok(()) => true,
            Err(payload) => {
                let message = describe_payload(payload.as_ref());
                log::error!("{}.{label} failed: {message}", self.name);
                self.host.error(format!("{label} failed: {message}"));
                false
            }
        }
    }

    fn run_tests(&self, plan: &TestPlan<S>) -> bool {
        let suite: &S = &*self.suite;
        let suite_name = self.name.as_str();
        let suite_parallel = suite.parallel();
        let ctx = self.ctx;
        let cases = plan
            .tests
            .iter()
            .map(|test| {
                let metadata = TestMetadata::new(format!("{suite_name}/{}", test.name))
                    .parallel(suite_parallel || test.parallel);
                HostCase::new(metadata, move |host: &HostTest| {
                    run_test(ctx, suite, suite_name, plan, test, host);
                })
            })
            .collect();
        ctx.driver.run_group(cases).into_iter().all(|passed| passed)
    }
}

/// Executes one test end to end on the host driver's thread.
fn run_test<S: Suite>(
    ctx: &RunContext<'_>,
    suite: &S,
    suite_name: &str,
    plan: &TestPlan<S>,
    test: &PlannedTest<S>,
    host: &HostTest,
) {
    ctx.bus.emit(PluginEvent::TestStarting {
        suite: suite_name,
        test: test.name,
    });
    let started = Instant::now();
    let t = T::new(TestName::new(suite_name, test.name), host.clone());

    let mut capture = open_capture(ctx.config, &t);
    let foreign = if t.failed() {
        None
    } else {
        run_phases(ctx.config, suite, plan, test, &t)
    };
    let output = close_capture(capture.as_mut(), &t);
    drop(capture);

    if let Some(payload) = &foreign {
        t.error(format!("panicked: {}", describe_payload(payload.as_ref())));
    }
    report(ctx.bus, suite_name, test.name, &t, started.elapsed(), &output);

    if let Some(payload) = foreign {
        log::warn!("re-raising an unwind that is not a suitecase signal");
        panic::resume_unwind(payload);
    }
}

fn open_capture(config: &EngineConfig, t: &T) -> Option<OutputCapture> {
    if !config.capture_enabled() || t.is_parallel() {
        return None;
    }
    config.open_capture(t).unwrap_or_else(|e| {
        t.record(Signal::Failure(FailureSignal::new(
            format!("unable to capture output: {e}"),
            Vec::new(),
        )));
        None
    })
}

fn close_capture(capture: Option<&mut OutputCapture>, t: &T) -> Vec<u8> {
    let Some(capture) = capture else {
        return Vec::new();
    };
    match capture.close() {
        Ok(()) => capture.buffer().to_vec(),
        Err(e) => {
            t.error(format!("unable to restore output: {e}"));
            Vec::new()
        }
    }
}

/// Runs hooks and body; returns a foreign unwind payload to resume later.
///
/// The body is skipped when set-up stops the test. Both tear-down phases
/// always run, even after a foreign unwind; only the first such payload is
/// kept.
fn run_phases<S: Suite>(
    config: &EngineConfig,
    suite: &S,
    plan: &TestPlan<S>,
    test: &PlannedTest<S>,
    t: &T,
) -> Option<ForeignPayload> {
    let mut foreign = None;
    let mut phase = |body: &mut dyn FnMut() -> TestResult| -> bool {
        match catch(body) {
            Ok(None) => true,
            Ok(Some(signal)) => {
                t.record(signal);
                false
            }
            Err(payload) if foreign.is_some() => {
                log::warn!(
                    "discarding a second unwind from {}: {}",
                    t.name(),
                    describe_payload(payload.as_ref())
                );
                false
            }
            Err(payload) => {
                foreign = Some(payload);
                false
            }
        }
    };

    let set_up = phase(&mut || {
        if let Some(hook) = config.set_up_hook() {
            hook(t);
        }
        invoke(plan.set_up, suite, t)
    });
    if set_up {
        phase(&mut || invoke(Some(test.procedure), suite, t));
    }
    t.wait_background();
    phase(&mut || invoke(plan.tear_down, suite, t));
    phase(&mut || {
        if let Some(hook) = config.tear_down_hook() {
            hook(t);
        }
        Ok(())
    });
    foreign
}

fn invoke<S>(procedure: Option<Procedure<S>>, suite: &S, t: &T) -> TestResult {
    match procedure {
        Some(Procedure::Context(f)) => f(suite, t),
        Some(Procedure::Legacy(f)) => {
            f(suite, t.host());
            Ok(())
        }
        Some(Procedure::Bare(_)) | None => Ok(()),
    }
}

fn report(bus: &PluginBus, suite: &str, test: &str, t: &T, time: Duration, output: &[u8]) {
    if t.failed() {
        let (message, frames) = t.failure().map(FailureSignal::into_parts).unwrap_or_default();
        let report = render_report(&t.name(), &frames, &message, &t.logs(), output);
        let stats = TestFailedStats {
            time,
            name: t.name(),
            message,
            frames,
            report,
        };
        log::debug!("test {} failed", stats.name);
        bus.emit(PluginEvent::TestFailed {
            suite,
            test,
            stats: &stats,
        });
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout
            .write_all(stats.report.as_bytes())
            .and_then(|()| stdout.flush())
        {
            log::warn!("failed to print report for {}: {e}", stats.name);
        }
    } else if t.skipped() {
        let stats = TestSkippedStats {
            time,
            message: t.skip_message(),
        };
        log::debug!("test {} skipped", t.name());
        bus.emit(PluginEvent::TestSkipped {
            suite,
            test,
            stats: &stats,
        });
    } else {
        log::debug!("test {} passed", t.name());
        bus.emit(PluginEvent::TestPassed {
            suite,
            test,
            stats: &TestPassedStats { time },
        });
    }
}

/// Formats the failure report printed after a failing test.
pub(crate) fn render_report(
    name: &str,
    frames: &[Frame],
    message: &str,
    logs: &[String],
    output: &[u8],
) -> String {
    let mut out = format!("{REPORT_RULE}\nFAIL: {name}\n\n");
    for frame in frames.iter().rev().filter(|frame| !frame.hidden()) {
        let _ = writeln!(out, "{frame}");
    }
    let (message, _) = Differ::new().process_message(message);
    if !message.is_empty() {
        let _ = writeln!(out, "{message}");
    }
    out.push('\n');
    if !logs.is_empty() {
        for line in logs {
            let _ = writeln!(out, "{line}");
        }
        out.push('\n');
    }
    if !output.is_empty() {
        out.push_str("stdout:\n");
        out.push_str(&String::from_utf8_lossy(output));
        out.push('\n');
    }
    out
}
