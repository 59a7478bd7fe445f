//! The per-run engine: plugins, suites and entry points.

use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};

use suitecase_harness::{HostCase, HostDriver, HostTest, StdDriver, TestMetadata};

use crate::config::{CAPTURE_VAR, EXCLUDE_VAR, EngineConfig, HELP_VAR, INCLUDE_VAR, OPT_VAR};
use crate::deprecation::DeprecationSummary;
use crate::error::ConfigurationError;
use crate::plugin::{Plugin, PluginBus, PluginEvent};
use crate::runner::{ErasedSuite, RunContext, SuiteHolder, SuiteReport};
use crate::stats::StatsPlugin;
use crate::suite::{Suite, SuiteRegistration};

/// Per-suite settings chosen when the suite is added.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SuiteSettings {
    suppress_deprecations: bool,
}

impl SuiteSettings {
    /// Creates the default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            suppress_deprecations: false,
        }
    }

    /// Keeps this suite's deprecated conventions out of the run summary.
    #[must_use]
    pub const fn suppress_deprecations(mut self) -> Self {
        self.suppress_deprecations = true;
        self
    }

    /// Returns true when deprecations are suppressed.
    #[must_use]
    pub const fn deprecations_suppressed(&self) -> bool {
        self.suppress_deprecations
    }
}

struct SuiteEntry {
    suite: Box<dyn ErasedSuite>,
    settings: SuiteSettings,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    passed: bool,
    errors: Vec<ConfigurationError>,
    deprecations: DeprecationSummary,
}

impl RunReport {
    /// Returns true when every selected suite passed without configuration
    /// errors.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.passed
    }

    /// Returns configuration errors raised while running suites.
    #[must_use]
    pub fn errors(&self) -> &[ConfigurationError] {
        &self.errors
    }

    /// Returns the distinct deprecated usages seen during the run.
    #[must_use]
    pub const fn deprecations(&self) -> &DeprecationSummary {
        &self.deprecations
    }

    /// Renders the configuration errors and the deprecation summary shown to
    /// the user after a run; `None` when there is nothing to say.
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        let mut lines: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("configuration error: {e}"))
            .collect();
        lines.extend(self.deprecations.render());
        if lines.is_empty() {
            return None;
        }
        let mut out = lines.join("\n");
        out.push('\n');
        Some(out)
    }
}

/// Runs registered suites under a host driver.
///
/// # Examples
///
/// ```
/// use suitecase::{Engine, EngineConfig, Method, Suite, TestResult, T};
/// use suitecase_harness::StdDriver;
///
/// #[derive(Default)]
/// struct GreetingSuite;
///
/// impl GreetingSuite {
///     fn test_greets(&self, t: &T) -> TestResult {
///         t.log("hello");
///         Ok(())
///     }
/// }
///
/// impl Suite for GreetingSuite {
///     fn methods() -> Vec<Method<Self>> {
///         vec![Method::context("TestGreets", Self::test_greets)]
///     }
/// }
///
/// let mut engine = Engine::new(EngineConfig::new().capture(false));
/// engine.add_suite(GreetingSuite);
/// assert!(engine.run(&StdDriver::new()).passed());
/// ```
pub struct Engine {
    config: EngineConfig,
    bus: PluginBus,
    stats: Arc<StatsPlugin>,
    suites: Vec<SuiteEntry>,
}

impl Engine {
    /// Creates an engine with the built-in statistics plugin registered.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_stats(config, StatsPlugin::new())
    }

    /// Creates an engine using `stats` as its statistics plugin.
    #[must_use]
    pub fn with_stats(config: EngineConfig, stats: StatsPlugin) -> Self {
        let stats = Arc::new(stats);
        let mut bus = PluginBus::new();
        if let Err(e) = bus.register(stats.clone(), config.options()) {
            log::error!("{e}");
        }
        Self {
            config,
            bus,
            stats,
            suites: Vec::new(),
        }
    }

    /// Returns the run configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the built-in statistics plugin.
    #[must_use]
    pub fn stats(&self) -> Arc<StatsPlugin> {
        Arc::clone(&self.stats)
    }

    /// Registers an observer; configured options for its prefix are routed to
    /// it immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateOptionPrefix`] when the plugin's
    /// option prefix is already taken.
    pub fn register_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), ConfigurationError> {
        self.bus.register(plugin, self.config.options())
    }

    /// Adds a suite with default settings.
    pub fn add_suite<S: Suite>(&mut self, suite: S) {
        self.add_suite_with(suite, SuiteSettings::new());
    }

    /// Adds a suite with explicit settings.
    pub fn add_suite_with<S: Suite>(&mut self, suite: S, settings: SuiteSettings) {
        self.suites.push(SuiteEntry {
            suite: Box::new(SuiteHolder::new(suite)),
            settings,
        });
    }

    /// Adds every suite submitted with [`register_suite!`](crate::register_suite).
    ///
    /// Returns the number of suites added.
    pub fn add_registered_suites(&mut self) -> usize {
        let before = self.suites.len();
        self.suites
            .extend(inventory::iter::<SuiteRegistration>.into_iter().map(|registration| {
                SuiteEntry {
                    suite: registration.build(),
                    settings: SuiteSettings {
                        suppress_deprecations: registration.suppress_deprecations(),
                    },
                }
            }));
        self.suites.len() - before
    }

    /// Returns the option listing shown when help is requested.
    #[must_use]
    pub fn help(&self) -> String {
        let mut out = format!(
            "Suite Options\n\
             =============\n\
             {HELP_VAR}: Displays this help text\n\
             {OPT_VAR}: Passes options to plugins, separated by ';'\n    \
             Ex: {OPT_VAR}=\"plug.myopt=myval\"\n\
             {INCLUDE_VAR}: Only runs the listed suites (comma separated)\n\
             {EXCLUDE_VAR}: Skips the listed suites (comma separated)\n\
             {CAPTURE_VAR}: Set to 0 to stop capturing test output\n\n"
        );
        out.push_str(&self.bus.help());
        out
    }

    /// Runs every selected suite under `driver`.
    pub fn run(&mut self, driver: &dyn HostDriver) -> RunReport {
        let ctx = RunContext {
            config: &self.config,
            bus: &self.bus,
            driver,
        };
        ctx.bus.emit(PluginEvent::Starting);

        let reports: Mutex<Vec<(usize, SuiteReport)>> = Mutex::new(Vec::new());
        let mut cases = Vec::new();
        for (index, entry) in self.suites.iter_mut().enumerate() {
            let name = entry.suite.name();
            if !ctx.config.selects(&name) {
                log::debug!("suite {name} filtered out");
                continue;
            }
            let metadata = TestMetadata::new(name).parallel(entry.suite.parallel());
            let suppress = entry.settings.suppress_deprecations;
            let (ctx, reports) = (&ctx, &reports);
            cases.push(HostCase::new(metadata, move |host: &HostTest| {
                let report = entry.suite.run(ctx, host, suppress);
                reports
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((index, report));
            }));
        }
        let results = driver.run_group(cases);

        let mut reports = reports.into_inner().unwrap_or_else(PoisonError::into_inner);
        reports.sort_by_key(|(index, _)| *index);
        let mut run = RunReport {
            passed: results.iter().all(|passed| *passed),
            ..RunReport::default()
        };
        for (_, report) in reports {
            run.passed &= report.passed && report.errors.is_empty();
            run.errors.extend(report.errors);
            run.deprecations.extend(report.deprecations);
        }

        ctx.bus.emit(PluginEvent::Finished);
        if let Some(summary) = run.deprecations.render() {
            log::warn!("{summary}");
        }
        run
    }

    /// Runs the engine as a test binary's `main`.
    ///
    /// Prints the option listing and exits successfully when help was
    /// requested; otherwise runs every suite with [`StdDriver`] and writes
    /// [`RunReport::summary`] to standard error.
    #[must_use]
    pub fn run_main(mut self) -> ExitCode {
        if self.config.help_requested() {
            let mut stdout = io::stdout().lock();
            if let Err(e) = stdout.write_all(self.help().as_bytes()) {
                log::warn!("failed to print help: {e}");
            }
            return ExitCode::SUCCESS;
        }
        let driver = StdDriver::new();
        let report = self.run(&driver);
        if let Some(summary) = report.summary() {
            let mut stderr = io::stderr().lock();
            if let Err(e) = stderr.write_all(summary.as_bytes()) {
                log::warn!("failed to print run summary: {e}");
            }
        }
        driver.exit_status(report.passed())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suites: Vec<_> = self.suites.iter().map(|entry| entry.suite.name()).collect();
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .field("suites", &suites)
            .finish_non_exhaustive()
    }
}
