//! Plugin contract and the ordered event bus.
//!
//! Plugins observe the lifecycle of a run. Each plugin may declare an option
//! namespace; option strings of the form `prefix.name=value` are routed to the
//! plugin owning `prefix` when it is registered.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::signal::Frame;

/// A single option a plugin accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginOption {
    help: String,
    default: String,
}

impl PluginOption {
    /// Creates an option description.
    #[must_use]
    pub fn new(help: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            help: help.into(),
            default: default.into(),
        }
    }

    /// Returns the help text.
    #[must_use]
    pub fn help(&self) -> &str {
        &self.help
    }

    /// Returns the default value, possibly empty.
    #[must_use]
    pub fn default_value(&self) -> &str {
        &self.default
    }
}

/// The option namespace declared by a plugin.
///
/// # Examples
///
/// ```
/// use suitecase::{PluginOption, PluginOptions};
///
/// let options = PluginOptions::new("junit")
///     .with("path", PluginOption::new("Where to write the report", "report.xml"));
/// assert_eq!(options.prefix(), "junit");
/// assert!(options.options().contains_key("path"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginOptions {
    prefix: String,
    options: BTreeMap<String, PluginOption>,
}

impl PluginOptions {
    /// Creates an empty namespace.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            options: BTreeMap::new(),
        }
    }

    /// Adds a named option.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, option: PluginOption) -> Self {
        self.options.insert(name.into(), option);
        self
    }

    /// Returns the namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the options sorted by name.
    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, PluginOption> {
        &self.options
    }
}

/// Statistics delivered with a passing test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestPassedStats {
    /// Wall time of the test, hooks included.
    pub time: Duration,
}

/// Statistics delivered with a failing test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestFailedStats {
    /// Wall time of the test, hooks included.
    pub time: Duration,
    /// Full hierarchical test name.
    pub name: String,
    /// Failure message, empty when the test only marked itself failed.
    pub message: String,
    /// Frames recorded with the failure, innermost first.
    pub frames: Vec<Frame>,
    /// The rendered failure report written to standard output.
    pub report: String,
}

/// Statistics delivered with a skipped test.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestSkippedStats {
    /// Wall time of the test, hooks included.
    pub time: Duration,
    /// Skip message, if one was given.
    pub message: Option<String>,
}

/// Statistics delivered when a suite finishes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuiteFinishedStats {
    /// Wall time of the whole suite.
    pub time: Duration,
}

/// One lifecycle event delivered to every plugin in registration order.
#[derive(Clone, Copy, Debug)]
pub enum PluginEvent<'a> {
    /// The run is about to start.
    Starting,
    /// A suite is about to run.
    SuiteStarting {
        /// Suite name.
        suite: &'a str,
    },
    /// A test is about to run.
    TestStarting {
        /// Suite name.
        suite: &'a str,
        /// Test method name.
        test: &'a str,
    },
    /// A test passed.
    TestPassed {
        /// Suite name.
        suite: &'a str,
        /// Test method name.
        test: &'a str,
        /// Timing.
        stats: &'a TestPassedStats,
    },
    /// A test failed.
    TestFailed {
        /// Suite name.
        suite: &'a str,
        /// Test method name.
        test: &'a str,
        /// Failure details.
        stats: &'a TestFailedStats,
    },
    /// A test was skipped.
    TestSkipped {
        /// Suite name.
        suite: &'a str,
        /// Test method name.
        test: &'a str,
        /// Skip details.
        stats: &'a TestSkippedStats,
    },
    /// A suite finished, after all of its tests.
    SuiteFinished {
        /// Suite name.
        suite: &'a str,
        /// Timing.
        stats: &'a SuiteFinishedStats,
    },
    /// The run finished.
    Finished,
}

/// An observer of run lifecycle events.
///
/// Callbacks may be invoked concurrently from parallel tests, so plugins keep
/// their state behind interior mutability. Every callback defaults to doing
/// nothing.
pub trait Plugin: Send + Sync {
    /// Returns a display name used in diagnostics.
    fn name(&self) -> &str;

    /// Returns the plugin's option namespace, if it accepts options.
    fn options(&self) -> Option<PluginOptions> {
        None
    }

    /// Receives an option routed to this plugin's namespace.
    fn set_option(&self, _name: &str, _value: &str) {}

    /// Called once before any suite runs.
    fn starting(&self) {}

    /// Called before a suite's first test.
    fn suite_starting(&self, _suite: &str) {}

    /// Called before each test.
    fn test_starting(&self, _suite: &str, _test: &str) {}

    /// Called when a test passes.
    fn test_passed(&self, _suite: &str, _test: &str, _stats: &TestPassedStats) {}

    /// Called when a test fails.
    fn test_failed(&self, _suite: &str, _test: &str, _stats: &TestFailedStats) {}

    /// Called when a test is skipped.
    fn test_skipped(&self, _suite: &str, _test: &str, _stats: &TestSkippedStats) {}

    /// Called after a suite's last test and its tear-down.
    fn suite_finished(&self, _suite: &str, _stats: &SuiteFinishedStats) {}

    /// Called once after every suite has finished.
    fn finished(&self) {}
}

struct Registered {
    plugin: Arc<dyn Plugin>,
    options: Option<PluginOptions>,
}

/// Ordered collection of registered plugins.
#[derive(Default)]
pub struct PluginBus {
    plugins: Vec<Registered>,
    prefixes: BTreeMap<String, usize>,
}

impl PluginBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin`, routing matching entries of `options` to it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateOptionPrefix`] when another
    /// registered plugin already owns the plugin's option prefix.
    pub fn register(
        &mut self,
        plugin: Arc<dyn Plugin>,
        options: &[String],
    ) -> Result<(), ConfigurationError> {
        let declared = plugin.options();
        if let Some(declared) = &declared {
            let prefix = declared.prefix();
            if let Some(existing) = self
                .prefixes
                .get(prefix)
                .and_then(|index| self.plugins.get(*index))
            {
                return Err(ConfigurationError::DuplicateOptionPrefix {
                    prefix: prefix.to_owned(),
                    existing: existing.plugin.name().to_owned(),
                    plugin: plugin.name().to_owned(),
                });
            }
            for (name, value) in options.iter().filter_map(|opt| route_option(prefix, opt)) {
                log::debug!("routing option {prefix}.{name} to {}", plugin.name());
                plugin.set_option(name, value);
            }
            self.prefixes.insert(prefix.to_owned(), self.plugins.len());
        }
        self.plugins.push(Registered {
            plugin,
            options: declared,
        });
        Ok(())
    }

    /// Delivers `event` to every plugin in registration order.
    pub fn emit(&self, event: PluginEvent<'_>) {
        for registered in &self.plugins {
            let plugin = registered.plugin.as_ref();
            match event {
                PluginEvent::Starting => plugin.starting(),
                PluginEvent::SuiteStarting { suite } => plugin.suite_starting(suite),
                PluginEvent::TestStarting { suite, test } => plugin.test_starting(suite, test),
                PluginEvent::TestPassed { suite, test, stats } => {
                    plugin.test_passed(suite, test, stats);
                }
                PluginEvent::TestFailed { suite, test, stats } => {
                    plugin.test_failed(suite, test, stats);
                }
                PluginEvent::TestSkipped { suite, test, stats } => {
                    plugin.test_skipped(suite, test, stats);
                }
                PluginEvent::SuiteFinished { suite, stats } => plugin.suite_finished(suite, stats),
                PluginEvent::Finished => plugin.finished(),
            }
        }
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true when no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Renders every declared option, sorted by prefix then name.
    #[must_use]
    pub fn help(&self) -> String {
        let mut out = String::new();
        for index in self.prefixes.values() {
            let Some(Registered {
                options: Some(options),
                ..
            }) = self.plugins.get(*index)
            else {
                continue;
            };
            for (name, option) in options.options() {
                let _ = write!(out, "  {}.{name} - {}", options.prefix(), option.help());
                if !option.default_value().is_empty() {
                    let _ = write!(out, " (default: {})", option.default_value());
                }
                out.push('\n');
            }
        }
        out
    }
}

impl fmt::Debug for PluginBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.plugins.iter().map(|r| r.plugin.name()).collect();
        f.debug_struct("PluginBus").field("plugins", &names).finish()
    }
}

/// Splits `prefix.name=value` into `(name, value)` when it targets `prefix`.
///
/// A missing `=` yields an empty value.
fn route_option<'a>(prefix: &str, option: &'a str) -> Option<(&'a str, &'a str)> {
    let (key, value) = option.split_once('=').unwrap_or((option, ""));
    let name = key.strip_prefix(prefix)?.strip_prefix('.')?;
    Some((name, value))
}
