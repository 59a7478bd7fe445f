//! Per-run engine configuration.
//!
//! [`EngineConfig`] carries suite filters, plugin option strings, the help and
//! capture switches, and the engine-wide hooks run around every test. It can be
//! built in code or read from `SUITECASE_*` environment variables.

use std::fmt;
use std::sync::Arc;

use crate::capture::OutputCapture;
use crate::context::T;
use crate::error::CaptureError;

/// Hook run around every test of every suite.
pub type GlobalHook = Arc<dyn Fn(&T) + Send + Sync>;

/// Opens the capture window of one sequential test.
///
/// `Ok(None)` runs the test uncaptured; an error fails that test alone.
pub type CaptureOpener = Arc<dyn Fn(&T) -> Result<Option<OutputCapture>, CaptureError> + Send + Sync>;

/// Comma separated suite names to run exclusively.
pub const INCLUDE_VAR: &str = "SUITECASE_INCLUDE";
/// Comma separated suite names to skip.
pub const EXCLUDE_VAR: &str = "SUITECASE_EXCLUDE";
/// Semicolon separated `prefix.name=value` plugin options.
pub const OPT_VAR: &str = "SUITECASE_OPT";
/// Boolean requesting the option listing instead of a run.
pub const HELP_VAR: &str = "SUITECASE_HELP";
/// Boolean controlling per-test output capture.
pub const CAPTURE_VAR: &str = "SUITECASE_CAPTURE";

const TRUTHY: [&str; 4] = ["1", "true", "yes", "on"];
const FALSY: [&str; 4] = ["0", "false", "no", "off"];

/// Reads a switch value, ignoring case and surrounding whitespace.
fn parse_switch(value: &str) -> Option<bool> {
    let value = value.trim();
    let matches = |words: &[&str]| words.iter().any(|word| word.eq_ignore_ascii_case(value));
    if matches(&TRUTHY) {
        Some(true)
    } else if matches(&FALSY) {
        Some(false)
    } else {
        None
    }
}

fn split_list(value: &str, separator: char) -> impl Iterator<Item = &str> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// Configuration shared read-only by every suite in a run.
///
/// # Examples
///
/// ```
/// use suitecase::EngineConfig;
///
/// let config = EngineConfig::new().include(["Checkout"]).exclude(["Slow"]);
/// assert!(config.selects("checkout"));
/// assert!(!config.selects("Inventory"));
/// ```
#[derive(Clone)]
pub struct EngineConfig {
    include: Vec<String>,
    exclude: Vec<String>,
    options: Vec<String>,
    help: bool,
    capture: bool,
    set_up_all_tests: Option<GlobalHook>,
    tear_down_all_tests: Option<GlobalHook>,
    capture_opener: CaptureOpener,
}

impl EngineConfig {
    /// Creates a configuration that runs every suite with output capture.
    #[must_use]
    pub fn new() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            options: Vec::new(),
            help: false,
            capture: true,
            set_up_all_tests: None,
            tear_down_all_tests: None,
            capture_opener: Arc::new(|_| OutputCapture::open().map(Some)),
        }
    }

    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, keyed by variable name.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::new();
        if let Some(value) = lookup(INCLUDE_VAR) {
            config = config.include(split_list(&value, ','));
        }
        if let Some(value) = lookup(EXCLUDE_VAR) {
            config = config.exclude(split_list(&value, ','));
        }
        if let Some(value) = lookup(OPT_VAR) {
            config.options.extend(split_list(&value, ';').map(str::to_owned));
        }
        let flag = |name| lookup(name).as_deref().and_then(parse_switch);
        config.help = flag(HELP_VAR).unwrap_or(false);
        config.capture = flag(CAPTURE_VAR).unwrap_or(true);
        config
    }

    /// Restricts the run to the named suites, compared case-insensitively.
    #[must_use]
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.include
            .extend(names.into_iter().map(|name| name.as_ref().to_lowercase()));
        self
    }

    /// Skips the named suites, compared case-insensitively.
    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude
            .extend(names.into_iter().map(|name| name.as_ref().to_lowercase()));
        self
    }

    /// Adds a `prefix.name=value` plugin option.
    #[must_use]
    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    /// Requests the option listing instead of a run.
    #[must_use]
    pub const fn help(mut self, help: bool) -> Self {
        self.help = help;
        self
    }

    /// Enables or disables per-test output capture.
    #[must_use]
    pub const fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Replaces how capture windows are opened; [`OutputCapture::open`] by
    /// default.
    #[must_use]
    pub fn capture_with(
        mut self,
        opener: impl Fn(&T) -> Result<Option<OutputCapture>, CaptureError> + Send + Sync + 'static,
    ) -> Self {
        self.capture_opener = Arc::new(opener);
        self
    }

    /// Sets the hook run before every test.
    #[must_use]
    pub fn set_up_all_tests(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.set_up_all_tests = Some(Arc::new(hook));
        self
    }

    /// Sets the hook run after every test.
    #[must_use]
    pub fn tear_down_all_tests(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.tear_down_all_tests = Some(Arc::new(hook));
        self
    }

    /// Returns true when a suite named `name` passes the filters.
    #[must_use]
    pub fn selects(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        (self.include.is_empty() || self.include.contains(&lower))
            && !self.exclude.contains(&lower)
    }

    /// Returns the plugin option strings.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Returns true when help was requested.
    #[must_use]
    pub const fn help_requested(&self) -> bool {
        self.help
    }

    /// Returns true when output capture is enabled.
    #[must_use]
    pub const fn capture_enabled(&self) -> bool {
        self.capture
    }

    pub(crate) fn set_up_hook(&self) -> Option<&GlobalHook> {
        self.set_up_all_tests.as_ref()
    }

    pub(crate) fn tear_down_hook(&self) -> Option<&GlobalHook> {
        self.tear_down_all_tests.as_ref()
    }

    pub(crate) fn open_capture(&self, t: &T) -> Result<Option<OutputCapture>, CaptureError> {
        (self.capture_opener)(t)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("options", &self.options)
            .field("help", &self.help)
            .field("capture", &self.capture)
            .field("set_up_all_tests", &self.set_up_all_tests.is_some())
            .field("tear_down_all_tests", &self.tear_down_all_tests.is_some())
            .finish()
    }
}
