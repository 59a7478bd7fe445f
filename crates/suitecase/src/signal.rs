//! Failure and skip signals for test procedures.
//!
//! Context operations that stop a test ([`crate::T::fail_now`],
//! [`crate::T::fatal`], [`crate::T::skip`]) return a [`Signal`] that test
//! procedures propagate with `?`. Helpers buried deep in a call stack, and
//! external matcher libraries that cannot return a value, use
//! [`raise_failure`] or [`raise_skip`] instead; these unwind with a signal
//! payload that the runner's recovery boundary converts back into a
//! [`Signal`]. Any other unwind payload is re-raised untouched.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::path::{Component, Path};

use suitecase_harness::describe_panic;

/// Outcome returned by test procedures and lifecycle hooks.
pub type TestResult = Result<(), Signal>;

/// Module prefixes that belong to the language runtime and are never reported.
const RUNTIME_PREFIXES: [&str; 13] = [
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "test::",
    "<std::",
    "<core::",
    "<alloc::",
    "__rust",
    "rust_begin_unwind",
    "__libc_start",
    "_start",
    "start_thread",
];

/// Module prefixes that belong to the engine itself.
const ENGINE_PREFIXES: [&str; 4] = [
    "suitecase::",
    "<suitecase::",
    "suitecase_harness::",
    "<suitecase_harness::",
];

/// One call-stack frame recorded with a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    file: String,
    line: u32,
    hidden: bool,
}

impl Frame {
    /// Creates a frame.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, hidden: bool) -> Self {
        Self {
            file: file.into(),
            line,
            hidden,
        }
    }

    fn site(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line(), false)
    }

    /// Returns the source file path.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Returns the one-based line number.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Returns true for engine-internal frames omitted from default reports.
    #[must_use]
    pub const fn hidden(&self) -> bool {
        self.hidden
    }

    fn same_location(&self, file: &str, line: u32) -> bool {
        let (ours, theirs) = (Path::new(&self.file), Path::new(file));
        self.line == line && (ours.ends_with(theirs) || theirs.ends_with(ours))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Path::new(&self.file)
            .file_name()
            .map_or_else(|| self.file.clone(), |name| name.to_string_lossy().into_owned());
        write!(f, "{name}:{}", self.line)
    }
}

/// Payload describing a test failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureSignal {
    message: String,
    frames: Vec<Frame>,
}

impl FailureSignal {
    /// Creates a failure with explicit frames.
    #[must_use]
    pub fn new(message: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            message: message.into(),
            frames,
        }
    }

    /// Creates a failure whose frames start at the caller.
    #[must_use]
    #[track_caller]
    pub fn capture(message: impl Into<String>) -> Self {
        Self::new(message, capture_frames(Location::caller()))
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the frames, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Consumes the failure, returning its parts.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Frame>) {
        (self.message, self.frames)
    }
}

/// Payload describing a skip request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkipSignal {
    message: Option<String>,
}

impl SkipSignal {
    /// Creates a skip request with an optional message.
    #[must_use]
    pub fn new(message: Option<String>) -> Self {
        Self { message }
    }

    /// Returns the skip message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for SkipSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_deref().unwrap_or("test skipped"))
    }
}

/// Control value that stops the current test body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// The test failed and must stop.
    Failure(FailureSignal),
    /// The test asked to be skipped.
    Skip(SkipSignal),
}

impl Signal {
    /// Returns true for skip requests.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}

impl From<FailureSignal> for Signal {
    fn from(value: FailureSignal) -> Self {
        Self::Failure(value)
    }
}

impl From<SkipSignal> for Signal {
    fn from(value: SkipSignal) -> Self {
        Self::Skip(value)
    }
}

/// Aborts the current test by unwinding with a failure payload.
///
/// Intended for helpers that cannot return a [`Signal`], such as fail handlers
/// of external matcher libraries. Must only be called while a suite test is
/// running; elsewhere it behaves like an ordinary panic.
///
/// # Examples
///
/// ```
/// use suitecase::signal::{raise_failure, FailureSignal};
///
/// let payload = std::panic::catch_unwind(|| raise_failure("expected true")).unwrap_err();
/// let failure = payload.downcast::<FailureSignal>().unwrap();
/// assert_eq!(failure.message(), "expected true");
/// ```
#[track_caller]
pub fn raise_failure(message: impl Into<String>) -> ! {
    panic::resume_unwind(Box::new(FailureSignal::capture(message)))
}

/// Aborts the current test by unwinding with a skip payload.
pub fn raise_skip(message: Option<String>) -> ! {
    panic::resume_unwind(Box::new(SkipSignal::new(message)))
}

/// Unwind payload that is not a suitecase signal.
pub(crate) type ForeignPayload = Box<dyn Any + Send>;

/// Runs `body`, separating signals from foreign unwinds.
///
/// Returned signals and unwinds carrying a signal payload both yield
/// `Ok(Some(signal))`; any other unwind payload is handed back untouched so
/// the caller can finish cleanup before resuming it.
pub(crate) fn catch(body: impl FnOnce() -> TestResult) -> Result<Option<Signal>, ForeignPayload> {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => Ok(None),
        Ok(Err(signal)) => Ok(Some(signal)),
        Err(payload) => signal_from_payload(payload).map(Some),
    }
}

/// Runs `body` inside the recovery boundary.
///
/// Like [`catch`], but any foreign unwind is resumed immediately.
pub(crate) fn recover(body: impl FnOnce() -> TestResult) -> Option<Signal> {
    catch(body).unwrap_or_else(|payload| {
        log::warn!("re-raising an unwind that is not a suitecase signal");
        panic::resume_unwind(payload)
    })
}

/// Renders an unwind payload, naming signal payloads by their message.
pub(crate) fn describe_payload(payload: &(dyn Any + Send)) -> String {
    describe_panic(payload, |payload| {
        payload
            .downcast_ref::<FailureSignal>()
            .map(|failure| failure.message().to_owned())
            .or_else(|| {
                payload
                    .downcast_ref::<SkipSignal>()
                    .map(|skip| format!("skip requested: {skip}"))
            })
    })
}

fn signal_from_payload(payload: ForeignPayload) -> Result<Signal, ForeignPayload> {
    payload
        .downcast::<FailureSignal>()
        .map(|failure| Signal::Failure(*failure))
        .or_else(|payload| payload.downcast::<SkipSignal>().map(|skip| Signal::Skip(*skip)))
}

#[derive(Debug, PartialEq, Eq)]
struct RawFrame<'a> {
    symbol: &'a str,
    file: &'a str,
    line: u32,
}

/// Extracts symbol and location pairs from a rendered standard backtrace.
fn parse_backtrace(trace: &str) -> Vec<RawFrame<'_>> {
    let mut frames = Vec::new();
    let mut symbol = None;
    for line in trace.lines().map(str::trim) {
        match line.strip_prefix("at ") {
            Some(location) => {
                let parsed = location
                    .rsplit_once(':')
                    .and_then(|(rest, _column)| rest.rsplit_once(':'))
                    .and_then(|(file, line)| Some((file, line.parse().ok()?)));
                if let (Some(symbol), Some((file, line))) = (symbol, parsed) {
                    frames.push(RawFrame { symbol, file, line });
                }
            }
            None => {
                let numbered = line
                    .split_once(": ")
                    .filter(|(index, _)| index.chars().all(|c| c.is_ascii_digit()));
                if let Some((_, name)) = numbered {
                    symbol = Some(name);
                }
            }
        }
    }
    frames
}

fn is_runtime_frame(frame: &RawFrame<'_>) -> bool {
    frame.file.starts_with("/rustc/")
        || RUNTIME_PREFIXES
            .iter()
            .any(|prefix| frame.symbol.starts_with(prefix))
}

fn is_fixture_file(file: &str) -> bool {
    Path::new(file)
        .components()
        .any(|component| component == Component::Normal("tests".as_ref()))
}

fn classify(frame: &RawFrame<'_>) -> Option<Frame> {
    if is_runtime_frame(frame) {
        return None;
    }
    let engine = ENGINE_PREFIXES
        .iter()
        .any(|prefix| frame.symbol.starts_with(prefix));
    Some(Frame::new(
        frame.file,
        frame.line,
        engine && !is_fixture_file(frame.file),
    ))
}

fn frames_from_trace(site: &Location<'_>, trace: &str) -> Vec<Frame> {
    let mut frames = vec![Frame::site(site)];
    for frame in parse_backtrace(trace).iter().filter_map(classify) {
        if !frames
            .iter()
            .any(|seen| seen.same_location(frame.file(), frame.line()))
        {
            frames.push(frame);
        }
    }
    frames
}

fn capture_frames(site: &Location<'_>) -> Vec<Frame> {
    frames_from_trace(site, &Backtrace::force_capture().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = "\
   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: suitecase::signal::capture_frames
             at ./crates/suitecase/src/signal.rs:280:5
   2: my_suite::CheckoutSuite::test_total
             at ./crates/app/src/checkout.rs:42:9
   3: suitecase::runner::run_test
             at ./crates/suitecase/src/runner.rs:120:13
   4: suitecase::fixtures::helper
             at ./crates/suitecase/tests/support/mod.rs:18:5
   5: core::ops::function::FnOnce::call_once
             at /rustc/abc/library/core/src/ops/function.rs:250:5
   6: main
";

    #[test]
    fn parses_symbols_with_locations() {
        let frames = parse_backtrace(TRACE);
        assert_eq!(frames.len(), 6);
        assert_eq!(
            frames.get(2),
            Some(&RawFrame {
                symbol: "my_suite::CheckoutSuite::test_total",
                file: "./crates/app/src/checkout.rs",
                line: 42,
            })
        );
    }

    #[test]
    fn runtime_frames_are_dropped_and_engine_frames_hidden() {
        let frames: Vec<_> = parse_backtrace(TRACE).iter().filter_map(classify).collect();
        assert_eq!(
            frames,
            [
                Frame::new("./crates/suitecase/src/signal.rs", 280, true),
                Frame::new("./crates/app/src/checkout.rs", 42, false),
                Frame::new("./crates/suitecase/src/runner.rs", 120, true),
                Frame::new("./crates/suitecase/tests/support/mod.rs", 18, false),
            ]
        );
    }

    #[test]
    fn site_frame_leads_and_duplicates_are_dropped() {
        let site = Location::caller();
        let trace = format!(
            "   0: my_suite::helper\n             at /abs/{}:{}:1\n",
            site.file(),
            site.line()
        );
        let frames = frames_from_trace(site, &trace);
        assert_eq!(frames.len(), 1);
        assert!(frames.iter().all(|frame| !frame.hidden()));
    }

    #[test]
    fn captured_failure_starts_at_caller() {
        let line = line!() + 1;
        let failure = FailureSignal::capture("boom");
        let Some(first) = failure.frames().first() else {
            panic!("capture should record the call site");
        };
        assert_eq!(first.line(), line);
        assert!(first.file().ends_with("signal.rs"));
        assert_eq!(first.to_string(), format!("signal.rs:{line}"));
    }

    #[test]
    fn recover_converts_payloads_into_signals() {
        let failure = recover(|| raise_failure("unwound"));
        assert!(matches!(failure, Some(Signal::Failure(ref f)) if f.message() == "unwound"));

        let skip = recover(|| raise_skip(Some("later".into())));
        assert_eq!(
            skip,
            Some(Signal::Skip(SkipSignal::new(Some("later".into()))))
        );

        assert_eq!(recover(|| Ok(())), None);
    }

    #[test]
    fn recover_reraises_foreign_payloads() {
        let outcome = panic::catch_unwind(|| {
            recover(|| panic::resume_unwind(Box::new(17_u8)));
        });
        let Err(payload) = outcome else {
            panic!("foreign payload should propagate");
        };
        assert_eq!(payload.downcast_ref::<u8>(), Some(&17));
    }

    #[test]
    fn payload_descriptions_name_signals() {
        let failure: ForeignPayload = Box::new(FailureSignal::new("db down", Vec::new()));
        assert_eq!(describe_payload(failure.as_ref()), "db down");

        let skip: ForeignPayload = Box::new(SkipSignal::new(Some("no database".into())));
        assert_eq!(describe_payload(skip.as_ref()), "skip requested: no database");

        let bare_skip: ForeignPayload = Box::new(SkipSignal::default());
        assert_eq!(describe_payload(bare_skip.as_ref()), "skip requested: test skipped");

        let text: ForeignPayload = Box::new("plain panic");
        assert_eq!(describe_payload(text.as_ref()), "plain panic");
    }
}
