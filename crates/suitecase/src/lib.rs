//! Suite-oriented test engine.
//!
//! `suitecase` groups test procedures into named suites with shared set-up and
//! tear-down hooks, runs them under a host test driver, captures their output
//! and reports pass, fail and skip outcomes to pluggable observers.
//!
//! A suite implements [`Suite`] by listing its [`Method`]s. Methods named
//! `SetUpSuite`, `TearDownSuite`, `SetUpTest` and `TearDownTest` are lifecycle
//! hooks; every method whose name begins with `Test` is a test. Test procedures
//! receive a [`T`] context and return a [`TestResult`], propagating
//! [`T::fatal`] and [`T::skip`] with `?`.
//!
//! ```no_run
//! use std::process::ExitCode;
//! use suitecase::{Engine, EngineConfig, Method, Suite, TestResult, T};
//!
//! #[derive(Default)]
//! struct CartSuite {
//!     items: Vec<u32>,
//! }
//!
//! impl CartSuite {
//!     fn set_up_suite(&mut self) {
//!         self.items = vec![2, 3];
//!     }
//!
//!     fn test_total(&self, t: &T) -> TestResult {
//!         let total: u32 = self.items.iter().sum();
//!         if total != 5 {
//!             return t.fatal(format!("Expected\n    5\nto equal\n    {total}"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! impl Suite for CartSuite {
//!     fn methods() -> Vec<Method<Self>> {
//!         vec![
//!             Method::bare("SetUpSuite", Self::set_up_suite),
//!             Method::context("TestTotal", Self::test_total),
//!         ]
//!     }
//! }
//!
//! fn main() -> ExitCode {
//!     let mut engine = Engine::new(EngineConfig::from_env());
//!     engine.add_suite(CartSuite::default());
//!     engine.run_main()
//! }
//! ```

pub mod capture;
pub mod config;
pub mod context;
pub mod deprecation;
pub mod differ;
pub mod engine;
pub mod error;
pub mod plugin;
mod runner;
pub mod signal;
pub mod signature;
pub mod stats;
pub mod suite;

pub use capture::OutputCapture;
pub use config::{CaptureOpener, EngineConfig, GlobalHook};
pub use context::{BackgroundHandle, T, TestName};
pub use differ::Differ;
pub use engine::{Engine, RunReport, SuiteSettings};
pub use error::{CaptureError, ConfigurationError, SignatureError};
pub use inventory::{iter, submit};
pub use plugin::{
    Plugin, PluginBus, PluginEvent, PluginOption, PluginOptions, SuiteFinishedStats,
    TestFailedStats, TestPassedStats, TestSkippedStats,
};
pub use signal::{FailureSignal, Frame, Signal, SkipSignal, TestResult, raise_failure, raise_skip};
pub use stats::{StatsPlugin, SuiteTally};
pub use suite::{Method, Procedure, Suite, SuiteRegistration};
