//! Suite declarations: the [`Suite`] trait, method tables and registration.

use std::fmt;

use suitecase_harness::HostTest;

use crate::context::T;
use crate::runner::{ErasedSuite, SuiteHolder};
use crate::signal::TestResult;
use crate::signature::ParamType;

/// Hook taking no context; only valid for suite-level hooks.
pub type BareFn<S> = fn(&mut S);
/// Procedure taking the host driver's handle (deprecated convention).
pub type LegacyFn<S> = fn(&S, &HostTest);
/// Procedure taking the engine test context (current convention).
pub type ContextFn<S> = fn(&S, &T) -> TestResult;

/// A callable suite method together with its parameter shape.
pub enum Procedure<S> {
    /// No parameters; receives the suite exclusively.
    Bare(BareFn<S>),
    /// One host-handle parameter.
    Legacy(LegacyFn<S>),
    /// One engine-context parameter.
    Context(ContextFn<S>),
}

impl<S> Procedure<S> {
    /// Returns the parameter list checked against the method conventions.
    #[must_use]
    pub const fn params(&self) -> &'static [ParamType] {
        match self {
            Self::Bare(_) => &[],
            Self::Legacy(_) => &[ParamType::LegacyContext],
            Self::Context(_) => &[ParamType::Context],
        }
    }
}

impl<S> Clone for Procedure<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Procedure<S> {}

impl<S> fmt::Debug for Procedure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Bare(_) => "Bare",
            Self::Legacy(_) => "Legacy",
            Self::Context(_) => "Context",
        };
        f.debug_tuple(kind).finish_non_exhaustive()
    }
}

/// A named entry in a suite's method table.
///
/// Names beginning with `Test` are tests; `SetUpSuite`, `TearDownSuite`,
/// `SetUpTest` and `TearDownTest` are lifecycle hooks. Other names are ignored.
pub struct Method<S> {
    name: &'static str,
    procedure: Procedure<S>,
    parallel: bool,
}

impl<S> Method<S> {
    /// Creates a method entry.
    #[must_use]
    pub const fn new(name: &'static str, procedure: Procedure<S>) -> Self {
        Self {
            name,
            procedure,
            parallel: false,
        }
    }

    /// Creates an entry for a parameterless hook.
    #[must_use]
    pub const fn bare(name: &'static str, hook: BareFn<S>) -> Self {
        Self::new(name, Procedure::Bare(hook))
    }

    /// Creates an entry using the deprecated host-handle convention.
    #[must_use]
    pub const fn legacy(name: &'static str, procedure: LegacyFn<S>) -> Self {
        Self::new(name, Procedure::Legacy(procedure))
    }

    /// Creates an entry using the engine-context convention.
    #[must_use]
    pub const fn context(name: &'static str, procedure: ContextFn<S>) -> Self {
        Self::new(name, Procedure::Context(procedure))
    }

    /// Schedules this test in parallel with the suite's other parallel tests.
    #[must_use]
    pub const fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Returns the method name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the procedure.
    #[must_use]
    pub const fn procedure(&self) -> Procedure<S> {
        self.procedure
    }

    /// Returns true when the test asked for parallel scheduling.
    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.parallel
    }
}

impl<S> fmt::Debug for Method<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("procedure", &self.procedure)
            .field("parallel", &self.parallel)
            .finish()
    }
}

/// A group of tests sharing set-up and tear-down hooks.
///
/// # Examples
///
/// ```
/// use suitecase::{Method, Suite, TestResult, T};
///
/// #[derive(Default)]
/// struct ArithmeticSuite {
///     base: i32,
/// }
///
/// impl ArithmeticSuite {
///     fn set_up_suite(&mut self) {
///         self.base = 40;
///     }
///
///     fn test_addition(&self, t: &T) -> TestResult {
///         if self.base + 2 != 42 {
///             return t.fatal("bad sum");
///         }
///         Ok(())
///     }
/// }
///
/// impl Suite for ArithmeticSuite {
///     fn methods() -> Vec<Method<Self>> {
///         vec![
///             Method::bare("SetUpSuite", Self::set_up_suite),
///             Method::context("TestAddition", Self::test_addition),
///         ]
///     }
/// }
///
/// assert_eq!(ArithmeticSuite::default().name(), "ArithmeticSuite");
/// ```
pub trait Suite: Send + Sync + 'static {
    /// Returns the suite's methods in declaration order.
    fn methods() -> Vec<Method<Self>>
    where
        Self: Sized;

    /// Returns the suite name used in test names, filters and reports.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).to_owned()
    }

    /// Returns true to schedule the suite, and every test in it, in parallel.
    fn parallel(&self) -> bool {
        false
    }
}

/// Strips the module path and generic arguments from a type name.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// A suite submitted to the global registry with [`register_suite!`].
///
/// [`register_suite!`]: crate::register_suite
pub struct SuiteRegistration {
    build: fn() -> Box<dyn ErasedSuite>,
    suppress_deprecations: bool,
}

impl SuiteRegistration {
    /// Creates a registration building the suite with [`Default`].
    #[must_use]
    pub const fn new<S: Suite + Default>(suppress_deprecations: bool) -> Self {
        Self {
            build: build_default::<S>,
            suppress_deprecations,
        }
    }

    pub(crate) fn build(&self) -> Box<dyn ErasedSuite> {
        (self.build)()
    }

    pub(crate) const fn suppress_deprecations(&self) -> bool {
        self.suppress_deprecations
    }
}

impl fmt::Debug for SuiteRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteRegistration")
            .field("suppress_deprecations", &self.suppress_deprecations)
            .finish_non_exhaustive()
    }
}

fn build_default<S: Suite + Default>() -> Box<dyn ErasedSuite> {
    Box::new(SuiteHolder::new(S::default()))
}

inventory::collect!(SuiteRegistration);

/// Register a suite with the global registry.
///
/// Registered suites are added to an engine by
/// [`Engine::add_registered_suites`](crate::Engine::add_registered_suites).
/// The suite type must implement [`Default`]. Pass `suppress_deprecations` to
/// keep the suite's deprecated conventions out of the run summary.
///
/// # Examples
///
/// ```
/// use suitecase::{register_suite, Method, Suite};
///
/// #[derive(Default)]
/// struct EmptySuite;
///
/// impl Suite for EmptySuite {
///     fn methods() -> Vec<Method<Self>> {
///         Vec::new()
///     }
/// }
///
/// register_suite!(EmptySuite);
/// ```
#[macro_export]
macro_rules! register_suite {
    ($suite:ty) => {
        $crate::submit! {
            $crate::SuiteRegistration::new::<$suite>(false)
        }
    };
    ($suite:ty, suppress_deprecations) => {
        $crate::submit! {
            $crate::SuiteRegistration::new::<$suite>(true)
        }
    };
}
