//! Versioned lifecycle and test method conventions.
//!
//! Each [`MethodDef`] lists the parameter shapes that have been valid for one
//! canonical method name over time. Older shapes stay supported but are
//! flagged deprecated so suites can migrate at their own pace. Resolution
//! takes the first [`ParamSet`] in declaration order whose parameters match,
//! independent of the version number it carries.

use crate::error::SignatureError;

/// The type of one positional parameter in a method convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// The host driver's own per-test handle ([`suitecase_harness::HostTest`]).
    LegacyContext,
    /// The engine test context ([`crate::T`]).
    Context,
}

/// One historically valid parameter shape for a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSet {
    version: u32,
    deprecated: bool,
    params: &'static [ParamType],
}

impl ParamSet {
    /// Creates a parameter set.
    #[must_use]
    pub const fn new(version: u32, deprecated: bool, params: &'static [ParamType]) -> Self {
        Self {
            version,
            deprecated,
            params,
        }
    }

    /// Returns the convention version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns true when the convention is still accepted but discouraged.
    #[must_use]
    pub const fn deprecated(&self) -> bool {
        self.deprecated
    }

    /// Returns the ordered parameter types.
    #[must_use]
    pub const fn params(&self) -> &'static [ParamType] {
        self.params
    }
}

/// A successful resolution of a candidate against a [`MethodDef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Version of the matching parameter set.
    pub version: u32,
    /// Whether the matching parameter set is deprecated.
    pub deprecated: bool,
}

/// A canonical method name and the parameter sets accepted for it.
///
/// # Examples
///
/// ```
/// use suitecase::signature::{MethodDef, ParamSet, ParamType, Resolved};
///
/// static SETS: [ParamSet; 2] = [
///     ParamSet::new(1, true, &[ParamType::LegacyContext]),
///     ParamSet::new(2, false, &[ParamType::Context]),
/// ];
/// let def = MethodDef::new("MyFunc", &SETS);
///
/// assert_eq!(
///     def.validate(Some(&[ParamType::Context])),
///     Ok(Resolved { version: 2, deprecated: false })
/// );
/// assert!(def.validate(Some(&[])).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDef {
    name: &'static str,
    param_sets: &'static [ParamSet],
}

impl MethodDef {
    /// Creates a method definition.
    #[must_use]
    pub const fn new(name: &'static str, param_sets: &'static [ParamSet]) -> Self {
        Self { name, param_sets }
    }

    /// Returns the canonical method name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the parameter sets in declaration order.
    #[must_use]
    pub const fn param_sets(&self) -> &'static [ParamSet] {
        self.param_sets
    }

    /// Validates a candidate's parameter list against this definition.
    ///
    /// `None` stands for a method the suite does not define.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidValue`] when no candidate is supplied
    /// and [`SignatureError::UnsupportedMethod`] when no parameter set matches
    /// both the parameter count and every parameter type.
    pub fn validate(&self, candidate: Option<&[ParamType]>) -> Result<Resolved, SignatureError> {
        let params = candidate.ok_or(SignatureError::InvalidValue)?;
        self.param_sets
            .iter()
            .filter(|set| set.params.len() == params.len())
            .find(|set| set.params.iter().zip(params).all(|(want, got)| want == got))
            .map(|set| Resolved {
                version: set.version,
                deprecated: set.deprecated,
            })
            .ok_or(SignatureError::UnsupportedMethod { method: self.name })
    }
}

static NO_PARAMS: [ParamSet; 1] = [ParamSet::new(1, false, &[])];

static CONTEXT_PARAMS: [ParamSet; 2] = [
    ParamSet::new(1, true, &[ParamType::LegacyContext]),
    ParamSet::new(2, false, &[ParamType::Context]),
];

/// Engine-wide hook run before every test.
pub static SET_UP_ALL_TESTS: MethodDef = MethodDef::new("SetUpAllTests", &NO_PARAMS);
/// Engine-wide hook run after every test.
pub static TEAR_DOWN_ALL_TESTS: MethodDef = MethodDef::new("TearDownAllTests", &NO_PARAMS);
/// Suite hook run before the suite's first test.
pub static SET_UP_SUITE: MethodDef = MethodDef::new("SetUpSuite", &NO_PARAMS);
/// Suite hook run after the suite's last test.
pub static TEAR_DOWN_SUITE: MethodDef = MethodDef::new("TearDownSuite", &NO_PARAMS);
/// Suite hook run before each test.
pub static SET_UP_TEST: MethodDef = MethodDef::new("SetUpTest", &CONTEXT_PARAMS);
/// Suite hook run after each test.
pub static TEAR_DOWN_TEST: MethodDef = MethodDef::new("TearDownTest", &CONTEXT_PARAMS);
/// Every test procedure.
pub static TEST: MethodDef = MethodDef::new("Test", &CONTEXT_PARAMS);

/// Returns the built-in definition for a canonical method name.
///
/// Names beginning with `Test` resolve to [`TEST`].
#[must_use]
pub fn builtin(name: &str) -> Option<&'static MethodDef> {
    static ALL: [&MethodDef; 6] = [
        &SET_UP_ALL_TESTS,
        &TEAR_DOWN_ALL_TESTS,
        &SET_UP_SUITE,
        &TEAR_DOWN_SUITE,
        &SET_UP_TEST,
        &TEAR_DOWN_TEST,
    ];
    ALL.iter()
        .copied()
        .find(|def| def.name == name)
        .or_else(|| name.starts_with(TEST.name).then_some(&TEST))
}
