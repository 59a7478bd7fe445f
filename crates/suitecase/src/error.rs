//! Error types raised while configuring and running suites.

use thiserror::Error;

/// Failure to resolve a candidate procedure against a method definition.
///
/// # Examples
/// ```
/// use suitecase::SignatureError;
///
/// let err = SignatureError::UnsupportedMethod { method: "SetUpTest" };
/// assert_eq!(err.to_string(), "unsupported signature for method SetUpTest");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The candidate is absent or not a callable procedure.
    #[error("invalid value: no callable procedure was supplied")]
    InvalidValue,
    /// No parameter set of the definition matches the candidate.
    #[error("unsupported signature for method {method}")]
    UnsupportedMethod {
        /// Canonical name of the method definition.
        method: &'static str,
    },
}

/// Fatal configuration defects that abort a run or a suite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// Two plugins declared the same option prefix.
    #[error(
        "option prefix \"{prefix}\" has already been registered by {existing}; \
         {plugin} may be registered twice or its prefix collides with another plugin"
    )]
    DuplicateOptionPrefix {
        /// The colliding prefix.
        prefix: String,
        /// Name of the plugin that registered the prefix first.
        existing: String,
        /// Name of the plugin whose registration was rejected.
        plugin: String,
    },
    /// A suite method uses a signature no convention supports.
    #[error("{suite}.{method} has an unsupported signature")]
    UnsupportedMethod {
        /// Name of the suite declaring the method.
        suite: String,
        /// Name of the offending method.
        method: String,
    },
}

/// Failure to redirect standard output for a test.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaptureError {
    /// An operating system call failed.
    #[error("unable to {operation}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Output capture is not available on this platform.
    #[error("output capture is not supported on this platform")]
    Unsupported,
}

impl CaptureError {
    pub(crate) fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }
}
