//! Bookkeeping for suites still using deprecated method conventions.

use std::collections::HashSet;
use std::fmt;

/// Number of usages listed individually in the run summary.
pub const MAX_EXAMPLES: usize = 5;

/// One method resolved against a deprecated convention.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeprecatedUsage {
    /// Suite declaring the method.
    pub suite: String,
    /// Method name.
    pub method: String,
    /// Version of the matching convention.
    pub version: u32,
}

impl fmt::Display for DeprecatedUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} (convention v{})", self.suite, self.method, self.version)
    }
}

/// Per-suite log of deprecated usages.
#[derive(Clone, Debug, Default)]
pub struct DeprecationLog {
    suppressed: bool,
    usages: Vec<DeprecatedUsage>,
}

impl DeprecationLog {
    /// Creates a log; a suppressed log ignores every usage.
    #[must_use]
    pub const fn new(suppressed: bool) -> Self {
        Self {
            suppressed,
            usages: Vec::new(),
        }
    }

    /// Records a usage unless the log is suppressed.
    pub fn note(&mut self, suite: &str, method: &str, version: u32) {
        if self.suppressed {
            log::debug!("suppressed deprecation for {suite}.{method}");
            return;
        }
        self.usages.push(DeprecatedUsage {
            suite: suite.to_owned(),
            method: method.to_owned(),
            version,
        });
    }

    /// Returns true when usages are ignored.
    #[must_use]
    pub const fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Returns the recorded usages in resolution order.
    #[must_use]
    pub fn usages(&self) -> &[DeprecatedUsage] {
        &self.usages
    }
}

/// Run-wide set of distinct deprecated usages, in first-seen order.
///
/// # Examples
///
/// ```
/// use suitecase::deprecation::{DeprecatedUsage, DeprecationSummary};
///
/// let usage = DeprecatedUsage { suite: "Cart".into(), method: "SetUpTest".into(), version: 1 };
/// let mut summary = DeprecationSummary::default();
/// summary.extend([usage.clone(), usage]);
/// assert_eq!(summary.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DeprecationSummary {
    usages: Vec<DeprecatedUsage>,
    seen: HashSet<DeprecatedUsage>,
}

impl DeprecationSummary {
    /// Adds `usage` if it has not been seen; returns true when added.
    pub fn record(&mut self, usage: DeprecatedUsage) -> bool {
        if !self.seen.insert(usage.clone()) {
            return false;
        }
        self.usages.push(usage);
        true
    }

    /// Adds every usage, skipping ones already seen.
    pub fn extend(&mut self, usages: impl IntoIterator<Item = DeprecatedUsage>) {
        for usage in usages {
            self.record(usage);
        }
    }

    /// Returns the distinct usages.
    #[must_use]
    pub fn usages(&self) -> &[DeprecatedUsage] {
        &self.usages
    }

    /// Returns the number of distinct usages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.usages.len()
    }

    /// Returns true when no deprecated convention was used.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    /// Renders the summary, listing at most [`MAX_EXAMPLES`] usages.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut lines = vec![format!(
            "{} method(s) use deprecated conventions; switch them to take `&T`:",
            self.len()
        )];
        lines.extend(
            self.usages
                .iter()
                .take(MAX_EXAMPLES)
                .map(|usage| format!("  {usage}")),
        );
        let rest = self.len().saturating_sub(MAX_EXAMPLES);
        if rest > 0 {
            lines.push(format!("  ...and {rest} more"));
        }
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(method: &str) -> DeprecatedUsage {
        DeprecatedUsage {
            suite: "Cart".into(),
            method: method.into(),
            version: 1,
        }
    }

    #[test]
    fn suppressed_log_ignores_usages() {
        let mut log = DeprecationLog::new(true);
        log.note("Cart", "SetUpTest", 1);
        assert!(log.usages().is_empty());
        assert!(log.is_suppressed());
    }

    #[test]
    fn summary_keeps_first_seen_order() {
        let mut summary = DeprecationSummary::default();
        summary.extend([usage("TestB"), usage("TestA"), usage("TestB")]);
        assert_eq!(summary.usages(), [usage("TestB"), usage("TestA")]);
    }

    #[test]
    #[expect(clippy::expect_used, reason = "test should fail loudly")]
    fn render_is_bounded() {
        let mut summary = DeprecationSummary::default();
        summary.extend((0..8).map(|i| usage(&format!("Test{i}"))));
        let rendered = summary.render().expect("summary");
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 1 + MAX_EXAMPLES + 1);
        assert_eq!(lines.last(), Some(&"  ...and 3 more"));
        assert_eq!(lines.get(1), Some(&"  Cart.Test0 (convention v1)"));
    }

    #[test]
    fn empty_summary_renders_nothing() {
        assert!(DeprecationSummary::default().render().is_none());
    }
}
