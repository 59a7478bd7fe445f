//! JSON writer for per-suite statistics.
//!
//! Suites are keyed by name in sorted order; each entry carries the three
//! outcome counts plus their total.

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use super::SuiteTally;

#[derive(Serialize)]
struct JsonReport<'a> {
    suites: BTreeMap<&'a str, JsonSuite<'a>>,
}

#[derive(Serialize)]
struct JsonSuite<'a> {
    #[serde(flatten)]
    tally: &'a SuiteTally,
    total: usize,
}

impl<'a> From<&'a BTreeMap<String, SuiteTally>> for JsonReport<'a> {
    fn from(suites: &'a BTreeMap<String, SuiteTally>) -> Self {
        let suites = suites
            .iter()
            .map(|(name, tally)| {
                (
                    name.as_str(),
                    JsonSuite {
                        tally,
                        total: tally.total(),
                    },
                )
            })
            .collect();
        Self { suites }
    }
}

/// Serialize the provided tallies into the supplied writer.
///
/// # Examples
/// ```rust
/// use std::collections::BTreeMap;
/// use suitecase::stats::{json, SuiteTally};
///
/// let mut suites = BTreeMap::new();
/// suites.insert("Cart".to_owned(), SuiteTally { passed: 2, failed: 0, skipped: 1 });
/// let mut buffer = Vec::new();
/// json::write(&mut buffer, &suites).unwrap();
/// let output = String::from_utf8(buffer).unwrap();
/// assert!(output.contains("\"total\":3"));
/// ```
///
/// # Errors
/// Returns an error when serialization or the underlying write fails.
pub fn write<W: Write>(
    writer: &mut W,
    suites: &BTreeMap<String, SuiteTally>,
) -> serde_json::Result<()> {
    serde_json::to_writer(writer, &JsonReport::from(suites))
}

/// Produce a JSON string representation of the provided tallies.
///
/// # Errors
/// Returns an error when serialization fails.
pub fn to_string(suites: &BTreeMap<String, SuiteTally>) -> serde_json::Result<String> {
    serde_json::to_string(&JsonReport::from(suites))
}
