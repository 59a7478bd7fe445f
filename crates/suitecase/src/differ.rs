//! Diff rendering for equality-failure messages.
//!
//! Matcher libraries commonly report a failed equality as
//!
//! ```text
//! Expected
//!     <expected value>
//! to equal
//!     <actual value>
//! ```
//!
//! [`Differ`] recognises that shape and appends a character-level diff of the
//! two values. Any other message passes through untouched.

use difference::{Changeset, Difference};

/// Relation phrases separating the expected block from the actual block.
pub const SUPPORTED_RELATIONS: [&str; 1] = ["to equal"];

const REMOVED: &str = "\u{1b}[31m";
const ADDED: &str = "\u{1b}[32m";
const RESET: &str = "\u{1b}[0m";

/// Appends diffs to recognised failure messages.
///
/// # Examples
///
/// ```
/// use suitecase::Differ;
///
/// let (text, processed) = Differ::new().process_message("Expected\n    1\nto equal\n    2");
/// assert!(processed);
/// assert!(text.starts_with("Expected\n    1\nto equal\n    2\nDiff\n"));
///
/// let (text, processed) = Differ::new().process_message("boom");
/// assert_eq!((text.as_str(), processed), ("boom", false));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Differ;

impl Differ {
    /// Creates a differ.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns `message` with a rendered diff appended, and whether the
    /// message was recognised.
    #[must_use]
    pub fn process_message(&self, message: &str) -> (String, bool) {
        match parse(message) {
            Some((expected, actual)) => {
                let changeset = Changeset::new(&expected, &actual, "");
                (
                    format!("{message}\nDiff\n{}", render(&changeset.diffs)),
                    true,
                )
            }
            None => (message.to_owned(), false),
        }
    }
}

/// Splits a recognised message into its expected and actual blocks.
fn parse(message: &str) -> Option<(String, String)> {
    let mut lines = message.lines();
    if lines.next()? != "Expected" {
        return None;
    }
    let mut expected = String::new();
    let mut related = false;
    for line in lines.by_ref() {
        if SUPPORTED_RELATIONS.contains(&line) {
            related = true;
            break;
        }
        if !line.is_empty() && !line.starts_with(' ') {
            return None;
        }
        expected.push_str(line);
        expected.push('\n');
    }
    if !related {
        return None;
    }
    let mut actual = String::new();
    for line in lines {
        actual.push_str(line);
        actual.push('\n');
    }
    Some((expected, actual))
}

fn render(diffs: &[Difference]) -> String {
    let mut out = String::new();
    for diff in diffs {
        match diff {
            Difference::Same(text) => out.push_str(text),
            Difference::Rem(text) => {
                out.push_str(REMOVED);
                out.push_str(text);
                out.push_str(RESET);
            }
            Difference::Add(text) => {
                out.push_str(ADDED);
                out.push_str(text);
                out.push_str(RESET);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    #[expect(clippy::expect_used, reason = "test should fail loudly")]
    fn equality_message_gains_marked_diff() {
        let input = "Expected\n    foo\nto equal\n    bar";
        let (text, processed) = Differ::new().process_message(input);
        assert!(processed);
        assert!(text.starts_with(input));
        let (_, diff) = text.split_once("\nDiff\n").expect("diff section");
        assert!(diff.contains("\u{1b}[31mfoo\u{1b}[0m"));
        assert!(diff.contains("\u{1b}[32mbar\u{1b}[0m"));
        assert!(diff.starts_with("    "));
    }

    #[rstest]
    #[case::plain("not expected at all")]
    #[case::unindented_value("Expected\nfoo\nto equal\n    bar")]
    #[case::missing_relation("Expected\n    foo\nto contain\n    bar")]
    #[case::empty("")]
    fn other_messages_pass_through(#[case] input: &str) {
        assert_eq!(
            Differ::new().process_message(input),
            (input.to_owned(), false)
        );
    }

    #[test]
    fn blank_lines_belong_to_expected_block() {
        assert_eq!(
            parse("Expected\n    a\n\n    b\nto equal\n    a"),
            Some(("    a\n\n    b\n".to_owned(), "    a\n".to_owned()))
        );
    }

    #[test]
    fn identical_values_render_without_markers() {
        let (text, processed) = Differ::new().process_message("Expected\n    x\nto equal\n    x");
        assert!(processed);
        assert!(text.ends_with("\nDiff\n    x\n"));
    }
}
