//! Rendering of unwind payloads.

use std::any::Any;

/// Renders a panic payload as text.
///
/// String payloads are returned as-is. Anything else is rendered as a
/// placeholder naming it opaque; use [`describe_panic`] to teach the
/// renderer about further payload types.
///
/// # Examples
/// ```
/// use suitecase_harness::panic_message;
///
/// let err = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
/// assert_eq!(panic_message(err.as_ref()), "boom");
/// ```
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    describe_panic(payload, |_| None)
}

/// Renders a panic payload, consulting `describe` for payloads that are not
/// strings.
///
/// # Examples
/// ```
/// use suitecase_harness::describe_panic;
///
/// let err = std::panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
/// let text = describe_panic(err.as_ref(), |payload| {
///     payload.downcast_ref::<u8>().map(|code| format!("exit code {code}"))
/// });
/// assert_eq!(text, "exit code 7");
/// ```
#[must_use]
pub fn describe_panic(
    payload: &(dyn Any + Send),
    describe: impl FnOnce(&(dyn Any + Send)) -> Option<String>,
) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .or_else(|| describe(payload))
        .unwrap_or_else(|| String::from("opaque panic payload"))
}

#[cfg(test)]
mod tests {
    use super::{describe_panic, panic_message};
    use std::any::Any;

    #[test]
    fn renders_string_payloads() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
    }

    #[test]
    fn unknown_payloads_are_opaque() {
        let number: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(number.as_ref()), "opaque panic payload");
    }

    #[test]
    fn describer_sees_only_non_string_payloads() {
        let text: Box<dyn Any + Send> = Box::new("plain");
        assert_eq!(
            describe_panic(text.as_ref(), |_| Some("described".to_owned())),
            "plain"
        );
        let number: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(
            describe_panic(number.as_ref(), |payload| {
                payload.downcast_ref::<u32>().map(|n| format!("code {n}"))
            }),
            "code 7"
        );
    }
}
