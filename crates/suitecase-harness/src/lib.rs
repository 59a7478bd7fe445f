//! Host test driver contracts for `suitecase`.
//!
//! This crate provides the boundary between the suite engine and whatever
//! actually executes named test procedures: a [`HostDriver`] runs groups of
//! [`HostCase`]s, hands each a [`HostTest`] handle, and reports pass/fail
//! outcomes and the final process exit status.

mod case;
mod driver;
mod host;
mod panic;
mod std_driver;

pub use case::{HostCase, TestMetadata};
pub use driver::HostDriver;
pub use host::HostTest;
pub use panic::{describe_panic, panic_message};
pub use std_driver::StdDriver;
