//! Cucumber step bindings
//!
//! The Spanish step text is the contract with the feature files. Bindings
//! only translate captures into calls on [`crate::actions`],
//! [`crate::assertions`] and the page objects; a returned error fails the
//! step with its message.

mod api;
mod ui;

use crate::error::E2eResult;

pub(crate) trait StepOutcome<T> {
    /// Fail the running step with the error's message
    fn or_fail(self) -> T;
}

impl<T> StepOutcome<T> for E2eResult<T> {
    #[track_caller]
    fn or_fail(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => panic!("{}", e),
        }
    }
}
