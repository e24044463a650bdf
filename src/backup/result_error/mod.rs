//! Crate-wide error type plus the two helpers used to attach context to it.
use std::fmt::Debug;
pub mod error;
pub mod result;

/// Wraps an error with the value being worked on and the function path
/// produced by `function_path!()`.
pub trait WithDebugObjectAndFnName<S: Into<String>, O: Debug + 'static> {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self;
}

/// Wraps an error with a human readable line shown above it.
pub trait WithMsg<S: Into<String>> {
    fn with_msg(self, msg: S) -> Self;
}
