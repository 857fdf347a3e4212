//! Public API surface: processing context, hooks and the install report

pub mod context;
pub mod hooks;
pub mod result;
