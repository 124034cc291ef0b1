//! Structured error types, one enum per failure domain, via `thiserror`.

use thiserror::Error;

/// Failures from the reactivity engine and its scheduler: scope
/// violations and internal invariant violations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A `sync_batch` did not reach a fixed point within the configured
    /// pass budget. Surfaces a runaway feedback loop instead of hanging
    /// the thread.
    #[error("sync batch did not converge within {0} passes")]
    NoConvergence(usize),

    /// A setup-only primitive was used outside setup, or a component-only
    /// primitive was used with no current component.
    #[error("scope violation: {0}")]
    ScopeViolation(&'static str),

    /// An internal invariant was violated, e.g. notifying a disposed
    /// observer, or re-entrant use of a disposed signal.
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}

/// Failures from context propagation.
#[derive(Debug, Error)]
pub enum ContextError {
    /// `use_context` walked to the root without finding the identifier.
    #[error("no provider found for this context")]
    NotFound,
}

/// Failures surfaced while mounting or patching the VDOM. Render errors
/// and DOM patch errors are not caught by the core and propagate as
/// this type out of `render`/`patch`.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A setup function did not return a render function.
    #[error("component setup must return a render function")]
    InvalidSetupResult,

    /// A render or setup function returned an error that no ancestor
    /// error-boundary context claimed.
    #[error("unhandled render error: {0}")]
    Unhandled(String),

    /// The configured `DomHost` rejected an operation (e.g. the node was
    /// already detached).
    #[error("dom host operation failed: {0}")]
    Host(String),
}
