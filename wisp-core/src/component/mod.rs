//! The component layer: component instances, their reactive props proxy,
//! and context propagation.

mod context;
mod instance;
mod props;

pub use context::{
    error_boundary_context_id, provide_error_boundary, report_error, ComponentContext, ContextId,
    ErrorHandler,
};
pub use instance::{
    inject, on_mount, use_context, ComponentId, ComponentInstance, EntryResult, SetupOutcome,
};
pub use props::{ReactiveProps, COMPONENT_KEY, REF_KEY};
