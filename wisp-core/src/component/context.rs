//! Context propagation.
//!
//! Contexts are opaque identifiers — either a user-minted [`ContextId`] or,
//! conceptually, the hook function that owns a piece of shared state; the
//! core never inspects what a context's id *means*, only whether it is
//! present in a [`ComponentContext`]'s own map or one of its ancestors'.
//!
//! There is no central scope arena: a component constructed during a
//! parent's render holds an explicit `Rc<ComponentContext>` link to that
//! parent, and lookup walks the chain rather than indexing into a shared
//! runtime table. That parent link is the sole mechanism for context
//! inheritance.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ContextError;

/// Opaque context identifier. Two components agree on a context by
/// sharing the same `ContextId` value (typically a `const` or
/// `static` the hook layer defines once), not by any structural
/// property of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Mint a fresh, process-unique context identifier.
    pub fn new() -> Self {
        thread_local! {
            static COUNTER: std::cell::Cell<u64> = const { std::cell::Cell::new(0) };
        }
        COUNTER.with(|c| {
            let id = c.get();
            c.set(id + 1);
            Self(id)
        })
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    /// The context identifier reserved for the error-boundary callback,
    /// through which render/setup errors are routed to the nearest
    /// ancestor's error sink. Every thread
    /// sees the same id because it is allocated once and cached, not
    /// because the id carries any special meaning the core interprets —
    /// it is opaque like any other `ContextId`.
    static ERROR_BOUNDARY_ID: ContextId = ContextId::new();
}

/// The `ContextId` every error boundary provides its handler under.
pub fn error_boundary_context_id() -> ContextId {
    ERROR_BOUNDARY_ID.with(|id| *id)
}

/// Per-instance context map plus a link to the parent's map, giving
/// chained lookup up the component tree.
pub struct ComponentContext {
    own: RefCell<HashMap<ContextId, Rc<dyn Any>>>,
    parent: Option<Rc<ComponentContext>>,
}

impl ComponentContext {
    /// A context map with no parent, for the tree's root component.
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            own: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// A context map for a component constructed during `parent`'s render,
    /// inheriting the parent's chain for lookup.
    pub fn child_of(parent: &Rc<ComponentContext>) -> Rc<Self> {
        Rc::new(Self {
            own: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Write `value` into this instance's own map. Restricting this to
    /// setup time is enforced by the caller, `component::instance`, not
    /// here.
    pub fn inject(&self, id: ContextId, value: Rc<dyn Any>) {
        self.own.borrow_mut().insert(id, value);
    }

    /// Walk up from this instance: own map first, else delegate to the
    /// parent chain; a miss at the root is a [`ContextError::NotFound`].
    pub fn lookup(&self, id: ContextId) -> Result<Rc<dyn Any>, ContextError> {
        if let Some(value) = self.own.borrow().get(&id) {
            return Ok(Rc::clone(value));
        }
        match &self.parent {
            Some(parent) => parent.lookup(id),
            None => Err(ContextError::NotFound),
        }
    }

    /// Typed convenience over [`inject`](Self::inject).
    pub fn inject_typed<T: 'static>(&self, id: ContextId, value: T) {
        self.inject(id, Rc::new(value));
    }

    /// Typed convenience over [`lookup`](Self::lookup). Returns
    /// `ContextError::NotFound` both when no provider exists and when one
    /// exists but holds a different type (a caller bug, but not this
    /// module's to diagnose further).
    pub fn lookup_typed<T: 'static + Clone>(&self, id: ContextId) -> Result<T, ContextError> {
        let value = self.lookup(id)?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(ContextError::NotFound)
    }
}

/// The error-boundary handler type: receives a render/setup error and
/// decides what to do with it (typically: store it into a state slot so
/// the boundary's own re-render swaps to an error view).
pub type ErrorHandler = Rc<dyn Fn(Box<dyn std::error::Error>)>;

/// Provide an error boundary at `ctx`: the component at the boundary owns
/// a state slot updated by `handler`.
pub fn provide_error_boundary(ctx: &ComponentContext, handler: ErrorHandler) {
    ctx.inject(error_boundary_context_id(), Rc::new(handler));
}

/// Route `err` to the nearest ancestor error boundary, if any. Returns
/// `Err(err)` unchanged when no boundary claims it, so the caller can
/// propagate it back out of its own `render()`.
pub fn report_error(
    ctx: &ComponentContext,
    err: Box<dyn std::error::Error>,
) -> Result<(), Box<dyn std::error::Error>> {
    match ctx.lookup(error_boundary_context_id()) {
        Ok(handler) => {
            let handler = handler
                .downcast_ref::<ErrorHandler>()
                .expect("error boundary context holds an ErrorHandler");
            handler(err);
            Ok(())
        }
        Err(_) => Err(err),
    }
}
