//! Component instances.
//!
//! A component is a plain function of props. Calling it the first time is
//! its *setup phase* — it may call [`on_mount`]/[`inject`]/
//! [`crate::reactive::on_cleanup`] and return either a render function
//! (the setup-returning-render shape, cached and called again on every
//! subsequent re-render while the entry function itself runs only once)
//! or a vnode directly (the direct-render shape, where the whole entry
//! function re-runs every time and none of the setup-only primitives are
//! available past the first call).
//!
//! The "first render runs the body to register setup state, later
//! renders replay against the cached result" split is expressed here as
//! an explicit `SetupOutcome` enum rather than a hook-call-index ledger,
//! since a component is a plain function, not a hooks array.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::component::context::{report_error, ComponentContext, ContextId};
use crate::component::props::ReactiveProps;
use crate::error::{ContextError, PatchError, RuntimeError};
use crate::reactive::{pop_cleanup_scope, push_cleanup_scope, run_cleanups, SubscriberId, Value};
use crate::vdom::node::VNode;

/// A component's identity, shared by every instance of it. Typically a
/// `const` naming the function, e.g. `"Counter"`.
pub type ComponentId = &'static str;

/// What a user setup/render closure returns. A render error (§7 kind 2:
/// "a render function or setup throws") is realized as `Err` rather than
/// a panic, matching every other fallible boundary in this crate.
pub type EntryResult<N, E> = Result<SetupOutcome<N, E>, Box<dyn std::error::Error>>;

/// What a component's entry function returns on its first (setup) call.
pub enum SetupOutcome<N, E> {
    /// Direct-render shape: this is the render output, and the whole
    /// entry function re-runs on every subsequent render.
    Render(VNode<N, E>),
    /// Setup-returning-render shape: cached and invoked on every
    /// subsequent render; the entry function itself never runs again.
    Setup(Rc<dyn Fn(&ReactiveProps) -> Result<VNode<N, E>, Box<dyn std::error::Error>>>),
}

struct ActiveFrame {
    context: Rc<ComponentContext>,
    /// `Some` only while the owning instance is inside its one-time setup
    /// call; `None` for every subsequent render-only invocation. Gates
    /// [`on_mount`]/[`inject`], the setup-only primitives.
    mount_scope: Option<Rc<RefCell<Vec<Box<dyn FnOnce()>>>>>,
}

thread_local! {
    static ACTIVE: RefCell<Vec<ActiveFrame>> = RefCell::new(Vec::new());
}

fn push_frame(context: Rc<ComponentContext>, mount_scope: Option<Rc<RefCell<Vec<Box<dyn FnOnce()>>>>>) {
    ACTIVE.with(|active| active.borrow_mut().push(ActiveFrame { context, mount_scope }));
}

fn pop_frame() {
    ACTIVE.with(|active| {
        active.borrow_mut().pop();
    });
}

/// Register `f` to run once the current component's vnode has been
/// inserted into the host DOM: the callback runs once, after this
/// component's DOM output is attached.
/// Setup-only; a [`RuntimeError::ScopeViolation`] outside setup.
pub fn on_mount(f: impl FnOnce() + 'static) -> Result<(), RuntimeError> {
    ACTIVE.with(|active| {
        let frames = active.borrow();
        match frames.last().and_then(|frame| frame.mount_scope.as_ref()) {
            Some(scope) => {
                scope.borrow_mut().push(Box::new(f));
                Ok(())
            }
            None => Err(RuntimeError::ScopeViolation(
                "on_mount called outside component setup",
            )),
        }
    })
}

/// Write `value` into the current component's context map. Setup-only.
pub fn inject<T: 'static>(id: ContextId, value: T) -> Result<(), RuntimeError> {
    ACTIVE.with(|active| {
        let frames = active.borrow();
        match frames.last() {
            Some(frame) if frame.mount_scope.is_some() => {
                frame.context.inject_typed(id, value);
                Ok(())
            }
            Some(_) => Err(RuntimeError::ScopeViolation(
                "inject called outside component setup",
            )),
            None => Err(RuntimeError::ScopeViolation(
                "inject called with no current component",
            )),
        }
    })
}

/// Look up `id` in the current component's context chain.
/// Usable during setup or render, unlike [`on_mount`]/[`inject`]; a miss
/// and "no current component" both surface as [`ContextError::NotFound`]
/// since neither has anywhere left to search.
pub fn use_context<T: 'static + Clone>(id: ContextId) -> Result<T, ContextError> {
    ACTIVE.with(|active| {
        let frames = active.borrow();
        match frames.last() {
            Some(frame) => frame.context.lookup_typed(id),
            None => Err(ContextError::NotFound),
        }
    })
}

/// A mounted component: its identity, its context map, its reactive
/// props, and its setup/render state. Generic
/// over the same `N`/`E` host-node/host-event pair as [`VNode`]; owns no
/// [`crate::reactive::Observer`] of its own — the reconciler that mounts
/// this instance owns the render-observer that decides *when* to call
/// [`render`](Self::render), keeping this type ignorant of the DOM host.
pub struct ComponentInstance<N, E> {
    pub id: ComponentId,
    instance_id: SubscriberId,
    context: Rc<ComponentContext>,
    props: ReactiveProps,
    entry: Rc<dyn Fn(&ReactiveProps) -> EntryResult<N, E>>,
    cached_render: RefCell<Option<Rc<dyn Fn(&ReactiveProps) -> Result<VNode<N, E>, Box<dyn std::error::Error>>>>>,
    mount_callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
    cleanup_scope: RefCell<Option<Rc<RefCell<Vec<Box<dyn FnOnce()>>>>>>,
    has_run_setup: Cell<bool>,
    is_rendering: Cell<bool>,
    destroyed: Cell<bool>,
}

impl<N, E> ComponentInstance<N, E> {
    pub fn new(
        id: ComponentId,
        parent_context: Option<&Rc<ComponentContext>>,
        initial_props: impl IntoIterator<Item = (Rc<str>, Value)>,
        entry: Rc<dyn Fn(&ReactiveProps) -> EntryResult<N, E>>,
    ) -> Rc<Self> {
        let context = match parent_context {
            Some(parent) => ComponentContext::child_of(parent),
            None => ComponentContext::root(),
        };
        Rc::new(Self {
            id,
            instance_id: SubscriberId::new(),
            context,
            props: ReactiveProps::new(initial_props),
            entry,
            cached_render: RefCell::new(None),
            mount_callbacks: RefCell::new(Vec::new()),
            cleanup_scope: RefCell::new(None),
            has_run_setup: Cell::new(false),
            is_rendering: Cell::new(false),
            destroyed: Cell::new(false),
        })
    }

    pub fn instance_id(&self) -> SubscriberId {
        self.instance_id
    }

    pub fn context(&self) -> &Rc<ComponentContext> {
        &self.context
    }

    pub fn props(&self) -> &ReactiveProps {
        &self.props
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Prop reception. The caller wraps this in
    /// [`Scheduler::sync_batch`](crate::reactive::Scheduler::sync_batch)
    /// so the component's own render observer sees one deduplicated
    /// notification even when several props changed at once.
    pub fn receive_props(&self, new_props: impl IntoIterator<Item = (Rc<str>, Value)>) -> Vec<Rc<str>> {
        self.props.receive(new_props)
    }

    /// Produce this instance's current vnode output. The first call runs
    /// setup; every later call either replays the cached
    /// render function (setup-returning-render shape) or re-runs the
    /// whole entry function (direct-render shape).
    pub fn render(&self) -> Result<VNode<N, E>, PatchError> {
        if self.destroyed.get() {
            return Err(PatchError::Unhandled(
                "render called on a destroyed component instance".to_string(),
            ));
        }
        if self.is_rendering.get() {
            return Err(PatchError::Unhandled(
                "component instance re-entered its own render".to_string(),
            ));
        }
        self.is_rendering.set(true);
        let result = self.render_inner();
        self.is_rendering.set(false);
        result
    }

    fn render_inner(&self) -> Result<VNode<N, E>, PatchError> {
        if !self.has_run_setup.get() {
            return self.run_initial_setup();
        }

        let cached = self.cached_render.borrow().clone();
        push_frame(Rc::clone(&self.context), None);
        let result = match cached {
            Some(render_fn) => self.route_render_error(render_fn(&self.props)),
            None => match (self.entry)(&self.props) {
                Ok(SetupOutcome::Render(vnode)) => Ok(vnode),
                Ok(SetupOutcome::Setup(_)) => Err(PatchError::InvalidSetupResult),
                Err(err) => self.route_render_error(Err(err)),
            },
        };
        pop_frame();
        result
    }

    fn run_initial_setup(&self) -> Result<VNode<N, E>, PatchError> {
        let mount_scope = Rc::new(RefCell::new(Vec::new()));
        push_frame(Rc::clone(&self.context), Some(Rc::clone(&mount_scope)));
        let cleanup_scope = push_cleanup_scope();
        let outcome = (self.entry)(&self.props);
        pop_cleanup_scope();
        pop_frame();

        *self.cleanup_scope.borrow_mut() = Some(cleanup_scope);
        *self.mount_callbacks.borrow_mut() = std::mem::take(&mut *mount_scope.borrow_mut());
        self.has_run_setup.set(true);

        match outcome {
            Ok(SetupOutcome::Render(vnode)) => Ok(vnode),
            Ok(SetupOutcome::Setup(render_fn)) => {
                let vnode = self.route_render_error(render_fn(&self.props))?;
                *self.cached_render.borrow_mut() = Some(render_fn);
                Ok(vnode)
            }
            Err(err) => self.route_render_error(Err(err)),
        }
    }

    /// Route a setup/render error (§7 kind 2) to the nearest ancestor
    /// error-boundary context. [`ComponentContext::lookup`] already walks
    /// the full parent chain, so a single call here realizes "propagated
    /// up the component tree to the nearest catch-error context": a claimed
    /// error yields an empty placeholder for this render (the boundary's
    /// own re-render, triggered by its state update, replaces the subtree
    /// separately); an unclaimed error is rethrown as
    /// [`PatchError::Unhandled`] so it surfaces out of the top-level
    /// `render()` call, per spec.
    fn route_render_error(
        &self,
        result: Result<VNode<N, E>, Box<dyn std::error::Error>>,
    ) -> Result<VNode<N, E>, PatchError> {
        match result {
            Ok(vnode) => Ok(vnode),
            Err(err) => match report_error(&self.context, err) {
                Ok(()) => Ok(VNode::text("")),
                Err(unclaimed) => Err(PatchError::Unhandled(unclaimed.to_string())),
            },
        }
    }

    /// Run every callback registered via [`on_mount`] during setup, then
    /// drop them (they run exactly once). Called by the reconciler after
    /// this instance's first vnode output is attached to the host DOM.
    pub fn run_mount_callbacks(&self) {
        let callbacks = std::mem::take(&mut *self.mount_callbacks.borrow_mut());
        for callback in callbacks {
            callback();
        }
    }

    /// Tear down: run every registered cleanup once and
    /// mark the instance so a stray later `render`/`destroy` call is a
    /// no-op rather than re-running teardown.
    pub fn destroy(&self) {
        if self.destroyed.get() {
            return;
        }
        self.destroyed.set(true);
        if let Some(scope) = self.cleanup_scope.borrow_mut().take() {
            run_cleanups(&scope);
        }
    }
}
