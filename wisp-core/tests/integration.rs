//! Integration Tests
//!
//! These exercise the reactivity engine, the component layer, and the
//! VDOM reconciler together, through public API only, the way a real
//! embedder of this crate would drive them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wisp_core::component::{
    provide_error_boundary, report_error, ComponentContext, ComponentInstance, SetupOutcome,
};
use wisp_core::reactive::{on_cleanup, Effect, Scheduler, Signal, Value};
use wisp_core::vdom::test_host::TestHost;
use wisp_core::vdom::DomHost;
use wisp_core::vdom::{render, Reconciler, VNode};

/// A counter signal driving an effect, with several writes folded into
/// one synchronous batch so the effect only sees the converged value.
#[test]
fn counter_signal_drives_effect_once_per_batch() {
    let count = Signal::new(0i64);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let count_for_effect = count.clone();
    let seen_for_effect = seen.clone();
    let effect = Effect::new(move || {
        seen_for_effect.borrow_mut().push(count_for_effect.get());
    });

    // The effect already ran once on creation, observing the initial value.
    assert_eq!(*seen.borrow(), vec![0]);

    Scheduler::sync_batch(|| {
        count.set(1);
        count.set(2);
        count.set(3);
    })
    .unwrap();

    // One converged run per batch, not one per write.
    assert_eq!(*seen.borrow(), vec![0, 3]);

    effect.dispose();
    Scheduler::sync_batch(|| count.set(4)).unwrap();
    assert_eq!(*seen.borrow(), vec![0, 3]);
}

/// An error reported during a descendant's render is caught by the
/// nearest ancestor error boundary, not one further up the tree.
#[test]
fn error_is_caught_by_nearest_boundary() {
    let outer = ComponentContext::root();
    let outer_caught: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let outer_caught2 = outer_caught.clone();
    provide_error_boundary(
        &outer,
        Rc::new(move |err| outer_caught2.borrow_mut().push(err.to_string())),
    );

    let inner = ComponentContext::child_of(&outer);
    let inner_caught: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let inner_caught2 = inner_caught.clone();
    provide_error_boundary(
        &inner,
        Rc::new(move |err| inner_caught2.borrow_mut().push(err.to_string())),
    );

    let err: Box<dyn std::error::Error> = "render failed".into();
    report_error(&inner, err).expect("boundary present, error consumed");

    assert_eq!(*inner_caught.borrow(), vec!["render failed"]);
    assert!(outer_caught.borrow().is_empty());
}

/// With no boundary anywhere in the chain, the error propagates back out
/// to the caller instead of being silently swallowed.
#[test]
fn error_propagates_out_with_no_boundary_installed() {
    let ctx = ComponentContext::root();
    let err: Box<dyn std::error::Error> = "no one home".into();
    let result = report_error(&ctx, err);
    assert!(result.is_err());
}

fn counter_entry(
    log: Rc<RefCell<Vec<&'static str>>>,
) -> Rc<dyn Fn(&wisp_core::component::ReactiveProps) -> wisp_core::component::EntryResult<(), ()>> {
    Rc::new(move |_props| {
        let log = log.clone();
        on_cleanup(move || log.borrow_mut().push("cleaned up")).unwrap();
        Ok(SetupOutcome::Setup(Rc::new(|_props| Ok(VNode::text("counter")))))
    })
}

/// A component instance runs its setup exactly once, replays the cached
/// render thereafter, and runs its registered cleanup on destroy.
#[test]
fn component_instance_runs_setup_once_and_cleans_up_on_destroy() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let instance: Rc<ComponentInstance<(), ()>> =
        ComponentInstance::new("Counter", None, [], counter_entry(log.clone()));

    for _ in 0..3 {
        let rendered = instance.render().unwrap();
        assert!(matches!(rendered, VNode::Text(_)));
    }
    assert!(log.borrow().is_empty());

    instance.destroy();
    assert_eq!(*log.borrow(), vec!["cleaned up"]);
    assert!(instance.is_destroyed());
}

fn list_item_entry() -> Rc<
    dyn Fn(
        &wisp_core::component::ReactiveProps,
    ) -> wisp_core::component::EntryResult<<TestHost as DomHost>::Node, <TestHost as DomHost>::Event>,
> {
    Rc::new(move |props| {
        let label = props.get("label").as_str().map(String::from).unwrap_or_default();
        Ok(SetupOutcome::Render(VNode::text(label)))
    })
}

/// Mounting a keyed list of components and then patching it to a
/// reordered list preserves each item's underlying host node identity,
/// and tearing the whole tree down again runs every item's cleanup
/// exactly once.
#[test]
fn patch_preserves_keyed_dom_identity_on_reorder_then_destroy_cleans_up() {
    let host = TestHost::new();
    let container = host.create_container();
    let reconciler = Reconciler::new(host);
    reconciler.register_component("ListItem", list_item_entry());

    let item = |key: &str| {
        VNode::component("ListItem", [(Rc::from("label"), Value::str(key))]).with_key(key)
    };

    let mounted = reconciler
        .mount(
            &container,
            None,
            VNode::fragment([item("a"), item("b"), item("c")]),
            None::<&Rc<ComponentContext>>,
        )
        .unwrap();

    let ids_before: Vec<u64> = container
        .0
        .children
        .borrow()
        .iter()
        .map(|n| n.0.id)
        .collect();
    assert_eq!(ids_before.len(), 3);

    let new_tree = VNode::fragment([item("c"), item("a"), item("b")]);
    let mounted = reconciler
        .patch(&container, mounted, new_tree, None::<&Rc<ComponentContext>>)
        .unwrap();

    let ids_after: Vec<u64> = container
        .0
        .children
        .borrow()
        .iter()
        .map(|n| n.0.id)
        .collect();
    assert_eq!(ids_after, vec![ids_before[2], ids_before[0], ids_before[1]]);

    reconciler.destroy(&container, mounted);
    assert_eq!(container.0.children.borrow().len(), 0);
}

/// `render()`/`UnmountHandle` is the thin public entry point over the
/// same reconciler: mounting into a container populates it, and
/// unmounting tears it back down to empty.
#[test]
fn render_mounts_and_unmount_tears_back_down() {
    let host = TestHost::new();
    let container = host.create_container();
    let reconciler = Reconciler::new(host);

    let mut handle = render(&reconciler, container.clone(), VNode::text("hello")).unwrap();
    assert_eq!(container.0.children.borrow().len(), 1);

    handle.unmount();
    assert_eq!(container.0.children.borrow().len(), 0);
}

/// Synchronous batches converge even when a write inside the batch
/// cascades into further writes on other signals, the way a "diamond"
/// dependency shape does.
#[test]
fn cascading_writes_inside_one_batch_still_converge() {
    let source = Signal::new(1i64);
    let derived_count = Rc::new(Cell::new(0));

    let source_for_derived = source.clone();
    let derived_count_for_effect = derived_count.clone();
    let effect = Effect::new(move || {
        let _ = source_for_derived.get();
        derived_count_for_effect.set(derived_count_for_effect.get() + 1);
    });

    assert_eq!(derived_count.get(), 1);

    Scheduler::sync_batch(|| {
        source.set(2);
        source.set(3);
        source.set(4);
    })
    .unwrap();

    assert_eq!(derived_count.get(), 2);
    assert_eq!(source.get_untracked(), 4);

    effect.dispose();
}

/// A component whose render function returns an error is caught by an
/// ancestor error boundary installed on its parent context: the failing
/// component's own mounted output is an empty placeholder, and no error
/// escapes `mount`.
#[test]
fn mounting_a_failing_component_is_caught_by_an_ancestor_boundary() {
    let host = TestHost::new();
    let container = host.create_container();
    let reconciler = Reconciler::new(host);

    let caught: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let caught2 = caught.clone();
    let root_context = ComponentContext::root();
    provide_error_boundary(
        &root_context,
        Rc::new(move |err| caught2.borrow_mut().push(err.to_string())),
    );

    let entry: Rc<
        dyn Fn(
            &wisp_core::component::ReactiveProps,
        ) -> wisp_core::component::EntryResult<
            <TestHost as DomHost>::Node,
            <TestHost as DomHost>::Event,
        >,
    > = Rc::new(|_props| Err("boom".into()));
    reconciler.register_component("Broken", entry);

    let mounted = reconciler
        .mount(&container, None, VNode::component("Broken", []), Some(&root_context))
        .unwrap();

    assert_eq!(*caught.borrow(), vec!["boom".to_string()]);
    reconciler.destroy(&container, mounted);
}
