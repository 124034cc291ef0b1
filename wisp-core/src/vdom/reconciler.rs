//! The reconciler: mounts a [`VNode`] tree onto a [`DomHost`] and patches
//! it in place as new trees arrive.
//!
//! A component's own signal read wires straight to a patch call on that
//! component's subtree instead of triggering a full top-down re-render.
//! The "re-insert everything from the tail" repositioning technique below
//! keeps a keyed children diff correct without maintaining a parallel
//! "did this node move" flag per child.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::component::{ComponentContext, ComponentId, ComponentInstance, EntryResult, ReactiveProps};
use crate::error::PatchError;
use crate::reactive::{Observer, Scheduler};
use crate::vdom::dom::{DomHost, ListenerHandle};
use crate::vdom::node::{ClassValue, ElementProps, EventHandler, Key, RefTarget, VNode};

type Entry<H> = Rc<dyn Fn(&ReactiveProps) -> EntryResult<<H as DomHost>::Node, <H as DomHost>::Event>>;

/// Host DOM state applied for one mounted [`VNode::Element`], kept
/// around so a later patch can diff against what's actually live instead
/// of against the raw incoming [`ElementProps`].
struct AppliedProps<H: DomHost> {
    attrs: Vec<(Rc<str>, Rc<str>)>,
    style: Vec<(Rc<str>, Rc<str>)>,
    class: Option<ClassValue>,
    listeners: Vec<(Rc<str>, ListenerHandle)>,
    ref_target: Option<RefTarget<H::Node>>,
}

/// The live state behind a mounted [`VNode::Component`]. Held behind
/// `Rc<RefCell<_>>` so the instance's own render-observer notify closure
/// can reach back in and patch `rendered` without the reconciler walking
/// the whole tree to find it.
struct ComponentMount<H: DomHost> {
    instance: Rc<ComponentInstance<H::Node, H::Event>>,
    rendered: Mounted<H>,
    parent_node: H::Node,
    /// Re-runs this component's render whenever a signal it read last
    /// time changes. A component render is an ordinary scheduled
    /// observer like any other subscriber.
    observer: Observer,
}

/// The live mirror of a [`VNode`] tree: same shape, but every node carries
/// its host handle and whatever bookkeeping patching it later requires.
pub enum Mounted<H: DomHost> {
    Text {
        node: H::Node,
        data: Rc<str>,
    },
    Element {
        node: H::Node,
        tag: Rc<str>,
        applied: AppliedProps<H>,
        children: SmallVec<[Mounted<H>; 4]>,
        key: Option<Key>,
    },
    Fragment {
        children: SmallVec<[Mounted<H>; 4]>,
        key: Option<Key>,
    },
    Component {
        mount: Rc<RefCell<ComponentMount<H>>>,
        key: Option<Key>,
    },
    Root {
        container: H::Node,
        child: Box<Mounted<H>>,
    },
}

impl<H: DomHost> Mounted<H> {
    fn key(&self) -> Option<&Key> {
        match self {
            Mounted::Text { .. } => None,
            Mounted::Element { key, .. } => key.as_ref(),
            Mounted::Fragment { key, .. } => key.as_ref(),
            Mounted::Component { key, .. } => key.as_ref(),
            Mounted::Root { .. } => None,
        }
    }

    /// Every real host node this mounted subtree occupies, in document
    /// order. Fragments and components have no node of their own and
    /// contribute their children's/rendered-output's nodes instead.
    fn collect_nodes(&self, out: &mut Vec<H::Node>) {
        match self {
            Mounted::Text { node, .. } | Mounted::Element { node, .. } => out.push(node.clone()),
            Mounted::Fragment { children, .. } => {
                for child in children {
                    child.collect_nodes(out);
                }
            }
            Mounted::Component { mount, .. } => mount.borrow().rendered.collect_nodes(out),
            Mounted::Root { child, .. } => child.collect_nodes(out),
        }
    }
}

fn empty_placeholder<H: DomHost>() -> Mounted<H> {
    Mounted::Fragment {
        children: SmallVec::new(),
        key: None,
    }
}

/// Mounts and patches [`VNode`] trees against a concrete [`DomHost`].
/// Owns the table of registered component entry functions. A
/// `VNode::Component` names a component by id, not by holding the
/// function itself, so something has to resolve the name — the
/// reconciler is that something.
pub struct Reconciler<H: DomHost> {
    host: H,
    registry: RefCell<HashMap<ComponentId, Entry<H>>>,
}

impl<H: DomHost + 'static> Reconciler<H> {
    pub fn new(host: H) -> Rc<Self> {
        Rc::new(Self {
            host,
            registry: RefCell::new(HashMap::new()),
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn register_component(&self, id: ComponentId, entry: Entry<H>) {
        self.registry.borrow_mut().insert(id, entry);
    }

    fn entry_for(&self, id: ComponentId) -> Entry<H> {
        self.registry
            .borrow()
            .get(id)
            .unwrap_or_else(|| panic!("no component registered under id {id:?}"))
            .clone()
    }

    /// Log a setup/render error with no synchronous caller left to
    /// propagate it to, and stand in an empty vnode. Only
    /// [`repatch_component`](Self::repatch_component) uses this: an
    /// async-triggered re-render's notify closure has no `render()` call
    /// frame above it to bubble an `Err` out of, unlike the initial
    /// [`mount`](Self::mount), which does.
    fn error_vnode(err: PatchError) -> VNode<H::Node, H::Event> {
        tracing::error!(error = %err, "component update failed with no boundary to catch it");
        VNode::text("")
    }

    /// Same as [`error_vnode`](Self::error_vnode), already-mounted shape,
    /// for the same no-caller-left situation inside
    /// [`repatch_component`](Self::repatch_component).
    fn error_mounted(err: PatchError) -> Mounted<H> {
        tracing::error!(error = %err, "component update failed with no boundary to catch it");
        empty_placeholder()
    }

    /// Mount `vnode` as a child of `parent`, inserted immediately before
    /// `anchor` (`None` means "append"). A component render error that no
    /// ancestor error-boundary context claimed propagates out as `Err`
    /// rather than being swallowed — this is the one path a caller can
    /// still bubble it up through, all the way out of
    /// [`render`](crate::vdom::render::render).
    pub fn mount(
        self: &Rc<Self>,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        vnode: VNode<H::Node, H::Event>,
        parent_context: Option<&Rc<ComponentContext>>,
    ) -> Result<Mounted<H>, PatchError> {
        match vnode {
            VNode::Text(data) => {
                let node = self.host.create_text(&data);
                self.host.insert_before(parent, &node, anchor);
                Ok(Mounted::Text { node, data })
            }
            VNode::Element {
                tag,
                props,
                children,
                key,
            } => {
                let node = self.host.create_element(&tag);
                let applied = self.apply_props(&node, props);
                self.host.insert_before(parent, &node, anchor);
                let mut mounted_children: SmallVec<[Mounted<H>; 4]> = SmallVec::new();
                for child in children {
                    mounted_children.push(self.mount(&node, None, child, parent_context)?);
                }
                // Only now is `node` sitting inside its document-connected
                // parent, so only now does a ref callback see a real,
                // attached element.
                if let Some(target) = &applied.ref_target {
                    assign_ref(target, Some(node.clone()));
                }
                Ok(Mounted::Element {
                    node,
                    tag,
                    applied,
                    children: mounted_children,
                    key,
                })
            }
            VNode::Fragment { children, key } => {
                let mut mounted_children: SmallVec<[Mounted<H>; 4]> = SmallVec::new();
                for child in children {
                    mounted_children.push(self.mount(parent, anchor, child, parent_context)?);
                }
                Ok(Mounted::Fragment {
                    children: mounted_children,
                    key,
                })
            }
            VNode::Component {
                component_id,
                props,
                key,
            } => {
                let entry = self.entry_for(component_id);
                let instance = ComponentInstance::new(component_id, parent_context, props, entry);
                let reconciler_weak = Rc::downgrade(self);
                let parent_node = parent.clone();
                let anchor_node = anchor.cloned();
                let child_context = Some(Rc::clone(instance.context()));

                let mut mount_error = None;
                let mount = Rc::new_cyclic(|weak: &Weak<RefCell<ComponentMount<H>>>| {
                    let weak_for_observer = weak.clone();
                    let reconciler_for_observer = reconciler_weak.clone();
                    let observer = Observer::new(move || {
                        if let (Some(reconciler), Some(mount)) =
                            (reconciler_for_observer.upgrade(), weak_for_observer.upgrade())
                        {
                            reconciler.repatch_component(&mount);
                        }
                    });

                    let render_result = {
                        let _guard = observer.observe();
                        instance.render()
                    };
                    let rendered = match render_result {
                        Ok(output) => {
                            match self.mount(&parent_node, anchor_node.as_ref(), output, child_context.as_ref()) {
                                Ok(rendered) => {
                                    instance.run_mount_callbacks();
                                    rendered
                                }
                                Err(err) => {
                                    mount_error = Some(err);
                                    empty_placeholder()
                                }
                            }
                        }
                        Err(err) => {
                            mount_error = Some(err);
                            empty_placeholder()
                        }
                    };

                    RefCell::new(ComponentMount {
                        instance: Rc::clone(&instance),
                        rendered,
                        parent_node,
                        observer,
                    })
                });

                match mount_error {
                    Some(err) => Err(err),
                    None => Ok(Mounted::Component { mount, key }),
                }
            }
            VNode::Root { container, child } => {
                let rendered = self.mount(&container, None, *child, parent_context)?;
                Ok(Mounted::Root {
                    container,
                    child: Box::new(rendered),
                })
            }
        }
    }

    fn same_shape_pair(old: &Mounted<H>, new_vnode: &VNode<H::Node, H::Event>) -> bool {
        match (old, new_vnode) {
            (Mounted::Text { .. }, VNode::Text(_)) => true,
            (Mounted::Element { tag, .. }, VNode::Element { tag: new_tag, .. }) => tag == new_tag,
            (Mounted::Fragment { .. }, VNode::Fragment { .. }) => true,
            (Mounted::Component { mount, .. }, VNode::Component { component_id, .. }) => {
                mount.borrow().instance.id == *component_id
            }
            _ => false,
        }
    }

    /// Replace `old`'s content in `parent` with `new_vnode`, reusing host
    /// nodes where [`VNode::same_shape`](crate::vdom::node::VNode::same_shape)
    /// allows it.
    pub fn patch(
        self: &Rc<Self>,
        parent: &H::Node,
        old: Mounted<H>,
        new_vnode: VNode<H::Node, H::Event>,
        parent_context: Option<&Rc<ComponentContext>>,
    ) -> Result<Mounted<H>, PatchError> {
        if !Self::same_shape_pair(&old, &new_vnode) {
            let mut nodes = Vec::new();
            old.collect_nodes(&mut nodes);
            let anchor = nodes.last().and_then(|n| self.host.next_sibling(n));
            self.destroy(parent, old);
            return self.mount(parent, anchor.as_ref(), new_vnode, parent_context);
        }

        // Only needed by the fragment arm, but cheap enough to compute
        // once up front rather than re-deriving it per-arm.
        let mut nodes = Vec::new();
        old.collect_nodes(&mut nodes);
        let trailing_anchor = nodes.last().and_then(|n| self.host.next_sibling(n));

        match (old, new_vnode) {
            (Mounted::Text { node, .. }, VNode::Text(new_data)) => {
                self.host.set_text(&node, &new_data);
                Ok(Mounted::Text {
                    node,
                    data: new_data,
                })
            }
            (
                Mounted::Element {
                    node,
                    tag,
                    applied,
                    children,
                    ..
                },
                VNode::Element {
                    props,
                    children: new_children,
                    key,
                    ..
                },
            ) => {
                let applied = self.diff_props(&node, applied, props);
                let children = self.patch_children(&node, None, children, new_children, parent_context)?;
                Ok(Mounted::Element {
                    node,
                    tag,
                    applied,
                    children,
                    key,
                })
            }
            (Mounted::Fragment { children, .. }, VNode::Fragment { children: new_children, key }) => {
                let children = self.patch_children(
                    parent,
                    trailing_anchor.as_ref(),
                    children,
                    new_children,
                    parent_context,
                )?;
                Ok(Mounted::Fragment { children, key })
            }
            (Mounted::Component { mount, .. }, VNode::Component { props, key, .. }) => {
                // Prop reception only. Whether this
                // actually re-renders the component is entirely up to
                // whether a changed key's signal was ever read: if it
                // was, `receive_props`'s `Signal::set` notifies the
                // component's own render-observer through the ordinary
                // signal path, which re-queues and re-patches it via
                // `repatch_component` on its own — a sibling whose props
                // didn't change (or weren't read) never re-renders just
                // because this one did.
                let instance = Rc::clone(&mount.borrow().instance);
                let _ = Scheduler::sync_batch(|| {
                    instance.receive_props(props);
                });
                Ok(Mounted::Component { mount, key })
            }
            _ => unreachable!("same_shape_pair guarantees a matching arm above"),
        }
    }

    /// Re-render a component in place, patching its rendered output
    /// against the previous one. Invoked both when an ancestor passes new
    /// props down ([`patch`](Self::patch)) and from the component's own
    /// render-observer notify closure when an internal signal changed.
    fn repatch_component(self: &Rc<Self>, mount: &Rc<RefCell<ComponentMount<H>>>) {
        let (instance, parent_node) = {
            let borrowed = mount.borrow();
            (Rc::clone(&borrowed.instance), borrowed.parent_node.clone())
        };
        let output = {
            let borrowed = mount.borrow();
            let _guard = borrowed.observer.observe();
            instance.render().unwrap_or_else(Self::error_vnode)
        };
        let old_rendered = std::mem::replace(&mut mount.borrow_mut().rendered, empty_placeholder());
        // This fires from a notify closure with no live `render()` call
        // frame to bubble an `Err` through (unlike the initial `mount`),
        // so an unclaimed error here is logged and replaced with an empty
        // subtree instead of propagated.
        let patched = self
            .patch(&parent_node, old_rendered, output, Some(instance.context()))
            .unwrap_or_else(Self::error_mounted);
        mount.borrow_mut().rendered = patched;
    }

    /// Diff an ordered child list, reusing [`Mounted`] entries whose
    /// vnode kept the same key (or, for unkeyed children, the same
    /// position) and disposing the rest. `anchor` is the host node that
    /// must remain immediately after this entire child list once the
    /// diff settles (`None` = nothing does, append freely).
    fn patch_children(
        self: &Rc<Self>,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        old_children: SmallVec<[Mounted<H>; 4]>,
        new_children: SmallVec<[VNode<H::Node, H::Event>; 4]>,
        parent_context: Option<&Rc<ComponentContext>>,
    ) -> Result<SmallVec<[Mounted<H>; 4]>, PatchError> {
        let any_keyed = old_children.iter().any(|c| c.key().is_some())
            || new_children.iter().any(|c| c.key().is_some());

        let mut result: SmallVec<[Mounted<H>; 4]> = SmallVec::new();

        if !any_keyed {
            let mut old_iter = old_children.into_iter();
            for new_child in new_children {
                match old_iter.next() {
                    Some(old_child) => {
                        result.push(self.patch(parent, old_child, new_child, parent_context)?);
                    }
                    None => {
                        result.push(self.mount(parent, None, new_child, parent_context)?);
                    }
                }
            }
            for leftover in old_iter {
                self.destroy(parent, leftover);
            }
        } else {
            let mut old_by_key: IndexMap<Key, Mounted<H>> = IndexMap::new();
            let mut old_unkeyed: std::collections::VecDeque<Mounted<H>> = std::collections::VecDeque::new();
            for child in old_children {
                match child.key().cloned() {
                    Some(key) => {
                        old_by_key.insert(key, child);
                    }
                    None => old_unkeyed.push_back(child),
                }
            }

            for new_child in new_children {
                match new_child.key().cloned() {
                    Some(key) => match old_by_key.shift_remove(&key) {
                        Some(old_child) => {
                            result.push(self.patch(parent, old_child, new_child, parent_context)?);
                        }
                        None => {
                            result.push(self.mount(parent, None, new_child, parent_context)?);
                        }
                    },
                    None => match old_unkeyed.pop_front() {
                        Some(old_child) => {
                            result.push(self.patch(parent, old_child, new_child, parent_context)?);
                        }
                        None => {
                            result.push(self.mount(parent, None, new_child, parent_context)?);
                        }
                    },
                }
            }
            for (_, leftover) in old_by_key {
                self.destroy(parent, leftover);
            }
            for leftover in old_unkeyed {
                self.destroy(parent, leftover);
            }
        }

        // Re-home every surviving/newly-mounted child in final order.
        // Re-inserting an already-correctly-placed node is a no-op on a
        // real DOM; walking back-to-front against a running anchor is
        // the only way to fix up order for entries reused from a
        // different position without tracking a per-child "did this one
        // move" flag.
        let mut trailing = anchor.cloned();
        for child in result.iter().rev() {
            let mut nodes = Vec::new();
            child.collect_nodes(&mut nodes);
            for node in nodes.into_iter().rev() {
                self.host.insert_before(parent, &node, trailing.as_ref());
                trailing = Some(node);
            }
        }

        Ok(result)
    }

    fn apply_props(&self, node: &H::Node, props: ElementProps<H::Node, H::Event>) -> AppliedProps<H> {
        for (name, value) in &props.attrs {
            self.host.set_attribute(node, name, value);
        }
        for (name, value) in &props.style {
            self.host.set_style_property(node, name, value);
        }
        if let Some(class) = &props.class {
            self.host.set_class(node, class);
        }
        let mut listeners = Vec::with_capacity(props.events.len());
        for EventHandler { event_type, callback } in props.events {
            let handle = self.host.add_event_listener(node, &event_type, callback);
            listeners.push((event_type, handle));
        }
        // `ref_target` is assigned by the caller, once `node` is actually
        // inserted into its document-connected parent — not here, while
        // it's still detached.
        AppliedProps {
            attrs: props.attrs,
            style: props.style,
            class: props.class,
            listeners,
            ref_target: props.ref_target,
        }
    }

    fn diff_props(
        &self,
        node: &H::Node,
        mut applied: AppliedProps<H>,
        new_props: ElementProps<H::Node, H::Event>,
    ) -> AppliedProps<H> {
        for (name, _) in &applied.attrs {
            if !new_props.attrs.iter().any(|(n, _)| n == name) {
                self.host.remove_attribute(node, name);
            }
        }
        for (name, value) in &new_props.attrs {
            let unchanged = applied.attrs.iter().any(|(n, v)| n == name && v == value);
            if !unchanged {
                self.host.set_attribute(node, name, value);
            }
        }

        for (name, _) in &applied.style {
            if !new_props.style.iter().any(|(n, _)| n == name) {
                self.host.remove_style_property(node, name);
            }
        }
        for (name, value) in &new_props.style {
            let unchanged = applied.style.iter().any(|(n, v)| n == name && v == value);
            if !unchanged {
                self.host.set_style_property(node, name, value);
            }
        }

        match (&applied.class, &new_props.class) {
            (None, None) => {}
            (Some(_), None) => self.host.remove_class(node),
            (_, Some(class)) => self.host.set_class(node, class),
        }

        for (_, handle) in std::mem::take(&mut applied.listeners) {
            self.host.remove_event_listener(node, handle);
        }
        let mut listeners = Vec::with_capacity(new_props.events.len());
        for EventHandler { event_type, callback } in new_props.events {
            let handle = self.host.add_event_listener(node, &event_type, callback);
            listeners.push((event_type, handle));
        }

        if let Some(target) = &applied.ref_target {
            assign_ref(target, None);
        }
        if let Some(target) = &new_props.ref_target {
            assign_ref(target, Some(node.clone()));
        }

        AppliedProps {
            attrs: new_props.attrs,
            style: new_props.style,
            class: new_props.class,
            listeners,
            ref_target: new_props.ref_target,
        }
    }

    /// Tear down a mounted subtree: remove its host nodes from `parent`,
    /// unregister its listeners, clear its refs, and — for components —
    /// dispose the instance so every descendant's cleanup runs before the
    /// caller's own, depth-first.
    pub fn destroy(&self, parent: &H::Node, mounted: Mounted<H>) {
        match mounted {
            Mounted::Text { node, .. } => self.host.remove_child(parent, &node),
            Mounted::Element {
                node,
                applied,
                children,
                ..
            } => {
                for child in children {
                    self.destroy(&node, child);
                }
                for (_, handle) in applied.listeners {
                    self.host.remove_event_listener(&node, handle);
                }
                if let Some(target) = &applied.ref_target {
                    assign_ref(target, None);
                }
                self.host.remove_child(parent, &node);
            }
            Mounted::Fragment { children, .. } => {
                for child in children {
                    self.destroy(parent, child);
                }
            }
            Mounted::Component { mount, .. } => {
                let (instance, rendered) = {
                    let mut borrowed = mount.borrow_mut();
                    borrowed.observer.dispose();
                    let rendered = std::mem::replace(&mut borrowed.rendered, empty_placeholder());
                    (Rc::clone(&borrowed.instance), rendered)
                };
                self.destroy(parent, rendered);
                instance.destroy();
            }
            Mounted::Root { container, child } => {
                self.destroy(&container, *child);
            }
        }
    }
}

fn assign_ref<N: Clone>(target: &RefTarget<N>, value: Option<N>) {
    match target {
        RefTarget::Callback(f) => f(value),
        RefTarget::Cell(cell) => *cell.borrow_mut() = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::on_cleanup;
    use crate::vdom::dom::test_host::{TestHost, TestNode};
    use std::cell::Cell as StdCell;

    type TestEvent = crate::vdom::dom::test_host::TestEvent;
    type TestVNode = VNode<TestNode, TestEvent>;

    fn new_reconciler() -> (Rc<Reconciler<TestHost>>, TestNode) {
        let host = TestHost::new();
        let container = host.create_container();
        (Reconciler::new(host), container)
    }

    #[test]
    fn mount_element_creates_node_and_applies_attrs() {
        let (reconciler, container) = new_reconciler();
        let vnode: TestVNode = VNode::element("div")
            .attr("data-id", "1")
            .child(VNode::text("hello"))
            .build();
        let mounted = reconciler.mount(&container, None, vnode, None).unwrap();
        match mounted {
            Mounted::Element { node, tag, .. } => {
                assert_eq!(&*tag, "div");
                assert_eq!(node.0.attr("data-id"), Some("1".to_string()));
                assert_eq!(container.0.children.borrow().len(), 1);
            }
            _ => panic!("expected Element"),
        }
    }

    #[test]
    fn patch_diffs_attributes_adding_updating_and_removing() {
        let (reconciler, container) = new_reconciler();
        let first: TestVNode = VNode::element("div").attr("a", "1").attr("b", "2").build();
        let mounted = reconciler.mount(&container, None, first, None).unwrap();

        let second: TestVNode = VNode::element("div").attr("a", "1").attr("c", "3").build();
        let mounted = reconciler.patch(&container, mounted, second, None).unwrap();

        match mounted {
            Mounted::Element { node, .. } => {
                assert_eq!(node.0.attr("a"), Some("1".to_string()));
                assert_eq!(node.0.attr("b"), None);
                assert_eq!(node.0.attr("c"), Some("3".to_string()));
            }
            _ => panic!("expected Element"),
        }
    }

    #[test]
    fn keyed_reorder_preserves_dom_node_identity() {
        let (reconciler, container) = new_reconciler();
        let li = |key: &str, text: &str| -> TestVNode {
            VNode::element("li").child(VNode::text(text)).build().with_key(key)
        };

        let first = VNode::fragment([li("a", "A"), li("b", "B"), li("c", "C")]);
        let mounted = reconciler.mount(&container, None, first, None).unwrap();
        let ids_before: Vec<u64> = container.0.children.borrow().iter().map(|c| c.0.id).collect();

        let second = VNode::fragment([li("c", "C"), li("a", "A"), li("b", "B")]);
        let _mounted = reconciler.patch(&container, mounted, second, None).unwrap();
        let ids_after: Vec<u64> = container.0.children.borrow().iter().map(|c| c.0.id).collect();

        assert_eq!(ids_before.len(), 3);
        assert_eq!(ids_after, vec![ids_before[2], ids_before[0], ids_before[1]]);
    }

    #[test]
    fn unkeyed_children_are_reused_positionally() {
        let (reconciler, container) = new_reconciler();
        let first = VNode::fragment([TestVNode::text("a"), TestVNode::text("b")]);
        let mounted = reconciler.mount(&container, None, first, None).unwrap();
        let ids_before: Vec<u64> = container.0.children.borrow().iter().map(|c| c.0.id).collect();

        let second = VNode::fragment([TestVNode::text("x"), TestVNode::text("y")]);
        let _mounted = reconciler.patch(&container, mounted, second, None).unwrap();
        let ids_after: Vec<u64> = container.0.children.borrow().iter().map(|c| c.0.id).collect();

        assert_eq!(ids_before, ids_after, "same underlying nodes, only text changed");
        assert_eq!(
            container.0.children.borrow()[0].0.text.borrow().as_deref(),
            Some("x")
        );
    }

    #[test]
    fn ref_callback_fires_on_mount_and_unmount() {
        let (reconciler, container) = new_reconciler();
        let seen: Rc<RefCell<Vec<Option<TestNode>>>> = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        let vnode: TestVNode = VNode::element("input")
            .ref_target(RefTarget::Callback(Rc::new(move |n| seen2.borrow_mut().push(n))))
            .build();
        let mounted = reconciler.mount(&container, None, vnode, None).unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert!(seen.borrow()[0].is_some());

        reconciler.destroy(&container, mounted);
        assert_eq!(seen.borrow().len(), 2);
        assert!(seen.borrow()[1].is_none());
    }

    #[test]
    fn ref_callback_fires_after_the_element_is_attached_to_its_parent() {
        let (reconciler, container) = new_reconciler();
        let connected_when_called = Rc::new(StdCell::new(false));
        let connected2 = connected_when_called.clone();
        let vnode: TestVNode = VNode::element("input")
            .ref_target(RefTarget::Callback(Rc::new(move |n: Option<TestNode>| {
                if let Some(node) = n {
                    connected2.set(node.0.parent.borrow().is_some());
                }
            })))
            .build();
        let _mounted = reconciler.mount(&container, None, vnode, None).unwrap();
        assert!(
            connected_when_called.get(),
            "ref callback must fire once the element is already inside its document-connected parent"
        );
    }

    #[test]
    fn patch_replacing_events_removes_old_listener() {
        let (reconciler, container) = new_reconciler();
        let first: TestVNode = VNode::element("button")
            .on("click", Rc::new(|_: TestEvent| {}))
            .build();
        let mounted = reconciler.mount(&container, None, first, None).unwrap();
        if let Mounted::Element { node, .. } = &mounted {
            assert_eq!(*node.0.listeners.borrow(), vec!["click".to_string()]);
        }

        let second: TestVNode = VNode::element("button").build();
        let mounted = reconciler.patch(&container, mounted, second, None).unwrap();
        if let Mounted::Element { node, .. } = &mounted {
            assert!(node.0.listeners.borrow().is_empty());
        } else {
            panic!("expected Element");
        }
    }

    fn test_component_entry(
        log: Rc<RefCell<Vec<&'static str>>>,
        name: &'static str,
        child: Option<ComponentId>,
    ) -> Entry<TestHost> {
        Rc::new(move |_props: &ReactiveProps| {
            let log = log.clone();
            on_cleanup(move || log.borrow_mut().push(name)).unwrap();
            let output = match child {
                Some(child_id) => VNode::component(child_id, []),
                None => VNode::text(name),
            };
            Ok(crate::component::SetupOutcome::Render(output))
        })
    }

    #[test]
    fn destroying_a_component_subtree_cleans_up_depth_first() {
        let (reconciler, container) = new_reconciler();
        let log = Rc::new(RefCell::new(Vec::new()));
        reconciler.register_component("Child", test_component_entry(log.clone(), "child", None));
        reconciler.register_component(
            "Parent",
            test_component_entry(log.clone(), "parent", Some("Child")),
        );

        let mounted = reconciler
            .mount(&container, None, VNode::component("Parent", []), None)
            .unwrap();
        reconciler.destroy(&container, mounted);

        assert_eq!(*log.borrow(), vec!["child", "parent"]);
    }

    #[test]
    fn component_rerenders_only_when_a_read_prop_changes() {
        let (reconciler, container) = new_reconciler();
        let render_count = Rc::new(StdCell::new(0));
        let render_count2 = render_count.clone();
        let entry: Entry<TestHost> = Rc::new(move |_props: &ReactiveProps| {
            let render_count3 = render_count2.clone();
            Ok(crate::component::SetupOutcome::Setup(Rc::new(
                move |props: &ReactiveProps| {
                    render_count3.set(render_count3.get() + 1);
                    let count = props.get("count").as_number().unwrap_or(0.0);
                    Ok(VNode::text(count.to_string()))
                },
            )))
        });
        reconciler.register_component("Counter", entry);

        let initial_props = [
            (Rc::from("count"), crate::reactive::Value::Number(0.0)),
            (Rc::from("label"), crate::reactive::Value::Str(Rc::from("x"))),
        ];
        let mounted = reconciler
            .mount(&container, None, VNode::component("Counter", initial_props), None)
            .unwrap();
        assert_eq!(render_count.get(), 1);

        let unread_change = [
            (Rc::from("count"), crate::reactive::Value::Number(0.0)),
            (Rc::from("label"), crate::reactive::Value::Str(Rc::from("y"))),
        ];
        let mounted = reconciler
            .patch(&container, mounted, VNode::component("Counter", unread_change), None)
            .unwrap();
        assert_eq!(render_count.get(), 1, "unread prop change must not re-render");

        let read_change = [
            (Rc::from("count"), crate::reactive::Value::Number(1.0)),
            (Rc::from("label"), crate::reactive::Value::Str(Rc::from("y"))),
        ];
        let _mounted = reconciler
            .patch(&container, mounted, VNode::component("Counter", read_change), None)
            .unwrap();
        assert_eq!(render_count.get(), 2, "read prop change must re-render exactly once");
    }

    #[test]
    fn mount_propagates_an_unclaimed_component_render_error() {
        let (reconciler, container) = new_reconciler();
        let entry: Entry<TestHost> = Rc::new(|_props: &ReactiveProps| Err("boom".into()));
        reconciler.register_component("Broken", entry);

        let result = reconciler.mount(&container, None, VNode::component("Broken", []), None);
        assert!(matches!(result, Err(PatchError::Unhandled(_))));
        assert_eq!(
            container.0.children.borrow().len(),
            0,
            "an unclaimed render error must not leave a placeholder attached"
        );
    }
}
