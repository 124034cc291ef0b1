//! The host DOM collaborator: create element/text, set attribute/property,
//! add/remove event listener, insert/remove child, next sibling.
//!
//! [`DomHost`] is the seam that lets the reconciler stay generic over its
//! target: the same diff/patch/keyed-reconciliation code drives a real
//! browser DOM (`WebSysHost`, behind the `dom` feature) and a plain
//! in-memory tree (`TestHost`) used by this crate's own unit and
//! integration tests, which don't run under `wasm-bindgen-test`.
//!
//! This is the same injected-backend pattern `config.rs` uses for the
//! microtask scheduler, applied here to DOM operations instead.

use std::rc::Rc;

use crate::vdom::node::{ClassValue, Key};

/// Operations the reconciler needs from a host DOM. `Node` is the host's
/// native handle type (an opaque `Rc`-like handle, cheap to clone and
/// compared by identity); `Event` is whatever the host hands event
/// callbacks.
pub trait DomHost {
    type Node: Clone + PartialEq;
    type Event;

    fn create_element(&self, tag: &str) -> Self::Node;
    fn create_text(&self, data: &str) -> Self::Node;
    fn set_text(&self, node: &Self::Node, data: &str);

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);
    fn remove_attribute(&self, node: &Self::Node, name: &str);
    fn set_style_property(&self, node: &Self::Node, name: &str, value: &str);
    fn remove_style_property(&self, node: &Self::Node, name: &str);
    fn set_class(&self, node: &Self::Node, class: &ClassValue);
    fn remove_class(&self, node: &Self::Node);

    /// Register an event listener, returning a handle the caller must
    /// keep to unregister it later when a patch replaces it.
    fn add_event_listener(
        &self,
        node: &Self::Node,
        event_type: &str,
        callback: Rc<dyn Fn(Self::Event)>,
    ) -> ListenerHandle;
    fn remove_event_listener(&self, node: &Self::Node, handle: ListenerHandle);

    fn append_child(&self, parent: &Self::Node, child: &Self::Node);
    fn insert_before(&self, parent: &Self::Node, child: &Self::Node, anchor: Option<&Self::Node>);
    fn remove_child(&self, parent: &Self::Node, child: &Self::Node);
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
}

/// Opaque handle for a registered event listener, returned by
/// [`DomHost::add_event_listener`] and consumed by
/// [`DomHost::remove_event_listener`]. Carries nothing the reconciler
/// interprets; hosts are free to make it whatever they need internally
/// (an index, a closure handle, ...).
pub struct ListenerHandle(pub Box<dyn std::any::Any>);

#[cfg(feature = "dom")]
pub use web_sys_host::WebSysHost;

#[cfg(feature = "dom")]
mod web_sys_host {
    use super::*;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;

    /// [`DomHost`] backed by `web-sys`.
    pub struct WebSysHost {
        document: web_sys::Document,
    }

    impl WebSysHost {
        pub fn new(document: web_sys::Document) -> Self {
            Self { document }
        }
    }

    impl DomHost for WebSysHost {
        type Node = web_sys::Node;
        type Event = web_sys::Event;

        fn create_element(&self, tag: &str) -> Self::Node {
            self.document
                .create_element(tag)
                .expect("create_element failed")
                .into()
        }

        fn create_text(&self, data: &str) -> Self::Node {
            self.document.create_text_node(data).into()
        }

        fn set_text(&self, node: &Self::Node, data: &str) {
            node.set_text_content(Some(data));
        }

        fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) {
            if let Some(el) = node.dyn_ref::<web_sys::Element>() {
                let _ = el.set_attribute(name, value);
            }
        }

        fn remove_attribute(&self, node: &Self::Node, name: &str) {
            if let Some(el) = node.dyn_ref::<web_sys::Element>() {
                let _ = el.remove_attribute(name);
            }
        }

        fn set_style_property(&self, node: &Self::Node, name: &str, value: &str) {
            if let Some(el) = node.dyn_ref::<web_sys::HtmlElement>() {
                let _ = el.style().set_property(name, value);
            }
        }

        fn remove_style_property(&self, node: &Self::Node, name: &str) {
            if let Some(el) = node.dyn_ref::<web_sys::HtmlElement>() {
                let _ = el.style().remove_property(name);
            }
        }

        fn set_class(&self, node: &Self::Node, class: &ClassValue) {
            self.set_attribute(node, "class", &class.resolve());
        }

        fn remove_class(&self, node: &Self::Node) {
            self.remove_attribute(node, "class");
        }

        fn add_event_listener(
            &self,
            node: &Self::Node,
            event_type: &str,
            callback: Rc<dyn Fn(Self::Event)>,
        ) -> ListenerHandle {
            let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
                callback(event);
            }) as Box<dyn Fn(web_sys::Event)>);
            let target: &web_sys::EventTarget = node.unchecked_ref();
            let _ = target
                .add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref());
            ListenerHandle(Box::new((event_type.to_string(), closure)))
        }

        fn remove_event_listener(&self, node: &Self::Node, handle: ListenerHandle) {
            if let Ok((event_type, closure)) =
                handle.0.downcast::<(String, Closure<dyn Fn(web_sys::Event)>)>()
            {
                let target: &web_sys::EventTarget = node.unchecked_ref();
                let _ = target.remove_event_listener_with_callback(
                    &event_type,
                    closure.as_ref().unchecked_ref(),
                );
            }
        }

        fn append_child(&self, parent: &Self::Node, child: &Self::Node) {
            let _ = parent.append_child(child);
        }

        fn insert_before(&self, parent: &Self::Node, child: &Self::Node, anchor: Option<&Self::Node>) {
            let _ = parent.insert_before(child, anchor);
        }

        fn remove_child(&self, parent: &Self::Node, child: &Self::Node) {
            let _ = parent.remove_child(child);
        }

        fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node> {
            node.next_sibling()
        }
    }
}

/// An in-memory [`DomHost`] for tests that don't run under
/// `wasm-bindgen-test`. Models just enough of a DOM — an arena of nodes
/// each with optional text, an ordered child list, attributes, style,
/// class, and registered listener names — to make every reconciler
/// invariant (keyed identity preservation, destroy hooks, attribute
/// diffing) observable from plain Rust unit tests.
pub mod test_host {
    use super::*;
    use std::cell::RefCell;

    #[derive(Clone, PartialEq)]
    pub struct TestNode(pub Rc<NodeData>);

    pub struct NodeData {
        pub id: u64,
        pub tag: RefCell<Option<String>>,
        pub text: RefCell<Option<String>>,
        pub attrs: RefCell<Vec<(String, String)>>,
        pub style: RefCell<Vec<(String, String)>>,
        pub class: RefCell<Option<String>>,
        pub listeners: RefCell<Vec<String>>,
        pub children: RefCell<Vec<TestNode>>,
        /// Back-pointer kept in sync by `insert_before`/`append_child`/
        /// `remove_child`, so `next_sibling` can answer without the host
        /// being handed a parent explicitly (real DOM nodes have this for
        /// free via `Node.nextSibling`).
        pub parent: RefCell<Option<std::rc::Weak<NodeData>>>,
    }

    impl NodeData {
        pub fn attr(&self, name: &str) -> Option<String> {
            self.attrs
                .borrow()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[derive(Default)]
    pub struct TestHost {
        next_id: RefCell<u64>,
    }

    impl TestHost {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn create_container(&self) -> TestNode {
            self.make_node(None, None)
        }

        fn make_node(&self, tag: Option<&str>, text: Option<&str>) -> TestNode {
            let mut id = self.next_id.borrow_mut();
            *id += 1;
            TestNode(Rc::new(NodeData {
                id: *id,
                tag: RefCell::new(tag.map(String::from)),
                text: RefCell::new(text.map(String::from)),
                attrs: RefCell::new(Vec::new()),
                style: RefCell::new(Vec::new()),
                class: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(None),
            }))
        }
    }

    pub struct TestEvent;

    impl DomHost for TestHost {
        type Node = TestNode;
        type Event = TestEvent;

        fn create_element(&self, tag: &str) -> Self::Node {
            self.make_node(Some(tag), None)
        }

        fn create_text(&self, data: &str) -> Self::Node {
            self.make_node(None, Some(data))
        }

        fn set_text(&self, node: &Self::Node, data: &str) {
            *node.0.text.borrow_mut() = Some(data.to_string());
        }

        fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) {
            let mut attrs = node.0.attrs.borrow_mut();
            if let Some(entry) = attrs.iter_mut().find(|(n, _)| n == name) {
                entry.1 = value.to_string();
            } else {
                attrs.push((name.to_string(), value.to_string()));
            }
        }

        fn remove_attribute(&self, node: &Self::Node, name: &str) {
            node.0.attrs.borrow_mut().retain(|(n, _)| n != name);
        }

        fn set_style_property(&self, node: &Self::Node, name: &str, value: &str) {
            let mut style = node.0.style.borrow_mut();
            if let Some(entry) = style.iter_mut().find(|(n, _)| n == name) {
                entry.1 = value.to_string();
            } else {
                style.push((name.to_string(), value.to_string()));
            }
        }

        fn remove_style_property(&self, node: &Self::Node, name: &str) {
            node.0.style.borrow_mut().retain(|(n, _)| n != name);
        }

        fn set_class(&self, node: &Self::Node, class: &ClassValue) {
            *node.0.class.borrow_mut() = Some(class.resolve());
        }

        fn remove_class(&self, node: &Self::Node) {
            *node.0.class.borrow_mut() = None;
        }

        fn add_event_listener(
            &self,
            node: &Self::Node,
            event_type: &str,
            _callback: Rc<dyn Fn(Self::Event)>,
        ) -> ListenerHandle {
            node.0.listeners.borrow_mut().push(event_type.to_string());
            ListenerHandle(Box::new(event_type.to_string()))
        }

        fn remove_event_listener(&self, node: &Self::Node, handle: ListenerHandle) {
            if let Ok(event_type) = handle.0.downcast::<String>() {
                let mut listeners = node.0.listeners.borrow_mut();
                if let Some(pos) = listeners.iter().position(|e| e == &*event_type) {
                    listeners.remove(pos);
                }
            }
        }

        fn append_child(&self, parent: &Self::Node, child: &Self::Node) {
            parent.0.children.borrow_mut().push(child.clone());
            *child.0.parent.borrow_mut() = Some(Rc::downgrade(&parent.0));
        }

        fn insert_before(&self, parent: &Self::Node, child: &Self::Node, anchor: Option<&Self::Node>) {
            let mut children = parent.0.children.borrow_mut();
            children.retain(|c| c.0.id != child.0.id);
            let index = match anchor {
                Some(anchor) => children.iter().position(|c| c.0.id == anchor.0.id).unwrap_or(children.len()),
                None => children.len(),
            };
            children.insert(index, child.clone());
            drop(children);
            *child.0.parent.borrow_mut() = Some(Rc::downgrade(&parent.0));
        }

        fn remove_child(&self, parent: &Self::Node, child: &Self::Node) {
            parent.0.children.borrow_mut().retain(|c| c.0.id != child.0.id);
            *child.0.parent.borrow_mut() = None;
        }

        fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node> {
            let parent = node.0.parent.borrow().as_ref()?.upgrade()?;
            let children = parent.children.borrow();
            let index = children.iter().position(|c| c.0.id == node.0.id)?;
            children.get(index + 1).cloned()
        }
    }
}
