//! VDOM node types.
//!
//! `VNode` is a tagged union over the five node shapes a tree can take:
//! text, element, fragment, component, and root. Children are kept in a
//! [`smallvec::SmallVec`] rather than a plain `Vec` — most elements in a
//! real tree have a handful of children, so inlining a handful avoids a
//! heap allocation per node in the common case.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::component::ComponentId;
use crate::reactive::Value;

/// A child-list identity key, unique within its parent's keyed children
/// map if any sibling has a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(Rc<str>);

impl Key {
    pub fn new(s: impl Into<Rc<str>>) -> Self {
        Self(s.into())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<u64> for Key {
    fn from(n: u64) -> Self {
        Self::new(n.to_string())
    }
}

/// `class="..."` or a flag-map where `true` includes the name.
#[derive(Debug, Clone)]
pub enum ClassValue {
    Str(Rc<str>),
    Flags(Vec<(Rc<str>, bool)>),
}

impl ClassValue {
    /// Resolve to the final `class` attribute string.
    pub fn resolve(&self) -> String {
        match self {
            ClassValue::Str(s) => s.to_string(),
            ClassValue::Flags(flags) => flags
                .iter()
                .filter(|(_, enabled)| *enabled)
                .map(|(name, _)| name.as_ref())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// `ref={...}`: either a callback invoked with the element on mount and
/// `None` on unmount, or a cell assigned once on mount.
pub enum RefTarget<N> {
    Callback(Rc<dyn Fn(Option<N>)>),
    Cell(Rc<std::cell::RefCell<Option<N>>>),
}

/// An event listener: the DOM event-type name (the part after the
/// `on`-prefix, lower-cased) and the callback.
pub struct EventHandler<E> {
    pub event_type: Rc<str>,
    pub callback: Rc<dyn Fn(E)>,
}

/// Attribute/event/style/class/ref/children payload of an [`VNode::Element`].
///
/// Generic over `N` (the host's native node handle type, used only by
/// `ref`) and `E` (the host's native event type, used only by event
/// handlers) so this module stays independent of any concrete DOM host.
pub struct ElementProps<N, E> {
    /// Plain attributes, including `data-*`/`aria-*`, set through the
    /// attribute namespace rather than as a DOM property.
    pub attrs: Vec<(Rc<str>, Rc<str>)>,
    pub class: Option<ClassValue>,
    pub style: Vec<(Rc<str>, Rc<str>)>,
    pub events: Vec<EventHandler<E>>,
    pub ref_target: Option<RefTarget<N>>,
}

impl<N, E> Default for ElementProps<N, E> {
    fn default() -> Self {
        Self {
            attrs: Vec::new(),
            class: None,
            style: Vec::new(),
            events: Vec::new(),
            ref_target: None,
        }
    }
}

/// The five node shapes a tree can take, parameterized the same way
/// [`ElementProps`] is.
pub enum VNode<N, E> {
    Text(Rc<str>),
    Element {
        tag: Rc<str>,
        props: ElementProps<N, E>,
        children: SmallVec<[VNode<N, E>; 4]>,
        key: Option<Key>,
    },
    Fragment {
        children: SmallVec<[VNode<N, E>; 4]>,
        key: Option<Key>,
    },
    Component {
        component_id: ComponentId,
        props: Vec<(Rc<str>, Value)>,
        key: Option<Key>,
    },
    /// The mount root: a host container plus the single vnode rendered
    /// into it. Only ever constructed by [`crate::vdom::render`] —
    /// user-authored trees never contain one.
    Root {
        container: N,
        child: Box<VNode<N, E>>,
    },
}

impl<N, E> VNode<N, E> {
    pub fn text(s: impl Into<Rc<str>>) -> Self {
        VNode::Text(s.into())
    }

    pub fn element(tag: impl Into<Rc<str>>) -> ElementBuilder<N, E> {
        ElementBuilder {
            tag: tag.into(),
            props: ElementProps::default(),
            children: SmallVec::new(),
            key: None,
        }
    }

    pub fn fragment(children: impl IntoIterator<Item = VNode<N, E>>) -> Self {
        VNode::Fragment {
            children: children.into_iter().collect(),
            key: None,
        }
    }

    pub fn component(
        component_id: ComponentId,
        props: impl IntoIterator<Item = (Rc<str>, Value)>,
    ) -> Self {
        VNode::Component {
            component_id,
            props: props.into_iter().collect(),
            key: None,
        }
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            VNode::Text(_) => None,
            VNode::Element { key, .. } => key.as_ref(),
            VNode::Fragment { key, .. } => key.as_ref(),
            VNode::Component { key, .. } => key.as_ref(),
            VNode::Root { .. } => None,
        }
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        let key = Some(key.into());
        match &mut self {
            VNode::Text(_) => {}
            VNode::Element { key: k, .. } => *k = key,
            VNode::Fragment { key: k, .. } => *k = key,
            VNode::Component { key: k, .. } => *k = key,
            VNode::Root { .. } => {}
        }
        self
    }

    /// Same variant, and for `Element` the same tag. Used by the
    /// reconciler to decide update-in-place vs. replace.
    pub fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (VNode::Text(_), VNode::Text(_)) => true,
            (VNode::Element { tag: a, .. }, VNode::Element { tag: b, .. }) => a == b,
            (VNode::Fragment { .. }, VNode::Fragment { .. }) => true,
            (VNode::Component { component_id: a, .. }, VNode::Component { component_id: b, .. }) => {
                a == b
            }
            (VNode::Root { .. }, VNode::Root { .. }) => true,
            _ => false,
        }
    }
}

/// Fluent builder for [`VNode::Element`], matching the ergonomics a JSX
/// transform's generated calls would use.
pub struct ElementBuilder<N, E> {
    tag: Rc<str>,
    props: ElementProps<N, E>,
    children: SmallVec<[VNode<N, E>; 4]>,
    key: Option<Key>,
}

impl<N, E> ElementBuilder<N, E> {
    pub fn attr(mut self, name: impl Into<Rc<str>>, value: impl Into<Rc<str>>) -> Self {
        self.props.attrs.push((name.into(), value.into()));
        self
    }

    pub fn class(mut self, value: ClassValue) -> Self {
        self.props.class = Some(value);
        self
    }

    pub fn style(mut self, name: impl Into<Rc<str>>, value: impl Into<Rc<str>>) -> Self {
        self.props.style.push((name.into(), value.into()));
        self
    }

    pub fn on(mut self, event_type: impl Into<Rc<str>>, callback: Rc<dyn Fn(E)>) -> Self {
        self.props.events.push(EventHandler {
            event_type: event_type.into(),
            callback,
        });
        self
    }

    pub fn ref_target(mut self, target: RefTarget<N>) -> Self {
        self.props.ref_target = Some(target);
        self
    }

    pub fn child(mut self, child: VNode<N, E>) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode<N, E>>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn build(self) -> VNode<N, E> {
        VNode::Element {
            tag: self.tag,
            props: self.props,
            children: self.children,
            key: self.key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestVNode = VNode<(), ()>;

    #[test]
    fn class_value_resolves_string_as_is() {
        let class = ClassValue::Str(Rc::from("card active"));
        assert_eq!(class.resolve(), "card active");
    }

    #[test]
    fn class_value_resolves_flags_to_space_separated_enabled_names() {
        let class = ClassValue::Flags(vec![
            (Rc::from("card"), true),
            (Rc::from("active"), false),
            (Rc::from("highlighted"), true),
        ]);
        assert_eq!(class.resolve(), "card highlighted");
    }

    #[test]
    fn same_shape_matches_text_and_fragment_by_variant_alone() {
        assert!(TestVNode::text("a").same_shape(&TestVNode::text("b")));
        assert!(TestVNode::fragment([]).same_shape(&TestVNode::fragment([TestVNode::text("x")])));
    }

    #[test]
    fn same_shape_requires_matching_tag_for_elements() {
        let div: TestVNode = VNode::element("div").build();
        let span: TestVNode = VNode::element("span").build();
        let other_div: TestVNode = VNode::element("div").attr("id", "x").build();
        assert!(!div.same_shape(&span));
        assert!(div.same_shape(&other_div));
    }

    #[test]
    fn same_shape_requires_matching_component_id() {
        let a = VNode::<(), ()>::component("Counter", []);
        let b = VNode::<(), ()>::component("Counter", []);
        let c = VNode::<(), ()>::component("Display", []);
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn different_variants_never_match() {
        let text: TestVNode = VNode::text("a");
        let element: TestVNode = VNode::element("div").build();
        assert!(!text.same_shape(&element));
    }

    #[test]
    fn with_key_sets_key_on_keyable_variants_only() {
        let element: TestVNode = VNode::element("li").build().with_key("a");
        assert_eq!(element.key(), Some(&Key::from("a")));

        let fragment: TestVNode = VNode::fragment([]).with_key("f");
        assert_eq!(fragment.key(), Some(&Key::from("f")));

        // Text has no key slot; with_key is a harmless no-op.
        let text: TestVNode = VNode::text("hi").with_key("ignored");
        assert_eq!(text.key(), None);
    }
}
