//! Custom elements: tags rendered by a nested application.
//!
//! A custom element in the tree is rendered as an empty host element. Its
//! component runs as its own application with two drivers: `"DOM"`, rendering
//! into the host, and `"props"`, a stream of the attributes and children the
//! parent gave the tag. The nested application lives as long as the host
//! element does.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use cycle_run::{run, Driver, Drivers, Requests, Responses, Result as RunResult, Runtime};
use cycle_stream::{Stream, Subject};
use cycle_vtree::{Attributes, AttrValue, NodePath, VElement, VNode};
use tracing::trace;

use crate::document::Node;
use crate::driver::DomDriver;

/// Driver name a component renders through.
pub const DOM_DRIVER: &str = "DOM";
/// Driver name a component reads its [`Props`] from.
pub const PROPS_DRIVER: &str = "props";

type Component = Rc<dyn Fn(&Responses) -> RunResult<Requests>>;

/// Components by tag name.
#[derive(Clone, Default)]
pub struct CustomElements {
    components: BTreeMap<String, Component>,
}

impl fmt::Debug for CustomElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.components.keys()).finish()
    }
}

impl CustomElements {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component, builder style. Tags are case-insensitive.
    pub fn with<F>(mut self, tag: &str, component: F) -> Self
    where
        F: Fn(&Responses) -> RunResult<Requests> + 'static,
    {
        self.insert(tag, component);
        self
    }

    /// Register `component` for `tag`, replacing any earlier one.
    pub fn insert<F>(&mut self, tag: &str, component: F)
    where
        F: Fn(&Responses) -> RunResult<Requests> + 'static,
    {
        self.components
            .insert(tag.to_ascii_lowercase(), Rc::new(component));
    }

    /// Add every component of `other`. Entries in `other` win.
    pub fn extend(&mut self, other: &CustomElements) {
        for (tag, component) in &other.components {
            self.components.insert(tag.clone(), Rc::clone(component));
        }
    }

    /// Check whether a component is registered for `tag`, ignoring case.
    pub fn contains(&self, tag: &str) -> bool {
        self.components.contains_key(&tag.to_ascii_lowercase())
    }

    /// Registered tags, lowercased, in order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check whether no component is registered.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn get(&self, tag: &str) -> Option<Component> {
        self.components.get(tag).cloned()
    }
}

/// What a parent passed to a custom element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    attributes: Attributes,
    children: Vec<VNode>,
}

impl Props {
    /// Props carrying the host element's `attributes` and `children`.
    pub fn new(attributes: Attributes, children: Vec<VNode>) -> Self {
        Self {
            attributes,
            children,
        }
    }

    /// Every attribute the parent set.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The attribute called `name`, if the parent set it.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// The child trees the parent wrapped in the element.
    pub fn children(&self) -> &[VNode] {
        &self.children
    }
}

/// Source-only driver handing a component its props.
struct PropsDriver {
    props: Subject<Props>,
}

impl Driver for PropsDriver {
    type Request = ();
    type Response = Stream<Props>;

    fn drive(&self, _requests: Stream<()>) -> RunResult<Stream<Props>> {
        Ok(self.props.stream())
    }

    fn needs_requests(&self) -> bool {
        false
    }
}

/// A custom element found while masking a tree.
#[derive(Debug)]
pub(crate) struct Host {
    pub(crate) path: NodePath,
    pub(crate) tag: String,
    pub(crate) props: Props,
}

/// Replace every custom element in `tree` by an empty element of the same
/// tag and attributes. Returns the masked tree and the hosts, in document
/// order.
pub(crate) fn mask(tree: &VNode, custom: &CustomElements) -> (VNode, Vec<Host>) {
    let mut hosts = Vec::new();
    if custom.is_empty() {
        return (tree.clone(), hosts);
    }
    let mut path = Vec::new();
    let masked = mask_node(tree, custom, &mut path, &mut hosts);
    (masked, hosts)
}

fn mask_node(
    node: &VNode,
    custom: &CustomElements,
    path: &mut NodePath,
    hosts: &mut Vec<Host>,
) -> VNode {
    let Some(element) = node.as_element() else {
        return node.clone();
    };
    if custom.contains(&element.tag) {
        hosts.push(Host {
            path: path.clone(),
            tag: element.tag.clone(),
            props: Props::new(element.attributes.clone(), element.children.clone()),
        });
        return VNode::from(VElement {
            tag: element.tag.clone(),
            attributes: element.attributes.clone(),
            children: Vec::new(),
        });
    }

    let mut changed = false;
    let mut children = Vec::with_capacity(element.children.len());
    for (index, child) in element.children.iter().enumerate() {
        path.push(index);
        let masked = mask_node(child, custom, path, hosts);
        path.pop();
        changed |= !masked.ptr_eq(child);
        children.push(masked);
    }
    if !changed {
        return node.clone();
    }
    VNode::from(VElement {
        tag: element.tag.clone(),
        attributes: element.attributes.clone(),
        children,
    })
}

/// A running component bound to one host element.
pub(crate) struct Instance {
    tag: String,
    host: Node,
    props: Subject<Props>,
    runtime: Runtime,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("tag", &self.tag)
            .field("host", &self.host)
            .finish()
    }
}

impl Instance {
    /// Start the component registered for `tag` inside `host`.
    ///
    /// Returns `None` when no component is registered.
    pub(crate) fn start(
        custom: &CustomElements,
        tag: &str,
        host: Node,
        props: Props,
    ) -> Option<RunResult<Self>> {
        let component = custom.get(tag)?;
        trace!(tag, "starting custom element");
        let subject = Subject::seeded(props);
        let drivers = Drivers::new()
            .with(
                DOM_DRIVER,
                DomDriver::new(host.clone()).with_custom_elements(custom.clone()),
            )
            .with(
                PROPS_DRIVER,
                PropsDriver {
                    props: subject.clone(),
                },
            );
        Some(run(|responses| component(responses), drivers).map(|runtime| Self {
            tag: tag.to_string(),
            host,
            props: subject,
            runtime,
        }))
    }

    /// Whether this instance can keep serving `tag` at `host`.
    pub(crate) fn serves(&self, tag: &str, host: &Node) -> bool {
        self.tag == tag && &self.host == host && self.host.is_alive()
    }

    /// Push new props, if they differ from the last ones.
    pub(crate) fn update(&self, props: Props) {
        if self.props.latest().as_ref() != Some(&props) {
            trace!(tag = %self.tag, "custom element props changed");
            self.props.next(props);
        }
    }

    pub(crate) fn dispose(mut self) {
        trace!(tag = %self.tag, "disposing custom element");
        self.runtime.dispose();
        self.props.complete();
    }
}
