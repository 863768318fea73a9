//! A live, in-memory document.
//!
//! Models what the DOM driver needs from a browser document: a tree of
//! element and text nodes, attributes, and event listeners with capture,
//! target and bubble dispatch. Node handles are generational, so a handle to
//! a removed node never aliases a node created later in the same slot.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::DomError;
use crate::selector::Selector;

/// Slot index plus generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Identifies a registered event listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

type Callback = Rc<dyn Fn(&DomEvent)>;

struct Listener {
    node: NodeId,
    event_type: String,
    capture: bool,
    callback: Callback,
}

struct DocumentInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    listeners: BTreeMap<ListenerId, Listener>,
    by_node: BTreeMap<NodeId, Vec<ListenerId>>,
    next_listener: u64,
    mutations: u64,
}

impl DocumentInner {
    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = Some(data);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn get(&self, id: NodeId) -> Option<&NodeData> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_ref()
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_mut()
    }

    /// Unlink `id` from its parent, if it has one.
    fn detach(&mut self, id: NodeId) {
        let parent = self.get(id).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = self.get_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }
        if let Some(n) = self.get_mut(id) {
            n.parent = None;
        }
    }

    /// Release `id` and everything below it, dropping their listeners.
    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation {
                continue;
            }
            let Some(data) = slot.data.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            stack.extend(data.children);

            if let Some(ids) = self.by_node.remove(&id) {
                for listener in ids {
                    self.listeners.remove(&listener);
                }
            }
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.get(node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &node.children {
                    self.text_content(*child, out);
                }
            }
        }
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => escape_into(text, false, out),
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        escape_into(value, true, out);
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn escape_into(s: &str, attribute: bool, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// A live document.
///
/// Cheap to clone; clones share the same tree. The document starts with a
/// single `body` element as its root.
///
/// # Example
///
/// ```rust
/// use cycle_dom::Document;
///
/// let document = Document::new();
/// let app = document.create_element("div");
/// app.set_attribute("id", "app").unwrap();
/// document.body().append_child(&app).unwrap();
///
/// let found = document.query_selector("#app").unwrap().unwrap();
/// assert_eq!(found, app);
/// assert_eq!(document.body().outer_html(), r#"<body><div id="app"></div></body>"#);
/// ```
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Document")
            .field("nodes", &(inner.slots.len() - inner.free.len()))
            .field("listeners", &inner.listeners.len())
            .field("mutations", &inner.mutations)
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Document {}

impl Document {
    /// Create a document with an empty `body`.
    pub fn new() -> Self {
        let mut inner = DocumentInner {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            listeners: BTreeMap::new(),
            by_node: BTreeMap::new(),
            next_listener: 0,
            mutations: 0,
        };
        inner.root = inner.alloc(NodeKind::Element {
            tag: "body".to_string(),
            attributes: BTreeMap::new(),
        });
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// The root `body` element.
    pub fn body(&self) -> Node {
        let root = self.inner.borrow().root;
        self.node(root)
    }

    /// Create a detached element. The tag is lowercased.
    pub fn create_element(&self, tag: &str) -> Node {
        let id = self.inner.borrow_mut().alloc(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
        });
        self.node(id)
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> Node {
        let id = self
            .inner
            .borrow_mut()
            .alloc(NodeKind::Text(text.to_string()));
        self.node(id)
    }

    /// Number of tree and attribute changes made so far.
    pub fn mutation_count(&self) -> u64 {
        self.inner.borrow().mutations
    }

    /// Number of registered event listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(listener) = inner.listeners.remove(&id) else {
            return false;
        };
        if let Some(ids) = inner.by_node.get_mut(&listener.node) {
            ids.retain(|l| *l != id);
            if ids.is_empty() {
                inner.by_node.remove(&listener.node);
            }
        }
        true
    }

    /// First node matching `selector`, searching from the root in document
    /// order.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, DomError> {
        let body = self.body();
        let selector = Selector::parse(selector)?;
        if selector.matches(&body, &body) {
            return Ok(Some(body));
        }
        Ok(body
            .descendants()
            .into_iter()
            .find(|node| selector.matches(node, &body)))
    }

    fn node(&self, id: NodeId) -> Node {
        Node {
            document: self.clone(),
            id,
        }
    }

    fn bump(&self) {
        self.inner.borrow_mut().mutations += 1;
    }
}

/// A handle to an element or text node of a [`Document`].
///
/// Handles compare equal when they refer to the same node. Operations on a
/// handle whose node has been removed fail with [`DomError::DetachedNode`]
/// or return an empty result.
#[derive(Clone)]
pub struct Node {
    document: Document,
    id: NodeId,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.document == other.document
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.document.inner.borrow();
        match inner.get(self.id).map(|n| &n.kind) {
            Some(NodeKind::Element { tag, .. }) => {
                write!(f, "<{}>@{}.{}", tag, self.id.index, self.id.generation)
            }
            Some(NodeKind::Text(text)) => write!(f, "{:?}@{}", text, self.id.index),
            None => write!(f, "<removed>@{}.{}", self.id.index, self.id.generation),
        }
    }
}

impl Node {
    /// The document this node belongs to.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The generational id of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Check whether the node still exists.
    pub fn is_alive(&self) -> bool {
        self.document.inner.borrow().get(self.id).is_some()
    }

    /// Check whether the node is attached under the document root.
    pub fn is_connected(&self) -> bool {
        let inner = self.document.inner.borrow();
        inner.get(self.id).is_some() && inner.is_ancestor_or_self(inner.root, self.id)
    }

    /// Check if this is a text node.
    pub fn is_text(&self) -> bool {
        matches!(
            self.document.inner.borrow().get(self.id).map(|n| &n.kind),
            Some(NodeKind::Text(_))
        )
    }

    /// Tag name of an element.
    pub fn tag(&self) -> Option<String> {
        match &self.document.inner.borrow().get(self.id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.document.inner.borrow().get(self.id)?.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    /// All attributes of an element.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        match self.document.inner.borrow().get(self.id).map(|n| &n.kind) {
            Some(NodeKind::Element { attributes, .. }) => attributes.clone(),
            _ => BTreeMap::new(),
        }
    }

    /// Check whether the `class` attribute lists `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Set an attribute.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), DomError> {
        {
            let mut inner = self.document.inner.borrow_mut();
            match inner.get_mut(self.id).map(|n| &mut n.kind) {
                Some(NodeKind::Element { attributes, .. }) => {
                    attributes.insert(name.to_string(), value.to_string());
                }
                Some(NodeKind::Text(_)) => return Err(DomError::HierarchyRequest),
                None => return Err(DomError::DetachedNode),
            }
        }
        self.document.bump();
        Ok(())
    }

    /// Remove an attribute. Removing a missing attribute is not a change.
    pub fn remove_attribute(&self, name: &str) -> Result<(), DomError> {
        let removed = {
            let mut inner = self.document.inner.borrow_mut();
            match inner.get_mut(self.id).map(|n| &mut n.kind) {
                Some(NodeKind::Element { attributes, .. }) => attributes.remove(name).is_some(),
                Some(NodeKind::Text(_)) => false,
                None => return Err(DomError::DetachedNode),
            }
        };
        if removed {
            self.document.bump();
        }
        Ok(())
    }

    /// Current value of a form control, kept in its `value` attribute.
    pub fn value(&self) -> Option<String> {
        self.attribute("value")
    }

    /// Set the value of a form control, as a user typing would.
    pub fn set_value(&self, value: &str) -> Result<(), DomError> {
        self.set_attribute("value", value)
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.document.inner.borrow().text_content(self.id, &mut out);
        out
    }

    /// Set the text of a text node, or replace an element's children with a
    /// single text node.
    pub fn set_text(&self, text: &str) -> Result<(), DomError> {
        let mut inner = self.document.inner.borrow_mut();
        let is_text = match inner.get(self.id) {
            Some(node) => matches!(node.kind, NodeKind::Text(_)),
            None => return Err(DomError::DetachedNode),
        };
        if is_text {
            if let Some(NodeData {
                kind: NodeKind::Text(content),
                ..
            }) = inner.get_mut(self.id)
            {
                *content = text.to_string();
            }
            inner.mutations += 1;
            return Ok(());
        }

        let children = inner
            .get_mut(self.id)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        for child in children {
            inner.free_subtree(child);
        }
        let text = inner.alloc(NodeKind::Text(text.to_string()));
        if let Some(t) = inner.get_mut(text) {
            t.parent = Some(self.id);
        }
        if let Some(node) = inner.get_mut(self.id) {
            node.children.push(text);
        }
        inner.mutations += 1;
        Ok(())
    }

    /// Parent node, if attached.
    pub fn parent(&self) -> Option<Node> {
        let parent = self.document.inner.borrow().get(self.id)?.parent?;
        Some(self.document.node(parent))
    }

    /// Child nodes in order.
    pub fn children(&self) -> Vec<Node> {
        let ids = match self.document.inner.borrow().get(self.id) {
            Some(node) => node.children.clone(),
            None => return Vec::new(),
        };
        ids.into_iter().map(|id| self.document.node(id)).collect()
    }

    /// Child at `index`.
    pub fn child(&self, index: usize) -> Option<Node> {
        let id = *self.document.inner.borrow().get(self.id)?.children.get(index)?;
        Some(self.document.node(id))
    }

    /// All nodes below this one, in document order.
    pub fn descendants(&self) -> Vec<Node> {
        let inner = self.document.inner.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match inner.get(self.id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            if let Some(node) = inner.get(id) {
                stack.extend(node.children.iter().rev().copied());
                out.push(self.document.node(id));
            }
        }
        out
    }

    /// Append `child` as the last child, moving it if it is attached
    /// elsewhere.
    pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
        if child.document != self.document {
            return Err(DomError::HierarchyRequest);
        }
        {
            let mut inner = self.document.inner.borrow_mut();
            if inner.get(self.id).is_none() || inner.get(child.id).is_none() {
                return Err(DomError::DetachedNode);
            }
            if matches!(inner.get(self.id).map(|n| &n.kind), Some(NodeKind::Text(_)))
                || inner.is_ancestor_or_self(child.id, self.id)
            {
                return Err(DomError::HierarchyRequest);
            }
            inner.detach(child.id);
            if let Some(c) = inner.get_mut(child.id) {
                c.parent = Some(self.id);
            }
            if let Some(p) = inner.get_mut(self.id) {
                p.children.push(child.id);
            }
            inner.mutations += 1;
        }
        Ok(())
    }

    /// Put `replacement` where this node is and destroy this node.
    pub fn replace_with(&self, replacement: &Node) -> Result<(), DomError> {
        if replacement.document != self.document {
            return Err(DomError::HierarchyRequest);
        }
        let mut inner = self.document.inner.borrow_mut();
        if inner.get(replacement.id).is_none() {
            return Err(DomError::DetachedNode);
        }
        let parent = inner
            .get(self.id)
            .ok_or(DomError::DetachedNode)?
            .parent
            .ok_or(DomError::HierarchyRequest)?;
        if inner.is_ancestor_or_self(replacement.id, parent) {
            return Err(DomError::HierarchyRequest);
        }

        inner.detach(replacement.id);
        if let Some(p) = inner.get_mut(parent) {
            for slot in p.children.iter_mut() {
                if *slot == self.id {
                    *slot = replacement.id;
                }
            }
        }
        if let Some(r) = inner.get_mut(replacement.id) {
            r.parent = Some(parent);
        }
        inner.free_subtree(self.id);
        inner.mutations += 1;
        Ok(())
    }

    /// Detach this node from its parent and destroy it with its subtree.
    pub fn remove(&self) -> Result<(), DomError> {
        let mut inner = self.document.inner.borrow_mut();
        if inner.get(self.id).is_none() {
            return Err(DomError::DetachedNode);
        }
        if self.id == inner.root {
            return Err(DomError::HierarchyRequest);
        }
        inner.detach(self.id);
        inner.free_subtree(self.id);
        inner.mutations += 1;
        Ok(())
    }

    /// Destroy every child.
    pub fn clear_children(&self) -> Result<(), DomError> {
        let mut inner = self.document.inner.borrow_mut();
        let children = match inner.get_mut(self.id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return Err(DomError::DetachedNode),
        };
        if children.is_empty() {
            return Ok(());
        }
        for child in children {
            inner.free_subtree(child);
        }
        inner.mutations += 1;
        Ok(())
    }

    /// Register a listener for `event_type` on this node.
    ///
    /// A capturing listener runs while the event travels down to its target;
    /// the others run at the target and while it bubbles back up.
    pub fn add_event_listener(
        &self,
        event_type: &str,
        capture: bool,
        callback: impl Fn(&DomEvent) + 'static,
    ) -> Result<ListenerId, DomError> {
        let mut inner = self.document.inner.borrow_mut();
        if inner.get(self.id).is_none() {
            return Err(DomError::DetachedNode);
        }
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.insert(
            id,
            Listener {
                node: self.id,
                event_type: event_type.to_string(),
                capture,
                callback: Rc::new(callback),
            },
        );
        inner.by_node.entry(self.id).or_default().push(id);
        Ok(id)
    }

    /// Remove a listener registered on any node of this document.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.document.remove_event_listener(id)
    }

    /// Dispatch a new event of `event_type` with this node as target.
    ///
    /// Returns the event after dispatch.
    pub fn dispatch(&self, event_type: &str) -> DomEvent {
        let event = DomEvent::new(event_type, self.clone());
        self.dispatch_event(&event);
        event
    }

    /// Simulate a click.
    pub fn click(&self) -> DomEvent {
        self.dispatch("click")
    }

    /// Dispatch `event` through this node's ancestors.
    ///
    /// Capturing listeners run from the root down, then the target's
    /// listeners in registration order, then bubbling listeners from the
    /// parent up. Listeners removed during dispatch do not run; listeners
    /// added during dispatch wait for the next event.
    pub fn dispatch_event(&self, event: &DomEvent) {
        let ancestors: Vec<NodeId> = {
            let inner = self.document.inner.borrow();
            let mut ancestors = Vec::new();
            let mut current = inner.get(self.id).and_then(|n| n.parent);
            while let Some(id) = current {
                ancestors.push(id);
                current = inner.get(id).and_then(|n| n.parent);
            }
            ancestors.reverse();
            ancestors
        };

        for &id in &ancestors {
            self.invoke(id, Phase::Capturing, Some(true), event);
            if event.is_propagation_stopped() {
                return;
            }
        }
        self.invoke(self.id, Phase::AtTarget, None, event);
        if event.is_propagation_stopped() {
            return;
        }
        for &id in ancestors.iter().rev() {
            self.invoke(id, Phase::Bubbling, Some(false), event);
            if event.is_propagation_stopped() {
                return;
            }
        }
    }

    fn invoke(&self, node: NodeId, phase: Phase, capture: Option<bool>, event: &DomEvent) {
        let callbacks: Vec<(ListenerId, Callback)> = {
            let inner = self.document.inner.borrow();
            let Some(ids) = inner.by_node.get(&node) else {
                return;
            };
            ids.iter()
                .filter_map(|id| {
                    let listener = inner.listeners.get(id)?;
                    let wanted = listener.event_type == event.event_type()
                        && capture.map_or(true, |c| c == listener.capture);
                    wanted.then(|| (*id, Rc::clone(&listener.callback)))
                })
                .collect()
        };
        if callbacks.is_empty() {
            return;
        }

        let scoped = event.at(self.document.node(node), phase);
        for (id, callback) in callbacks {
            let live = self.document.inner.borrow().listeners.contains_key(&id);
            if live {
                callback(&scoped);
            }
        }
    }

    /// First descendant matching `selector`.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants()
            .into_iter()
            .find(|node| selector.matches(node, self)))
    }

    /// Every descendant matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants()
            .into_iter()
            .filter(|node| selector.matches(node, self))
            .collect())
    }

    /// HTML of this node and its subtree.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.document.inner.borrow().write_html(self.id, &mut out);
        out
    }

    /// HTML of this node's children.
    pub fn inner_html(&self) -> String {
        let inner = self.document.inner.borrow();
        let mut out = String::new();
        if let Some(node) = inner.get(self.id) {
            for child in &node.children {
                inner.write_html(*child, &mut out);
            }
        }
        out
    }
}

/// Where an event is in its dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not being dispatched.
    None,
    /// Travelling from the root down to the target.
    Capturing,
    /// At the target.
    AtTarget,
    /// Travelling from the target back up.
    Bubbling,
}

/// An event travelling through a [`Document`].
///
/// Clones share propagation state: stopping propagation on any of them stops
/// the dispatch.
#[derive(Clone)]
pub struct DomEvent {
    event_type: Rc<str>,
    target: Node,
    current_target: Node,
    phase: Phase,
    stopped: Rc<Cell<bool>>,
}

impl fmt::Debug for DomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomEvent")
            .field("type", &self.event_type)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("phase", &self.phase)
            .finish()
    }
}

impl DomEvent {
    /// Create an undispatched event. Useful for feeding mock responses.
    pub fn new(event_type: &str, target: Node) -> Self {
        Self {
            event_type: Rc::from(event_type),
            current_target: target.clone(),
            target,
            phase: Phase::None,
            stopped: Rc::new(Cell::new(false)),
        }
    }

    /// The event type, like `click`.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The node the event was dispatched on.
    pub fn target(&self) -> &Node {
        &self.target
    }

    /// The node whose listener is running.
    pub fn current_target(&self) -> &Node {
        &self.current_target
    }

    /// The dispatch phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Stop the event after the listeners of the current node.
    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    /// Check whether propagation has been stopped.
    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }

    fn at(&self, current_target: Node, phase: Phase) -> Self {
        Self {
            event_type: Rc::clone(&self.event_type),
            target: self.target.clone(),
            current_target,
            phase,
            stopped: Rc::clone(&self.stopped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Document, Node, Node, Node) {
        let document = Document::new();
        let outer = document.create_element("div");
        let inner = document.create_element("button");
        let text = document.create_text("go");
        inner.append_child(&text).unwrap();
        outer.append_child(&inner).unwrap();
        document.body().append_child(&outer).unwrap();
        (document, outer, inner, text)
    }

    #[test]
    fn build_and_serialize() {
        let (document, outer, inner, _) = tree();
        inner.set_attribute("class", "big & \"bold\"").unwrap();
        assert_eq!(
            outer.outer_html(),
            r#"<div><button class="big &amp; &quot;bold&quot;">go</button></div>"#
        );
        assert_eq!(document.body().text_content(), "go");
        assert!(inner.is_connected());
    }

    #[test]
    fn void_and_boolean_attributes() {
        let document = Document::new();
        let input = document.create_element("INPUT");
        input.set_attribute("disabled", "").unwrap();
        assert_eq!(input.outer_html(), "<input disabled>");
    }

    #[test]
    fn removed_handles_are_stale() {
        let (document, outer, inner, text) = tree();
        outer.remove().unwrap();
        assert!(!outer.is_alive());
        assert!(!inner.is_alive());
        assert!(!text.is_alive());
        assert_eq!(inner.set_attribute("a", "b"), Err(DomError::DetachedNode));

        // The freed slot is reused, but the old handle does not alias it.
        let fresh = document.create_element("p");
        assert!(fresh.is_alive());
        assert_ne!(fresh, outer);
        assert_ne!(fresh, inner);
        assert_ne!(fresh, text);
    }

    #[test]
    fn cannot_append_ancestor() {
        let (_, outer, inner, _) = tree();
        assert_eq!(inner.append_child(&outer), Err(DomError::HierarchyRequest));
        assert_eq!(outer.append_child(&outer), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn replace_with_keeps_position() {
        let document = Document::new();
        let list = document.create_element("ul");
        let a = document.create_element("li");
        let b = document.create_element("li");
        list.append_child(&a).unwrap();
        list.append_child(&b).unwrap();

        let p = document.create_element("p");
        a.replace_with(&p).unwrap();
        assert_eq!(list.children(), vec![p.clone(), b]);
        assert_eq!(p.parent(), Some(list));
        assert!(!a.is_alive());
    }

    #[test]
    fn mutation_counter() {
        let (document, outer, _, _) = tree();
        let before = document.mutation_count();
        outer.set_attribute("id", "x").unwrap();
        outer.remove_attribute("missing").unwrap();
        outer.remove_attribute("id").unwrap();
        assert_eq!(document.mutation_count(), before + 2);
    }

    #[test]
    fn capture_target_bubble_order() {
        let (document, outer, inner, _) = tree();
        let log = Rc::new(RefCell::new(Vec::new()));

        let record = |name: &'static str| {
            let log = Rc::clone(&log);
            move |e: &DomEvent| log.borrow_mut().push((name, e.phase()))
        };
        outer.add_event_listener("click", false, record("outer bubble")).unwrap();
        outer.add_event_listener("click", true, record("outer capture")).unwrap();
        inner.add_event_listener("click", false, record("inner")).unwrap();
        document
            .body()
            .add_event_listener("keyup", false, record("body keyup"))
            .unwrap();

        inner.click();
        assert_eq!(
            *log.borrow(),
            vec![
                ("outer capture", Phase::Capturing),
                ("inner", Phase::AtTarget),
                ("outer bubble", Phase::Bubbling),
            ]
        );
    }

    #[test]
    fn stop_propagation() {
        let (_, outer, inner, text) = tree();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        outer
            .add_event_listener("click", false, move |_| h.set(h.get() + 1))
            .unwrap();
        inner
            .add_event_listener("click", false, |e| e.stop_propagation())
            .unwrap();

        let event = text.click();
        assert!(event.is_propagation_stopped());
        assert_eq!(hits.get(), 0);
        assert_eq!(event.target(), &text);
    }

    #[test]
    fn listener_removed_during_dispatch_does_not_run() {
        let (document, _, inner, _) = tree();
        let second_ran = Rc::new(Cell::new(false));
        let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let doc = document.clone();
        let s = Rc::clone(&slot);
        inner
            .add_event_listener("click", false, move |_| {
                if let Some(id) = s.get() {
                    doc.remove_event_listener(id);
                }
            })
            .unwrap();
        let r = Rc::clone(&second_ran);
        let second = inner
            .add_event_listener("click", false, move |_| r.set(true))
            .unwrap();
        slot.set(Some(second));

        inner.click();
        assert!(!second_ran.get());
    }

    #[test]
    fn removing_nodes_drops_listeners() {
        let (document, outer, inner, _) = tree();
        inner.add_event_listener("click", false, |_| {}).unwrap();
        assert_eq!(document.listener_count(), 1);
        outer.remove().unwrap();
        assert_eq!(document.listener_count(), 0);
    }

    #[test]
    fn set_text_on_element_replaces_children() {
        let (_, outer, inner, text) = tree();
        inner.set_text("stop").unwrap();
        assert!(!text.is_alive());
        assert_eq!(outer.text_content(), "stop");
    }

    #[test]
    fn queries() {
        let (document, outer, inner, _) = tree();
        outer.set_attribute("class", "panel").unwrap();
        assert_eq!(document.query_selector(".panel button").unwrap(), Some(inner.clone()));
        assert_eq!(outer.query_selector_all("button").unwrap(), vec![inner]);
        assert!(document.query_selector("[").is_err());
    }
}
