//! The virtual tree: immutable element and text nodes.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::shorthand::Shorthand;
use crate::value::AttrValue;

/// Attribute map of an element, ordered by name.
pub type Attributes = BTreeMap<String, AttrValue>;

/// A node of a virtual tree.
///
/// Trees are immutable once built and cheap to clone: elements sit behind an
/// `Rc`, so cloning a tree copies pointers. Two trees compare equal when they
/// are structurally equal; shared subtrees short-circuit the comparison.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VNode {
    /// An element with a tag, attributes and children.
    Element(Rc<VElement>),
    /// A text node.
    Text(Rc<str>),
}

/// An element node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VElement {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    /// Child nodes in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VNode>,
}

impl VNode {
    /// Borrow the element, if this is an element node.
    pub fn as_element(&self) -> Option<&VElement> {
        match self {
            VNode::Element(el) => Some(el),
            VNode::Text(_) => None,
        }
    }

    /// Borrow the text, if this is a text node.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            VNode::Element(_) => None,
            VNode::Text(t) => Some(t),
        }
    }

    /// Check if this is a text node.
    pub fn is_text(&self) -> bool {
        matches!(self, VNode::Text(_))
    }

    /// The tag of an element node.
    pub fn tag(&self) -> Option<&str> {
        self.as_element().map(|el| el.tag.as_str())
    }

    /// Look up an attribute of an element node.
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.as_element()?.attributes.get(name)
    }

    /// Attributes of an element node; empty for text.
    pub fn attributes(&self) -> Option<&Attributes> {
        self.as_element().map(|el| &el.attributes)
    }

    /// Children of an element node; empty for text.
    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element(el) => &el.children,
            VNode::Text(_) => &[],
        }
    }

    /// Concatenated text of this node and everything below it.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        if let VNode::Text(t) = self {
            out.push_str(t);
        }
        for node in self.descendants() {
            if let VNode::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }

    /// Follow a child-index path from this node.
    ///
    /// ```rust
    /// use cycle_vtree::{h, text, Attributes};
    ///
    /// let tree = h("ul", Attributes::new(), vec![
    ///     h("li", Attributes::new(), vec![text("a")]),
    ///     h("li", Attributes::new(), vec![text("b")]),
    /// ]);
    /// assert_eq!(tree.at(&[1, 0]).and_then(|n| n.as_text()), Some("b"));
    /// assert!(tree.at(&[2]).is_none());
    /// ```
    pub fn at(&self, path: &[usize]) -> Option<&VNode> {
        let mut current = self;
        for &index in path {
            current = current.children().get(index)?;
        }
        Some(current)
    }

    /// Pre-order iterator over all nodes below this one (not including it).
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children().iter().rev().collect(),
        }
    }

    /// Check whether both nodes share the same allocation.
    pub fn ptr_eq(&self, other: &VNode) -> bool {
        match (self, other) {
            (VNode::Element(a), VNode::Element(b)) => Rc::ptr_eq(a, b),
            (VNode::Text(a), VNode::Text(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for VNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (VNode::Element(a), VNode::Element(b)) => Rc::ptr_eq(a, b) || **a == **b,
            (VNode::Text(a), VNode::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Element(el) => el.fmt(f),
            VNode::Text(t) => write!(f, "{:?}", t),
        }
    }
}

impl From<&str> for VNode {
    fn from(s: &str) -> Self {
        text(s)
    }
}

impl From<String> for VNode {
    fn from(s: String) -> Self {
        text(s)
    }
}

impl From<VElement> for VNode {
    fn from(el: VElement) -> Self {
        VNode::Element(Rc::new(el))
    }
}

/// Iterator returned by [`VNode::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a VNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a VNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// Build an element node.
///
/// `tag` accepts the hyperscript shorthand `tag.class#id`; the tag defaults to
/// `div`. Shorthand classes come first in the resulting `class` attribute,
/// followed by `class` and `className` from `attributes`. An explicit `id`
/// attribute wins over a shorthand id.
///
/// # Example
///
/// ```rust
/// use cycle_vtree::{attrs, h, text};
///
/// let item = h("li.item", attrs! { "className" => "done" }, vec![text("milk")]);
/// assert_eq!(item.tag(), Some("li"));
/// assert_eq!(item.attribute("class").and_then(|v| v.as_str()), Some("item done"));
/// assert!(item.attribute("className").is_none());
/// ```
pub fn h(tag: &str, attributes: Attributes, children: impl IntoIterator<Item = VNode>) -> VNode {
    let shorthand = Shorthand::parse(tag);
    let mut attributes = attributes;

    let mut classes = shorthand.classes;
    for key in ["class", "className"] {
        if let Some(value) = attributes.remove(key) {
            if let Some(class) = value.to_attribute_string() {
                classes.extend(class.split_whitespace().map(str::to_string));
            }
        }
    }
    if !classes.is_empty() {
        attributes.insert("class".to_string(), AttrValue::String(classes.join(" ")));
    }

    if let Some(id) = shorthand.id {
        attributes
            .entry("id".to_string())
            .or_insert(AttrValue::String(id));
    }

    VNode::Element(Rc::new(VElement {
        tag: shorthand.tag,
        attributes,
        children: children.into_iter().collect(),
    }))
}

/// Build a text node.
pub fn text(s: impl Into<String>) -> VNode {
    VNode::Text(Rc::from(s.into()))
}

/// Build an [`Attributes`] map.
///
/// ```rust
/// use cycle_vtree::attrs;
///
/// let a = attrs! { "type" => "text", "disabled" => true };
/// assert_eq!(a.len(), 2);
/// assert!(attrs! {}.is_empty());
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attributes::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut attributes = $crate::Attributes::new();
        $(
            attributes.insert(::std::string::String::from($name), $crate::AttrValue::from($value));
        )+
        attributes
    }};
}
