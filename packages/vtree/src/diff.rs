//! Pure tree diff.

use serde::{Deserialize, Serialize};

use crate::node::{VElement, VNode};
use crate::value::AttrValue;

/// Child-index path from the root of a tree. The empty path is the root.
pub type NodePath = Vec<usize>;

/// One step turning an old tree into a new one.
///
/// Paths are child-index paths into the tree as it stands when the patch is
/// applied, so a patch list must be applied in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Patch {
    /// Replace the node at `path` with a freshly rendered `node`.
    Replace { path: NodePath, node: VNode },
    /// Change the content of the text node at `path`.
    SetText { path: NodePath, text: String },
    /// Set an attribute on the element at `path`.
    SetAttribute {
        path: NodePath,
        name: String,
        value: AttrValue,
    },
    /// Remove an attribute from the element at `path`.
    RemoveAttribute { path: NodePath, name: String },
    /// Append `node` as the last child of the element at `path`.
    AppendChild { path: NodePath, node: VNode },
    /// Remove child `index` of the element at `path`.
    RemoveChild { path: NodePath, index: usize },
}

impl Patch {
    /// The path the patch operates on.
    pub fn path(&self) -> &[usize] {
        match self {
            Patch::Replace { path, .. }
            | Patch::SetText { path, .. }
            | Patch::SetAttribute { path, .. }
            | Patch::RemoveAttribute { path, .. }
            | Patch::AppendChild { path, .. }
            | Patch::RemoveChild { path, .. } => path,
        }
    }
}

/// Compute the patches that turn `old` into `new`.
///
/// Children are matched by position. For each element the patches come in
/// this order: attribute changes, then patches for the children both trees
/// share, then removals of surplus old children from the last one backwards,
/// then appends of new children. That order keeps every path valid while the
/// list is applied front to back.
///
/// Equal trees produce no patches.
///
/// # Example
///
/// ```rust
/// use cycle_vtree::{attrs, diff, h, text, Patch};
///
/// let old = h("p", attrs! {}, vec![text("one")]);
/// let new = h("p", attrs! {}, vec![text("two")]);
/// assert_eq!(
///     diff(&old, &new),
///     vec![Patch::SetText { path: vec![0], text: "two".to_string() }]
/// );
/// assert!(diff(&new, &new.clone()).is_empty());
/// ```
pub fn diff(old: &VNode, new: &VNode) -> Vec<Patch> {
    let mut patches = Vec::new();
    let mut path = Vec::new();
    diff_node(old, new, &mut path, &mut patches);
    patches
}

fn diff_node(old: &VNode, new: &VNode, path: &mut NodePath, patches: &mut Vec<Patch>) {
    if old.ptr_eq(new) {
        return;
    }
    match (old, new) {
        (VNode::Text(a), VNode::Text(b)) => {
            if a != b {
                patches.push(Patch::SetText {
                    path: path.clone(),
                    text: b.to_string(),
                });
            }
        }
        (VNode::Element(a), VNode::Element(b)) if a.tag == b.tag => {
            diff_element(a, b, path, patches);
        }
        _ => patches.push(Patch::Replace {
            path: path.clone(),
            node: new.clone(),
        }),
    }
}

fn diff_element(old: &VElement, new: &VElement, path: &mut NodePath, patches: &mut Vec<Patch>) {
    for (name, value) in &new.attributes {
        if old.attributes.get(name) != Some(value) {
            patches.push(Patch::SetAttribute {
                path: path.clone(),
                name: name.clone(),
                value: value.clone(),
            });
        }
    }
    for name in old.attributes.keys() {
        if !new.attributes.contains_key(name) {
            patches.push(Patch::RemoveAttribute {
                path: path.clone(),
                name: name.clone(),
            });
        }
    }

    let shared = old.children.len().min(new.children.len());
    for (index, (a, b)) in old.children.iter().zip(&new.children).enumerate() {
        path.push(index);
        diff_node(a, b, path, patches);
        path.pop();
    }

    for index in (shared..old.children.len()).rev() {
        patches.push(Patch::RemoveChild {
            path: path.clone(),
            index,
        });
    }
    for node in &new.children[shared..] {
        patches.push(Patch::AppendChild {
            path: path.clone(),
            node: node.clone(),
        });
    }
}

/// Apply patches to a virtual tree.
///
/// Produces the same tree the patched DOM would mirror; useful for checking a
/// patch list without a document.
///
/// Returns `None` when a patch addresses a node that does not exist.
pub fn apply(tree: &VNode, patches: &[Patch]) -> Option<VNode> {
    let mut tree = tree.clone();
    for patch in patches {
        tree = apply_one(&tree, patch.path(), patch)?;
    }
    Some(tree)
}

fn apply_one(node: &VNode, path: &[usize], patch: &Patch) -> Option<VNode> {
    if let Some((&index, rest)) = path.split_first() {
        let el = node.as_element()?;
        let mut el = el.clone();
        let child = el.children.get(index)?;
        el.children[index] = apply_one(child, rest, patch)?;
        return Some(el.into());
    }

    match patch {
        Patch::Replace { node: new, .. } => Some(new.clone()),
        Patch::SetText { text, .. } => node.is_text().then(|| crate::text(text.as_str())),
        Patch::SetAttribute { name, value, .. } => {
            let mut el = node.as_element()?.clone();
            el.attributes.insert(name.clone(), value.clone());
            Some(el.into())
        }
        Patch::RemoveAttribute { name, .. } => {
            let mut el = node.as_element()?.clone();
            el.attributes.remove(name);
            Some(el.into())
        }
        Patch::AppendChild { node: child, .. } => {
            let mut el = node.as_element()?.clone();
            el.children.push(child.clone());
            Some(el.into())
        }
        Patch::RemoveChild { index, .. } => {
            let mut el = node.as_element()?.clone();
            if *index >= el.children.len() {
                return None;
            }
            el.children.remove(*index);
            Some(el.into())
        }
    }
}
