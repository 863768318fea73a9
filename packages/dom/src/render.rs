//! Turning virtual trees into document nodes.

use cycle_vtree::{Patch, VNode};

use crate::document::{Document, Node};
use crate::error::DomError;

/// HTML and SVG element names the driver renders without complaint.
pub(crate) const KNOWN_TAGS: &[&str] = &[
    "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi", "bdo",
    "blockquote", "body", "br", "button", "canvas", "caption", "cite", "code", "col", "colgroup",
    "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt", "em", "embed",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "head", "header", "hgroup", "hr", "html", "i", "iframe", "img", "input", "ins", "kbd", "label",
    "legend", "li", "link", "main", "map", "mark", "menu", "meta", "meter", "nav", "noscript",
    "object", "ol", "optgroup", "option", "output", "p", "param", "picture", "pre", "progress",
    "q", "rp", "rt", "ruby", "s", "samp", "script", "section", "select", "slot", "small",
    "source", "span", "strong", "style", "sub", "summary", "sup", "table", "tbody", "td",
    "template", "textarea", "tfoot", "th", "thead", "time", "title", "tr", "track", "u", "ul",
    "var", "video", "wbr", "svg", "g", "path", "circle", "rect", "line", "polyline", "polygon",
    "text", "defs", "use",
];

pub(crate) fn is_known_tag(tag: &str) -> bool {
    KNOWN_TAGS.contains(&tag)
}

/// Build detached nodes for `vnode`.
pub(crate) fn create_node(document: &Document, vnode: &VNode) -> Result<Node, DomError> {
    match vnode {
        VNode::Text(text) => Ok(document.create_text(text)),
        VNode::Element(el) => {
            let node = document.create_element(&el.tag);
            for (name, value) in &el.attributes {
                if let Some(value) = value.to_attribute_string() {
                    node.set_attribute(name, &value)?;
                }
            }
            for child in &el.children {
                node.append_child(&create_node(document, child)?)?;
            }
            Ok(node)
        }
    }
}

/// Replace everything in `container` with a rendering of `tree`.
pub(crate) fn mount(container: &Node, tree: &VNode) -> Result<(), DomError> {
    container.clear_children()?;
    let root = create_node(container.document(), tree)?;
    container.append_child(&root)
}

/// Apply `patches` in order. The tree root is the container's first child.
pub(crate) fn apply_patches(container: &Node, patches: &[Patch]) -> Result<(), DomError> {
    for patch in patches {
        apply_patch(container, patch)?;
    }
    Ok(())
}

/// The rendered node at a child-index path from the tree root.
pub(crate) fn node_at(container: &Node, path: &[usize]) -> Option<Node> {
    resolve(container, path).ok()
}

fn resolve(container: &Node, path: &[usize]) -> Result<Node, DomError> {
    let missing = || DomError::PatchTarget {
        path: path.to_vec(),
    };
    let mut node = container.child(0).ok_or_else(missing)?;
    for &index in path {
        node = node.child(index).ok_or_else(missing)?;
    }
    Ok(node)
}

fn apply_patch(container: &Node, patch: &Patch) -> Result<(), DomError> {
    let document = container.document();
    match patch {
        Patch::Replace { path, node } => {
            let old = resolve(container, path)?;
            old.replace_with(&create_node(document, node)?)
        }
        Patch::SetText { path, text } => resolve(container, path)?.set_text(text),
        Patch::SetAttribute { path, name, value } => {
            let node = resolve(container, path)?;
            match value.to_attribute_string() {
                Some(value) => node.set_attribute(name, &value),
                None => node.remove_attribute(name),
            }
        }
        Patch::RemoveAttribute { path, name } => resolve(container, path)?.remove_attribute(name),
        Patch::AppendChild { path, node } => {
            resolve(container, path)?.append_child(&create_node(document, node)?)
        }
        Patch::RemoveChild { path, index } => {
            let parent = resolve(container, path)?;
            let child = parent.child(*index).ok_or_else(|| DomError::PatchTarget {
                path: path.iter().copied().chain([*index]).collect(),
            })?;
            child.remove()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cycle_vtree::{attrs, diff, h, text};

    fn container() -> Node {
        let document = Document::new();
        let container = document.create_element("div");
        document.body().append_child(&container).unwrap();
        container
    }

    #[test]
    fn mount_renders_attributes_and_children() {
        let container = container();
        let tree = h(
            "ul.list",
            attrs! { "hidden" => false, "data-n" => 2 },
            vec![h("li", attrs! {}, vec![text("a < b")])],
        );
        mount(&container, &tree).unwrap();
        assert_eq!(
            container.inner_html(),
            r#"<ul class="list" data-n="2"><li>a &lt; b</li></ul>"#
        );
    }

    #[test]
    fn patches_reach_the_same_html_as_a_fresh_mount() {
        let old = h(
            "div",
            attrs! { "id" => "x" },
            vec![
                h("p", attrs! {}, vec![text("one")]),
                h("p", attrs! {}, vec![text("two")]),
                text("tail"),
            ],
        );
        let new = h(
            "div",
            attrs! { "class" => "ready" },
            vec![h("h1", attrs! {}, vec![text("title")]), h("p", attrs! {}, vec![text("2")])],
        );

        let patched = container();
        mount(&patched, &old).unwrap();
        apply_patches(&patched, &diff(&old, &new)).unwrap();

        let fresh = container();
        mount(&fresh, &new).unwrap();
        assert_eq!(patched.inner_html(), fresh.inner_html());
    }

    #[test]
    fn boolean_attribute_false_removes() {
        let container = container();
        let on = h("button", attrs! { "disabled" => true }, vec![]);
        let off = h("button", attrs! { "disabled" => false }, vec![]);
        mount(&container, &on).unwrap();
        assert_eq!(container.inner_html(), "<button disabled></button>");
        apply_patches(&container, &diff(&on, &off)).unwrap();
        assert_eq!(container.inner_html(), "<button></button>");
    }

    #[test]
    fn missing_target_is_reported() {
        let container = container();
        let patches = vec![Patch::SetText {
            path: vec![3],
            text: "x".into(),
        }];
        mount(&container, &h("p", attrs! {}, vec![])).unwrap();
        assert_eq!(
            apply_patches(&container, &patches),
            Err(DomError::PatchTarget { path: vec![3] })
        );
    }

    #[test]
    fn known_tags() {
        assert!(is_known_tag("div"));
        assert!(!is_known_tag("my-widget"));
    }
}
