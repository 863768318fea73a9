//! Virtual DOM trees
//!
//! Immutable descriptions of a DOM subtree and a pure diff between two of
//! them:
//! - `VNode`: element or text node, cheap to clone, serializable
//! - `h` / `text` / `attrs!`: hyperscript-style builders
//! - `diff`: ordered `Patch` list turning one tree into another
//!
//! Nothing here touches a document; `cycle-dom` applies patches to a live one.
//!
//! # Example
//!
//! ```rust
//! use cycle_vtree::{attrs, diff, h, text};
//!
//! let view = |n: i64| h("div#counter", attrs! {}, vec![
//!     h("button.inc", attrs! {}, vec![text("+")]),
//!     h("span.count", attrs! { "data-count" => n }, vec![text(n.to_string())]),
//! ]);
//!
//! assert_eq!(diff(&view(1), &view(2)).len(), 2);
//! assert!(diff(&view(1), &view(1)).is_empty());
//! ```

mod diff;
mod node;
mod shorthand;
mod value;

pub use diff::{apply, diff, NodePath, Patch};
pub use node::{h, text, Attributes, Descendants, VElement, VNode};
pub use shorthand::Shorthand;
pub use value::AttrValue;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn tree() -> impl Strategy<Value = VNode> {
        let leaf = prop_oneof![
            "[a-c]{0,2}".prop_map(text),
            ("[a-c]", proptest::option::of(0i64..3)).prop_map(|(tag, n)| {
                let attributes = match n {
                    Some(n) => attrs! { "data-n" => n },
                    None => attrs! {},
                };
                h(&tag, attributes, vec![])
            }),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            ("[a-c]", proptest::collection::vec(inner, 0..4))
                .prop_map(|(tag, children)| h(&tag, attrs! {}, children))
        })
    }

    proptest! {
        /// Applying `diff(a, b)` to `a` yields `b`
        #[test]
        fn prop_diff_apply(a in tree(), b in tree()) {
            let patches = diff(&a, &b);
            prop_assert_eq!(apply(&a, &patches), Some(b));
        }

        /// A tree diffed against an equal copy needs no patches
        #[test]
        fn prop_equal_trees_no_patches(a in tree()) {
            let copy: VNode = serde_json::from_str(&serde_json::to_string(&a).unwrap()).unwrap();
            prop_assert!(diff(&a, &copy).is_empty());
        }
    }
}
