/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The styled element tree handed to layout.
//!
//! Markup parsing and selector matching happen upstream; the engine sees a
//! flat arena of nodes with first-child/next-sibling links and per-element
//! cascaded declarations already attached. The tree is read-only for the
//! duration of a layout run.

use crate::style::properties::CascadedValues;

/// An opaque node id within a [`NodeTree`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Node(u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeCategory {
    Element,
    Text,
}

#[derive(Debug)]
struct NodeData {
    category: NodeCategory,
    parent: Option<Node>,
    first_child: Option<Node>,
    last_child: Option<Node>,
    next_sibling: Option<Node>,
    cascaded: CascadedValues,
    text: String,
}

/// A rooted tree of element and text nodes.
#[derive(Debug, Default)]
pub struct NodeTree {
    nodes: Vec<NodeData>,
    root: Option<Node>,
}

impl NodeTree {
    pub fn new() -> NodeTree {
        NodeTree::default()
    }

    pub fn root(&self) -> Option<Node> {
        self.root
    }

    /// Appends an element as the last child of `parent`, or installs it as
    /// the root when `parent` is `None`.
    ///
    /// Panics if a second root is created.
    pub fn append_element(&mut self, parent: Option<Node>) -> Node {
        self.append(parent, NodeCategory::Element, String::new())
    }

    /// Appends a text node as the last child of `parent`.
    pub fn append_text(&mut self, parent: Node, text: &str) -> Node {
        self.append(Some(parent), NodeCategory::Text, text.to_owned())
    }

    fn append(&mut self, parent: Option<Node>, category: NodeCategory, text: String) -> Node {
        let node = Node(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            category,
            parent,
            first_child: None,
            last_child: None,
            next_sibling: None,
            cascaded: CascadedValues::default(),
            text,
        });

        match parent {
            None => {
                assert!(self.root.is_none(), "node tree already has a root");
                self.root = Some(node);
            },
            Some(parent) => {
                let data = self.data_mut(parent);
                debug_assert_eq!(data.category, NodeCategory::Element);
                match data.last_child {
                    None => data.first_child = Some(node),
                    Some(last) => self.data_mut(last).next_sibling = Some(node),
                }
                self.data_mut(parent).last_child = Some(node);
            },
        }
        node
    }

    /// Attaches the cascade's output to an element.
    pub fn set_cascaded_values(&mut self, node: Node, values: CascadedValues) {
        debug_assert_eq!(self.category(node), NodeCategory::Element);
        self.data_mut(node).cascaded = values;
    }

    pub fn category(&self, node: Node) -> NodeCategory {
        self.data(node).category
    }

    pub fn text(&self, node: Node) -> &str {
        debug_assert_eq!(self.category(node), NodeCategory::Text);
        &self.data(node).text
    }

    pub fn cascaded_values(&self, node: Node) -> &CascadedValues {
        &self.data(node).cascaded
    }

    pub fn parent(&self, node: Node) -> Option<Node> {
        self.data(node).parent
    }

    pub fn first_child(&self, node: Node) -> Option<Node> {
        self.data(node).first_child
    }

    pub fn next_sibling(&self, node: Node) -> Option<Node> {
        self.data(node).next_sibling
    }

    fn data(&self, node: Node) -> &NodeData {
        &self.nodes[node.0 as usize]
    }

    fn data_mut(&mut self, node: Node) -> &mut NodeData {
        &mut self.nodes[node.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_links() {
        let mut tree = NodeTree::new();
        let root = tree.append_element(None);
        let a = tree.append_element(Some(root));
        let b = tree.append_element(Some(root));
        let text = tree.append_text(b, "hi");

        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.first_child(root), Some(a));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.next_sibling(b), None);
        assert_eq!(tree.first_child(b), Some(text));
        assert_eq!(tree.parent(text), Some(b));
        assert_eq!(tree.category(text), NodeCategory::Text);
        assert_eq!(tree.text(text), "hi");
    }
}
