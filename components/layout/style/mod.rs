/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The style computer: cascaded values in, computed values out.
//!
//! The computer is consulted twice per element tree, once per [`Stage`]
//! (box generation, then cosmetics). For the current element it resolves a
//! group's specified value from the cascaded record, the `all` shorthand,
//! and the parent's computed values; the caller stores the final computed
//! value back so children can inherit it.

pub mod properties;

use rustc_hash::FxHashMap;

use crate::LayoutError;
use crate::dom::{Node, NodeTree};
use properties::{CssWideKeyword, Fallback, FieldResolver, PropertyGroup, Stage, StageGroup};

// Resolution order per CSS Cascading Level 4: a declared field wins; `all`
// (when declared) supplies the fallback for undeclared fields; otherwise the
// group's inheritance class decides between the initial value and the
// parent's computed value.
fn default_fallback<G: PropertyGroup>(all: Option<CssWideKeyword>) -> Fallback {
    match all {
        Some(CssWideKeyword::Initial) => Fallback::Initial,
        Some(CssWideKeyword::Inherit) => Fallback::Inherit,
        Some(CssWideKeyword::Unset) | None => {
            if G::INHERITED {
                Fallback::Inherit
            } else {
                Fallback::Initial
            }
        },
    }
}

struct CurrentNode<S: Stage> {
    node: Node,
    styles: S::Styles,
}

/// Per-stage computed-value resolution and caching for one layout run.
pub struct StyleComputer<'dom, S: Stage> {
    tree: &'dom NodeTree,
    cache: FxHashMap<Node, S::Styles>,
    current: Option<CurrentNode<S>>,
}

impl<'dom, S: Stage> StyleComputer<'dom, S> {
    pub fn new(tree: &'dom NodeTree) -> StyleComputer<'dom, S> {
        StyleComputer {
            tree,
            cache: FxHashMap::default(),
            current: None,
        }
    }

    /// Makes `node`'s cascaded values the current source, lazily initializing
    /// its computed-value slots.
    pub fn set_current_node(&mut self, node: Node) -> Result<(), LayoutError> {
        debug_assert!(
            self.current.is_none(),
            "previous node was neither committed nor abandoned"
        );
        self.cache
            .try_reserve(1)
            .map_err(|_| LayoutError::OutOfMemory)?;
        let styles = self.cache.get(&node).cloned().unwrap_or_default();
        self.current = Some(CurrentNode { node, styles });
        Ok(())
    }

    /// Resolves the specified value of group `G` for the current element.
    pub fn specified_value<G: StageGroup<S>>(&mut self) -> G {
        let node = self.current.as_ref().expect("no current node").node;
        self.resolve_at::<G>(node)
    }

    /// Stores the computed value of group `G` for the current element.
    ///
    /// Panics if the slot was already filled; each group is computed at most
    /// once per element and stage.
    pub fn set_computed_value<G: StageGroup<S>>(&mut self, value: G) {
        let current = self.current.as_mut().expect("no current node");
        let slot = G::slot(&mut current.styles);
        assert!(slot.is_none(), "computed value set twice for one element");
        *slot = Some(value);
    }

    /// Writes the current element's slots back so its children can inherit
    /// from them.
    pub fn commit_node(&mut self) -> Result<(), LayoutError> {
        let current = self.current.take().expect("no current node");
        self.cache
            .try_reserve(1)
            .map_err(|_| LayoutError::OutOfMemory)?;
        self.cache.insert(current.node, current.styles);
        Ok(())
    }

    /// Drops the current element without publishing its slots.
    pub fn abandon_node(&mut self) {
        self.current = None;
    }

    /// The computed value of `G` at `node`, synthesizing (and memoizing) it
    /// from the cascaded values if no pass has computed it yet.
    pub fn computed_for<G: StageGroup<S>>(&mut self, node: Node) -> G {
        if let Some(styles) = self.cache.get(&node) {
            if let Some(value) = G::get(styles) {
                return value.clone();
            }
        }

        let value = self.resolve_at::<G>(node);
        let styles = self.cache.entry(node).or_default();
        let slot = G::slot(styles);
        if slot.is_none() {
            *slot = Some(value.clone());
        }
        value
    }

    fn resolve_at<G: StageGroup<S>>(&mut self, node: Node) -> G {
        let tree = self.tree;
        let values = tree.cascaded_values(node);
        let fallback = default_fallback::<G>(values.all);
        let initial = G::initial();

        // The root inherits from the initial values.
        let parent = match tree.parent(node) {
            Some(parent) => self.computed_for::<G>(parent),
            None => initial.clone(),
        };

        match G::cascaded(values) {
            None => match fallback {
                Fallback::Initial => initial,
                Fallback::Inherit => parent,
            },
            Some(cascaded) => {
                let resolver = FieldResolver {
                    parent: &parent,
                    initial: &initial,
                    fallback,
                };
                G::resolve(cascaded, &resolver)
            },
        }
    }
}
