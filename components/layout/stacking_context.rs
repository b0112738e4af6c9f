/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Building the stacking-context tree.
//!
//! Contexts open and close in document order, but siblings are stored in
//! non-decreasing `z-index` order, so each new record is inserted mid-array
//! at its sorted position among the current parent's children. Only
//! *parentable* contexts (integer `z-index`) can receive children;
//! non-parentable ones (`z-index: auto`) are single records attached to the
//! nearest parentable ancestor. Shrink-to-fit layout opens contexts before
//! their block boxes exist and binds them later through [`set_block`];
//! the debug-only `incompletes` set catches a forgotten binding.
//!
//! [`set_block`]: StackingContextBuilder::set_block

use log::debug;
#[cfg(debug_assertions)]
use rustc_hash::FxHashSet;

use crate::LayoutError;
use crate::box_tree::{BlockRef, IfcId, StackingContextId, StackingContextTree};
use crate::fallible::FallibleVec;

/// What kind of stacking context an element generates, if any.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum StackingContextKind {
    /// No stacking context; `push`/`pop` still pair up.
    None,
    /// A stacking context that can receive descendant contexts.
    Parentable(i32),
    /// A single record that must not receive children (`z-index: auto`).
    NonParentable(i32),
}

struct OpenContext {
    /// Position of this context's record in the tree arrays. Stable while
    /// open: insertions only happen below the innermost parentable, which
    /// sits at a strictly greater index than every open ancestor.
    index: usize,
    parentable: bool,
    /// Balances `push(None)` calls so `pop` stays symmetric.
    num_nones: usize,
}

pub(crate) struct StackingContextBuilder {
    tree: StackingContextTree,
    contexts: Vec<OpenContext>,
    parentables: Vec<usize>,
    next_id: usize,
    #[cfg(debug_assertions)]
    incompletes: FxHashSet<StackingContextId>,
}

impl StackingContextBuilder {
    pub fn new() -> StackingContextBuilder {
        StackingContextBuilder {
            tree: StackingContextTree::default(),
            contexts: Vec::new(),
            parentables: Vec::new(),
            next_id: 0,
            #[cfg(debug_assertions)]
            incompletes: FxHashSet::default(),
        }
    }

    /// Creates the root context. The tree must be empty.
    pub fn push_initial(&mut self, block: BlockRef) -> Result<StackingContextId, LayoutError> {
        assert!(self.tree.is_empty(), "stacking-context tree already rooted");
        let id = self.fresh_id()?;
        self.tree.skip.try_push(1)?;
        self.tree.id.try_push(id)?;
        self.tree.z_index.try_push(0)?;
        self.tree.block.try_push(Some(block))?;
        self.tree.ifcs.try_push(Vec::new())?;
        self.contexts.try_push(OpenContext {
            index: 0,
            parentable: true,
            num_nones: 0,
        })?;
        self.parentables.try_push(0)?;
        Ok(id)
    }

    /// Opens a context for an element whose block box already exists.
    pub fn push(
        &mut self,
        kind: StackingContextKind,
        block: BlockRef,
    ) -> Result<Option<StackingContextId>, LayoutError> {
        self.push_impl(kind, Some(block))
    }

    /// Opens a context before its block box exists; the caller must
    /// [`set_block`](Self::set_block) it before the owning scope closes.
    pub fn push_without_block(
        &mut self,
        kind: StackingContextKind,
    ) -> Result<Option<StackingContextId>, LayoutError> {
        let id = self.push_impl(kind, None)?;
        #[cfg(debug_assertions)]
        if let Some(id) = id {
            self.incompletes.insert(id);
        }
        Ok(id)
    }

    fn push_impl(
        &mut self,
        kind: StackingContextKind,
        block: Option<BlockRef>,
    ) -> Result<Option<StackingContextId>, LayoutError> {
        let (z_index, parentable) = match kind {
            StackingContextKind::None => {
                self.contexts
                    .last_mut()
                    .expect("push with no open context")
                    .num_nones += 1;
                return Ok(None);
            },
            StackingContextKind::Parentable(z) => (z, true),
            StackingContextKind::NonParentable(z) => (z, false),
        };

        let parent = *self.parentables.last().expect("push with no open context");

        // Keep siblings in non-decreasing z order; ties go after, preserving
        // insertion order.
        let mut index = parent + 1;
        let end = parent + self.tree.skip[parent];
        while index < end && self.tree.z_index[index] <= z_index {
            index += self.tree.skip[index];
        }

        let id = self.fresh_id()?;
        debug!(
            "stacking context {:?} (z {}) inserted at {} under {}",
            id, z_index, index, parent
        );
        self.tree.skip.try_insert(index, 1)?;
        self.tree.id.try_insert(index, id)?;
        self.tree.z_index.try_insert(index, z_index)?;
        self.tree.block.try_insert(index, block)?;
        self.tree.ifcs.try_insert(index, Vec::new())?;

        // Open non-parentable siblings can sit at or after the insertion
        // point; their recorded positions shift right with the arrays.
        for open in &mut self.contexts {
            if open.index >= index {
                open.index += 1;
            }
        }
        for open in &mut self.parentables {
            if *open >= index {
                *open += 1;
            }
        }

        if parentable {
            self.parentables.try_push(index)?;
        } else {
            // The record stays a child of `parent` and can never grow.
            self.tree.skip[parent] += 1;
        }
        self.contexts.try_push(OpenContext {
            index,
            parentable,
            num_nones: 0,
        })?;
        Ok(Some(id))
    }

    pub fn pop(&mut self) {
        let top = self.contexts.last_mut().expect("pop with no open context");
        if top.num_nones > 0 {
            top.num_nones -= 1;
            return;
        }

        let frame = self.contexts.pop().expect("pop with no open context");
        assert_eq!(frame.num_nones, 0);
        if frame.parentable {
            let popped = self.parentables.pop();
            debug_assert_eq!(popped, Some(frame.index));
            let parent = *self
                .parentables
                .last()
                .expect("the root context is popped with pop_initial");
            // Its subtree is final; account for it in the parent's range.
            self.tree.skip[parent] += self.tree.skip[frame.index];
        }
    }

    /// Binds a block box to a context created with `push_without_block`.
    pub fn set_block(&mut self, id: StackingContextId, block: BlockRef) {
        let index = self
            .tree
            .id
            .iter()
            .position(|&candidate| candidate == id)
            .expect("unknown stacking context id");
        debug_assert!(self.tree.block[index].is_none());
        self.tree.block[index] = Some(block);
        #[cfg(debug_assertions)]
        self.incompletes.remove(&id);
    }

    /// Attaches an IFC to the innermost open context.
    pub fn add_ifc(&mut self, ifc: IfcId) -> Result<(), LayoutError> {
        let top = self.contexts.last().expect("add_ifc with no open context");
        self.tree.ifcs[top.index].try_push(ifc)
    }

    /// Closes the root context and hands back the finished tree.
    pub fn pop_initial(&mut self) -> StackingContextTree {
        assert_eq!(self.contexts.len(), 1, "unbalanced stacking-context pushes");
        let root = self.contexts.pop().unwrap();
        assert_eq!(root.num_nones, 0);
        assert_eq!(root.index, 0);
        assert_eq!(self.parentables, [0]);
        self.parentables.clear();
        debug_assert_eq!(self.tree.skip[0], self.tree.len());
        #[cfg(debug_assertions)]
        assert!(
            self.incompletes.is_empty(),
            "stacking contexts left without a block binding: {:?}",
            self.incompletes
        );
        std::mem::take(&mut self.tree)
    }

    fn fresh_id(&mut self) -> Result<StackingContextId, LayoutError> {
        let id = StackingContextId::from_len(self.next_id)?;
        self.next_id += 1;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::box_tree::SubtreeId;

    fn block(index: usize) -> BlockRef {
        BlockRef {
            subtree: SubtreeId(0),
            index,
        }
    }

    #[test]
    fn children_are_sorted_by_z_index() {
        let mut builder = StackingContextBuilder::new();
        builder.push_initial(block(0)).unwrap();
        for (i, z) in [2, 1, -3].into_iter().enumerate() {
            builder
                .push(StackingContextKind::Parentable(z), block(i + 1))
                .unwrap();
            builder.pop();
        }
        let tree = builder.pop_initial();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.z_index(0), 0);
        let children: Vec<i32> = tree.children(0).map(|c| tree.z_index(c)).collect();
        assert_eq!(children, vec![-3, 1, 2]);
        assert_eq!(tree.skip(0), 4);
    }

    #[test]
    fn nones_balance_pops() {
        let mut builder = StackingContextBuilder::new();
        builder.push_initial(block(0)).unwrap();
        assert_eq!(
            builder.push(StackingContextKind::None, block(1)).unwrap(),
            None
        );
        builder
            .push(StackingContextKind::Parentable(0), block(2))
            .unwrap();
        builder.pop(); // the parentable
        builder.pop(); // the none
        let tree = builder.pop_initial();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn non_parentable_nests_under_nearest_parentable() {
        let mut builder = StackingContextBuilder::new();
        builder.push_initial(block(0)).unwrap();
        builder
            .push(StackingContextKind::NonParentable(0), block(1))
            .unwrap();
        // Opened while the auto context is on top; must become a child of
        // the root, not of the auto context.
        builder
            .push(StackingContextKind::Parentable(5), block(2))
            .unwrap();
        builder.pop();
        builder.pop();
        let tree = builder.pop_initial();

        let children: Vec<usize> = tree.children(0).collect();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|&c| tree.skip(c) == 1));
    }

    #[test]
    fn open_context_indices_survive_sibling_insertion() {
        let mut builder = StackingContextBuilder::new();
        builder.push_initial(block(0)).unwrap();
        builder
            .push(StackingContextKind::NonParentable(5), block(1))
            .unwrap();
        // Inserted before the open auto context (z -1 < 5), shifting it.
        builder
            .push(StackingContextKind::Parentable(-1), block(2))
            .unwrap();
        builder.pop();
        // The auto context is on top again; the IFC must land on it.
        builder.add_ifc(IfcId(9)).unwrap();
        builder.pop();
        let tree = builder.pop_initial();

        let auto = (0..tree.len())
            .find(|&i| tree.z_index(i) == 5)
            .expect("auto context missing");
        assert_eq!(tree.ifcs(auto), &[IfcId(9)][..]);
        assert_eq!(tree.block(auto), block(1));
    }

    #[test]
    fn late_binding() {
        let mut builder = StackingContextBuilder::new();
        builder.push_initial(block(0)).unwrap();
        let id = builder
            .push_without_block(StackingContextKind::Parentable(1))
            .unwrap()
            .unwrap();
        builder.pop();
        builder.set_block(id, block(9));
        let tree = builder.pop_initial();
        let child = tree.children(0).next().unwrap();
        assert_eq!(tree.block(child), block(9));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "without a block binding")]
    fn forgotten_binding_is_caught() {
        let mut builder = StackingContextBuilder::new();
        builder.push_initial(block(0)).unwrap();
        builder
            .push_without_block(StackingContextKind::NonParentable(0))
            .unwrap();
        builder.pop();
        let _ = builder.pop_initial();
    }
}
