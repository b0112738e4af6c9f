/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Two-phase shrink-to-fit layout for inline-blocks of unknown width.
//!
//! Phase 1 builds a skip-encoded *object tree* instead of real block boxes:
//! auto-width blocks become `FlowStf` objects that accumulate the maximum
//! full width of their children; fixed-width children and inline content are
//! laid out immediately into their own subtrees and recorded as leaves.
//! Phase 2 walks the objects with the chosen widths finally known, producing
//! real block boxes and splicing the pre-built subtrees back in through
//! proxy blocks. Stacking contexts and absolute containing blocks opened in
//! phase 1 are bound to their blocks here, never earlier.

use app_units::Au;
use log::debug;

use crate::LayoutError;
use crate::box_tree::{BlockRef, BlockType, BoxTree, GeneratedBox, IfcId, SubtreeId};
use crate::dom::Node;
use crate::fallible::FallibleVec;
use crate::flow::block::{
    BlockUsedSizes, adjust_width_and_margins, offset_child_blocks, set_block_data,
    solve_used_height,
};
use crate::geom::LayoutSize;
use crate::model;
use crate::positioned::AbsoluteContainingBlocks;
use crate::stacking_context::StackingContextBuilder;

#[derive(Debug)]
pub(crate) enum StfObjectKind {
    /// An auto-width block whose children are objects; realized in phase 2.
    FlowStf {
        used: BlockUsedSizes,
        /// `clamp(auto_width, min, max)`, fixed when the object closes.
        width_clamped: Au,
        stacking_context: Option<crate::box_tree::StackingContextId>,
        absolute_cb: Option<usize>,
    },
    /// A fixed-width subtree that ran normal flow to completion in phase 1.
    FlowNormal { result: BlockRef },
    /// An IFC laid out in phase 1 into its own subtree.
    Ifc {
        subtree: SubtreeId,
        ifc: IfcId,
        min_width: Au,
        height: Au,
    },
}

/// The flat, skip-encoded object tree of one shrink-to-fit run.
#[derive(Debug, Default)]
pub(crate) struct StfObjects {
    pub skip: Vec<usize>,
    pub kind: Vec<StfObjectKind>,
    pub node: Vec<Option<Node>>,
}

impl StfObjects {
    pub fn push(
        &mut self,
        node: Option<Node>,
        kind: StfObjectKind,
    ) -> Result<usize, LayoutError> {
        let index = self.skip.len();
        self.skip.try_push(1)?;
        self.kind.try_push(kind)?;
        self.node.try_push(node)?;
        Ok(index)
    }

    /// Closes a `FlowStf` object: fixes its skip and clamps the accumulated
    /// auto width. Returns the object's full margin-box width, the parent's
    /// contribution.
    pub fn close_flow_stf(&mut self, index: usize, auto_width: Au) -> Au {
        self.skip[index] = self.skip.len() - index;
        match &mut self.kind[index] {
            StfObjectKind::FlowStf {
                used,
                width_clamped,
                ..
            } => {
                *width_clamped =
                    model::clamp_size(auto_width, used.min_inline_size, used.max_inline_size);
                *width_clamped + used.inline_edges() + used.margin.horizontal()
            },
            _ => unreachable!("closed a leaf shrink-to-fit object"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.skip.is_empty()
    }
}

/// Splices a pre-built subtree into `target` behind a proxy block that
/// mirrors the root's geometry, so the enclosing flow can stack it.
fn push_proxy(
    tree: &mut BoxTree,
    target: SubtreeId,
    proxied: SubtreeId,
) -> Result<usize, LayoutError> {
    let (offsets, borders, margins, insets) = {
        let subtree = tree.subtree(proxied);
        (
            *subtree.box_offsets(0),
            *subtree.borders(0),
            *subtree.margins(0),
            subtree.insets(0),
        )
    };

    let target_subtree = tree.subtree_mut(target);
    let index = target_subtree.push_block(None)?;
    target_subtree.block_type[index] = BlockType::SubtreeProxy(proxied);
    target_subtree.box_offsets[index] = offsets;
    target_subtree.borders[index] = borders;
    target_subtree.margins[index] = margins;
    target_subtree.insets[index] = insets;

    tree.subtree_mut(proxied).parent = Some(BlockRef {
        subtree: target,
        index,
    });
    Ok(index)
}

struct RealizeFrame {
    end: usize,
    next_child: usize,
    block: usize,
    used: BlockUsedSizes,
}

/// Phase 2: produces real block boxes in `target` from the object tree.
/// Returns the root block of the realized inline-block.
pub(crate) fn realize(
    objects: &StfObjects,
    tree: &mut BoxTree,
    sc: &mut StackingContextBuilder,
    acb: &mut AbsoluteContainingBlocks,
    target: SubtreeId,
    containing_block_width: Au,
) -> Result<BlockRef, LayoutError> {
    debug_assert!(!objects.is_empty());
    debug!(
        "realizing {} shrink-to-fit objects into {:?}",
        objects.skip.len(),
        target
    );

    let mut stack: Vec<RealizeFrame> = Vec::new();
    let root_frame =
        begin_flow_stf(objects, tree, sc, acb, target, 0, containing_block_width, true)?;
    stack.push(root_frame);
    let root_index = stack[0].block;

    loop {
        let (child, end, parent_width) = match stack.last() {
            Some(frame) => (frame.next_child, frame.end, frame.used.inline_size),
            None => break,
        };

        if child < end {
            stack.last_mut().unwrap().next_child = child + objects.skip[child];
            match &objects.kind[child] {
                StfObjectKind::FlowStf { .. } => {
                    let new_frame =
                        begin_flow_stf(objects, tree, sc, acb, target, child, parent_width, false)?;
                    stack.push(new_frame);
                },
                StfObjectKind::FlowNormal { result } => {
                    push_proxy(tree, target, result.subtree)?;
                },
                StfObjectKind::Ifc {
                    subtree,
                    ifc,
                    height,
                    ..
                } => {
                    let content_size = LayoutSize::new(parent_width, *height);
                    let container = tree.subtree_mut(*subtree);
                    container.box_offsets[0].border_size = content_size;
                    container.box_offsets[0].content_size = content_size;
                    tree.ifc_mut(*ifc).parent_block = Some(BlockRef {
                        subtree: *subtree,
                        index: 0,
                    });
                    push_proxy(tree, target, *subtree)?;
                },
            }
        } else {
            let frame = stack.pop().unwrap();
            let subtree = tree.subtree_mut(target);
            subtree.skip[frame.block] = subtree.len() - frame.block;
            let auto_height = offset_child_blocks(subtree, frame.block);
            let height = solve_used_height(&frame.used, auto_height);
            set_block_data(
                subtree,
                frame.block,
                &frame.used,
                LayoutSize::new(frame.used.inline_size, height),
            );
        }
    }

    Ok(BlockRef {
        subtree: target,
        index: root_index,
    })
}

fn begin_flow_stf(
    objects: &StfObjects,
    tree: &mut BoxTree,
    sc: &mut StackingContextBuilder,
    acb: &mut AbsoluteContainingBlocks,
    target: SubtreeId,
    object: usize,
    containing_block_width: Au,
    is_root: bool,
) -> Result<RealizeFrame, LayoutError> {
    let (used, width_clamped, stacking_context, absolute_cb) = match &objects.kind[object] {
        StfObjectKind::FlowStf {
            used,
            width_clamped,
            stacking_context,
            absolute_cb,
        } => (used.clone(), *width_clamped, *stacking_context, *absolute_cb),
        _ => unreachable!("shrink-to-fit realization began at a leaf"),
    };

    let mut used = used;
    if is_root {
        // The inline-block itself takes the probed shrink-to-fit width;
        // margin solving sees no slack, so auto margins become zero
        // (CSS 2.2 §10.3.9).
        used.set_inline_size(width_clamped);
        let margin_box_inline_size = used.margin_box_inline_size();
        adjust_width_and_margins(&mut used, margin_box_inline_size);
    } else {
        // Nested auto-width blocks are ordinary block-level boxes again now
        // that the parent width is known: width fills per CSS 2.2 §10.3.3.
        adjust_width_and_margins(&mut used, containing_block_width);
    }

    let node = objects.node[object];
    let subtree = tree.subtree_mut(target);
    let index = subtree.push_block(node)?;
    subtree.stacking_context[index] = stacking_context;

    let block_ref = BlockRef {
        subtree: target,
        index,
    };
    if let Some(node) = node {
        tree.set_generated_box(node, GeneratedBox::Block(block_ref))?;
    }
    if let Some(id) = stacking_context {
        sc.set_block(id, block_ref);
    }
    if let Some(entry) = absolute_cb {
        acb.set_block(entry, block_ref);
    }

    Ok(RealizeFrame {
        end: object + objects.skip[object],
        next_child: object + 1,
        block: index,
        used,
    })
}
