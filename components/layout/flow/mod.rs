/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The layout dispatcher: a state machine over an explicit mode stack.
//!
//! The element traversal is an explicit cursor (a stack of "next node at
//! this depth" entries) rather than recursion, so stack depth scales with
//! tree depth alone and errors unwind predictably. Each mode (normal flow,
//! inline, shrink-to-fit) keeps its own frame stack; a mode that exhausts
//! its frames pops itself and hands its result to the parent mode.

pub(crate) mod block;
pub(crate) mod inline;
pub(crate) mod shrink_to_fit;

use app_units::Au;
use fonts::{FontHandle, FontStore};
use log::{debug, warn};
use smallvec::SmallVec;

use crate::LayoutError;
use crate::box_tree::{
    BlockRef, BlockType, BoxOffsets, BoxTree, GeneratedBox, InlineBoxEdge, InlineMargins,
    SubtreeId,
};
use crate::dom::{Node, NodeCategory, NodeTree};
use crate::fallible::FallibleVec;
use crate::geom::{LayoutSize, zero_point};
use crate::model;
use crate::model::{InlineInner, UsedDisplay};
use crate::positioned::AbsoluteContainingBlocks;
use crate::stacking_context::StackingContextBuilder;
use crate::style::StyleComputer;
use crate::style::properties::{
    BorderStyles, BoxGen, BoxStyle, Font, FontSelection, HorizontalEdges, Position, PropertyGroup,
    VerticalEdges, ZIndex,
};
use block::{
    BlockUsedSizes, ContainingBlockSize, adjust_width_and_margins, offset_child_blocks,
    set_block_data, solve_all_sizes, solve_stacking_context, solve_used_height,
};
use inline::IfcBuilder;
use shrink_to_fit::{StfObjectKind, StfObjects, realize};

/// Percentages inside an auto-width (shrink-to-fit) ancestor have no base.
fn stf_containing_block() -> ContainingBlockSize {
    ContainingBlockSize {
        inline: Au(0),
        block: None,
    }
}

struct FlowFrame {
    block: usize,
    used: BlockUsedSizes,
    positioned: bool,
}

/// One flow-mode entry. What the finished flow means (the root element's
/// flow, an in-place inline-block, or a shrink-to-fit `FlowNormal` child)
/// is determined by the mode below it on the stack.
struct FlowMode {
    blocks: Vec<FlowFrame>,
}

enum InlineTarget {
    /// The IFC fills an anonymous container block in the enclosing flow.
    FlowContainer { container: usize },
    /// The IFC lives in its own subtree and becomes an `Ifc` object of the
    /// enclosing shrink-to-fit run.
    Stf,
}

struct InlineMode {
    builder: IfcBuilder,
    target: InlineTarget,
    max_line_length: Au,
    /// The containing block of the IFC, used by inline-block children.
    cb: ContainingBlockSize,
}

struct StfFrame {
    object: usize,
    auto_width: Au,
    positioned: bool,
}

struct StfMode {
    objects: StfObjects,
    frames: Vec<StfFrame>,
    /// The shrink-to-fit root's containing block (phase-2 margin solving).
    cb: ContainingBlockSize,
}

enum Mode {
    Flow(FlowMode),
    Inline(InlineMode),
    Stf(StfMode),
}

/// One layout run's worth of state.
pub(crate) struct BoxGenerator<'dom, 'a> {
    tree: &'dom NodeTree,
    fonts: &'a FontStore,
    viewport: LayoutSize,
    styles: StyleComputer<'dom, BoxGen>,
    boxes: BoxTree,
    sc: StackingContextBuilder,
    acb: AbsoluteContainingBlocks,
    modes: Vec<Mode>,
    subtree_stack: SmallVec<[SubtreeId; 4]>,
    cb_stack: SmallVec<[ContainingBlockSize; 16]>,
    node_stack: SmallVec<[Option<Node>; 32]>,
}

impl<'dom, 'a> BoxGenerator<'dom, 'a> {
    pub fn new(
        tree: &'dom NodeTree,
        fonts: &'a FontStore,
        viewport: LayoutSize,
    ) -> BoxGenerator<'dom, 'a> {
        BoxGenerator {
            tree,
            fonts,
            viewport,
            styles: StyleComputer::new(tree),
            boxes: BoxTree::new(),
            sc: StackingContextBuilder::new(),
            acb: AbsoluteContainingBlocks::default(),
            modes: Vec::new(),
            subtree_stack: SmallVec::new(),
            cb_stack: SmallVec::new(),
            node_stack: SmallVec::new(),
        }
    }

    /// Runs box generation for the whole tree and returns the geometric
    /// (pre-cosmetic) box tree.
    pub fn run(mut self) -> Result<BoxTree, LayoutError> {
        // The initial mode: one subtree holding the viewport-sized initial
        // containing block, registered as the stacking-context root.
        let subtree = self.boxes.push_subtree(None)?;
        self.subtree_stack.try_push(subtree)?;
        let icb_index = self.boxes.subtree_mut(subtree).push_block(None)?;
        debug_assert_eq!(icb_index, 0);
        let icb = BlockRef {
            subtree,
            index: icb_index,
        };
        self.boxes.initial_containing_block = icb;
        {
            let s = self.boxes.subtree_mut(subtree);
            s.box_offsets[0] = BoxOffsets {
                border_pos: zero_point(),
                border_size: self.viewport,
                content_pos: zero_point(),
                content_size: self.viewport,
            };
        }
        let root_context = self.sc.push_initial(icb)?;
        self.boxes.subtree_mut(subtree).stacking_context[0] = Some(root_context);
        self.cb_stack.try_push(ContainingBlockSize {
            inline: self.viewport.width,
            block: Some(self.viewport.height),
        })?;

        if let Some(root) = self.tree.root() {
            self.node_stack.try_push(Some(root))?;
            while let Some(&top) = self.node_stack.last() {
                match top {
                    Some(node) => self.dispatch_node(node)?,
                    None => self.null_node()?,
                }
            }
        }

        assert!(self.modes.is_empty(), "modes left open after traversal");
        {
            let s = self.boxes.subtree_mut(subtree);
            s.skip[0] = s.len();
            offset_child_blocks(s, 0);
        }
        self.boxes.stacking_contexts = self.sc.pop_initial();
        debug_assert!(self.acb.is_empty());
        #[cfg(debug_assertions)]
        debug_assert!(self.acb.fully_bound());

        Ok(self.boxes)
    }

    // -- traversal cursor ---------------------------------------------------

    fn descend(&mut self, node: Node) -> Result<(), LayoutError> {
        self.node_stack.try_push(self.tree.first_child(node))
    }

    fn advance(&mut self) {
        let top = self.node_stack.last_mut().expect("cursor underflow");
        match *top {
            Some(node) => *top = self.tree.next_sibling(node),
            None => unreachable!("advanced past end of siblings"),
        }
    }

    fn current_subtree(&self) -> SubtreeId {
        *self.subtree_stack.last().expect("no active subtree")
    }

    fn containing_block(&self) -> ContainingBlockSize {
        *self.cb_stack.last().expect("no containing block")
    }

    // -- per-node dispatch --------------------------------------------------

    fn dispatch_node(&mut self, node: Node) -> Result<(), LayoutError> {
        match self.tree.category(node) {
            NodeCategory::Text => self.text_node(node),
            NodeCategory::Element => {
                self.styles.set_current_node(node)?;
                let specified: BoxStyle = self.styles.specified_value();
                self.styles.set_computed_value(specified.clone());
                let is_root = self.tree.parent(node).is_none();
                let used_style = model::box_style(&specified, is_root);
                debug!("dispatch {:?}: {:?}", node, used_style);

                match used_style.display {
                    UsedDisplay::None => {
                        self.styles.commit_node()?;
                        self.advance();
                        Ok(())
                    },
                    UsedDisplay::Block(_) => self.block_element(node, used_style.position),
                    UsedDisplay::Inline(InlineInner::Inline) => {
                        if !self.ensure_inline_open(node)? {
                            self.styles.commit_node()?;
                            self.advance();
                            return Ok(());
                        }
                        self.inline_element(node)
                    },
                    UsedDisplay::Inline(InlineInner::Block(_)) => {
                        if !self.ensure_inline_open(node)? {
                            self.styles.commit_node()?;
                            self.advance();
                            return Ok(());
                        }
                        self.inline_block_element(node, used_style.position)
                    },
                    UsedDisplay::Absolute(_) => {
                        panic!("position: absolute/fixed layout is not implemented")
                    },
                }
            },
        }
    }

    fn text_node(&mut self, node: Node) -> Result<(), LayoutError> {
        if !self.ensure_inline_open(node)? {
            self.advance();
            return Ok(());
        }
        let boxes = &mut self.boxes;
        let Some(Mode::Inline(inline)) = self.modes.last_mut() else {
            unreachable!("IFC not open for text")
        };
        inline.builder.add_text(boxes, self.fonts, self.tree.text(node))?;
        let ifc = inline.builder.ifc;
        boxes.set_generated_box(node, GeneratedBox::Text(ifc))?;
        self.advance();
        Ok(())
    }

    fn block_element(&mut self, node: Node, position: Position) -> Result<(), LayoutError> {
        match self.modes.last() {
            None => {
                // Initial mode: the root block element opens normal flow.
                self.modes.try_push(Mode::Flow(FlowMode {
                    blocks: Vec::new(),
                }))?;
                self.flow_block_element(node, position)
            },
            Some(Mode::Flow(_)) => self.flow_block_element(node, position),
            Some(Mode::Stf(_)) => self.stf_block_element(node, position),
            Some(Mode::Inline(inline)) => {
                // Block-in-inline splitting is not implemented; only a
                // block-level *sibling* may end the IFC. The element is
                // re-dispatched under the enclosing mode.
                assert!(
                    inline.builder.open_box_count() == 1,
                    "block box inside an inline box is not supported"
                );
                self.styles.abandon_node();
                self.close_inline_mode()
            },
        }
    }

    fn flow_block_element(&mut self, node: Node, position: Position) -> Result<(), LayoutError> {
        let cb = self.containing_block();
        let mut used = solve_all_sizes(&mut self.styles, position, &cb);
        adjust_width_and_margins(&mut used, cb.inline);
        self.push_flow_frame(node, used, position)
    }

    /// Opens a block frame in the (already top) flow mode: block box,
    /// stacking context, containing block, and descends into the children.
    fn push_flow_frame(
        &mut self,
        node: Node,
        used: BlockUsedSizes,
        position: Position,
    ) -> Result<(), LayoutError> {
        let z: ZIndex = self.styles.specified_value();
        self.styles.set_computed_value(z.clone());
        let kind = solve_stacking_context(position, &z);

        let subtree_id = self.current_subtree();
        let index = self.boxes.subtree_mut(subtree_id).push_block(Some(node))?;
        let block_ref = BlockRef {
            subtree: subtree_id,
            index,
        };
        self.boxes
            .set_generated_box(node, GeneratedBox::Block(block_ref))?;
        if let Some(id) = self.sc.push(kind, block_ref)? {
            self.boxes.subtree_mut(subtree_id).stacking_context[index] = Some(id);
        }
        let positioned = position == Position::Relative;
        if positioned {
            self.acb.push(block_ref)?;
        }
        self.styles.commit_node()?;

        let child_cb = ContainingBlockSize {
            inline: used.inline_size,
            block: used.block_size().non_auto().map(|height| {
                model::clamp_size(height, used.min_block_size, used.max_block_size)
            }),
        };
        self.cb_stack.try_push(child_cb)?;

        let Some(Mode::Flow(flow)) = self.modes.last_mut() else {
            unreachable!("flow frame outside flow mode")
        };
        flow.blocks.try_push(FlowFrame {
            block: index,
            used,
            positioned,
        })?;
        self.descend(node)
    }

    // -- inline mode --------------------------------------------------------

    /// Makes sure an IFC is open for inline content. Returns `false` when
    /// there is no enclosing block to host one (inline content at the very
    /// root), in which case the content generates nothing.
    fn ensure_inline_open(&mut self, trigger: Node) -> Result<bool, LayoutError> {
        match self.modes.last() {
            Some(Mode::Inline(_)) => Ok(true),
            Some(Mode::Flow(_)) => {
                self.open_inline(trigger, false)?;
                Ok(true)
            },
            Some(Mode::Stf(_)) => {
                self.open_inline(trigger, true)?;
                Ok(true)
            },
            None => {
                warn!("inline content outside any block container is ignored");
                Ok(false)
            },
        }
    }

    fn ifc_font(&mut self, trigger: Node) -> FontHandle {
        let parent = self.tree.parent(trigger);
        let font: Font = match parent {
            Some(parent) => self.styles.computed_for(parent),
            None => Font::initial(),
        };
        match font.font {
            FontSelection::Font(handle) => handle,
            FontSelection::None => FontHandle::INVALID,
        }
    }

    fn open_inline(&mut self, trigger: Node, in_stf: bool) -> Result<(), LayoutError> {
        let font = self.ifc_font(trigger);

        if in_stf {
            // The IFC gets its own subtree, spliced back via a proxy during
            // shrink-to-fit realization. Lines are split unconstrained; the
            // longest line becomes the IFC's intrinsic width.
            let subtree = self.boxes.push_subtree(None)?;
            let container = self.boxes.subtree_mut(subtree).push_block(None)?;
            debug_assert_eq!(container, 0);
            let builder = IfcBuilder::begin(&mut self.boxes, font)?;
            self.boxes.subtree_mut(subtree).block_type[container] =
                BlockType::IfcContainer(builder.ifc);
            self.sc.add_ifc(builder.ifc)?;
            self.subtree_stack.try_push(subtree)?;
            self.modes.try_push(Mode::Inline(InlineMode {
                builder,
                target: InlineTarget::Stf,
                max_line_length: Au(i32::MAX),
                cb: stf_containing_block(),
            }))?;
        } else {
            let cb = self.containing_block();
            let subtree_id = self.current_subtree();
            let container = self.boxes.subtree_mut(subtree_id).push_block(None)?;
            let builder = IfcBuilder::begin(&mut self.boxes, font)?;
            self.boxes.subtree_mut(subtree_id).block_type[container] =
                BlockType::IfcContainer(builder.ifc);
            self.sc.add_ifc(builder.ifc)?;
            self.modes.try_push(Mode::Inline(InlineMode {
                builder,
                target: InlineTarget::FlowContainer { container },
                max_line_length: cb.inline,
                cb,
            }))?;
        }
        Ok(())
    }

    fn inline_element(&mut self, node: Node) -> Result<(), LayoutError> {
        let cb_inline = match self.modes.last() {
            Some(Mode::Inline(inline)) => inline.cb.inline,
            _ => unreachable!("inline element outside inline mode"),
        };

        let horizontal: HorizontalEdges = self.styles.specified_value();
        self.styles.set_computed_value(horizontal.clone());
        let vertical: VerticalEdges = self.styles.specified_value();
        self.styles.set_computed_value(vertical.clone());
        let border_styles: BorderStyles = self.styles.specified_value();
        self.styles.set_computed_value(border_styles.clone());

        let inline_start = InlineBoxEdge {
            border: model::border_width(border_styles.left, horizontal.border_left),
            padding: model::positive_length_percentage(horizontal.padding_left, cb_inline),
        };
        let inline_end = InlineBoxEdge {
            border: model::border_width(border_styles.right, horizontal.border_right),
            padding: model::positive_length_percentage(horizontal.padding_right, cb_inline),
        };
        let block_start = InlineBoxEdge {
            border: model::border_width(border_styles.top, vertical.border_top),
            padding: model::positive_length_percentage(vertical.padding_top, cb_inline),
        };
        let block_end = InlineBoxEdge {
            border: model::border_width(border_styles.bottom, vertical.border_bottom),
            padding: model::positive_length_percentage(vertical.padding_bottom, cb_inline),
        };
        let margins = InlineMargins {
            start: model::length_percentage_auto(horizontal.margin_left, cb_inline)
                .specified_or_zero(),
            end: model::length_percentage_auto(horizontal.margin_right, cb_inline)
                .specified_or_zero(),
        };
        self.styles.commit_node()?;

        let boxes = &mut self.boxes;
        let Some(Mode::Inline(inline)) = self.modes.last_mut() else {
            unreachable!("inline element outside inline mode")
        };
        let index = inline.builder.push_inline_box(
            boxes,
            node,
            inline_start,
            inline_end,
            block_start,
            block_end,
            margins,
        )?;
        let ifc = inline.builder.ifc;
        boxes.set_generated_box(node, GeneratedBox::InlineBox { ifc, index })?;
        self.descend(node)
    }

    fn inline_block_element(&mut self, node: Node, position: Position) -> Result<(), LayoutError> {
        let cb = match self.modes.last() {
            Some(Mode::Inline(inline)) => inline.cb,
            _ => unreachable!("inline-block outside inline mode"),
        };
        let mut used = solve_all_sizes(&mut self.styles, position, &cb);

        if used.inline_size().is_auto() {
            // Unknown width: build the shrink-to-fit object tree first.
            let z: ZIndex = self.styles.specified_value();
            self.styles.set_computed_value(z.clone());
            let kind = solve_stacking_context(position, &z);
            let stacking_context = self.sc.push_without_block(kind)?;
            let positioned = position == Position::Relative;
            let absolute_cb = if positioned {
                Some(self.acb.push_without_block()?)
            } else {
                None
            };
            self.styles.commit_node()?;

            let mut objects = StfObjects::default();
            let object = objects.push(
                Some(node),
                StfObjectKind::FlowStf {
                    used,
                    width_clamped: Au(0),
                    stacking_context,
                    absolute_cb,
                },
            )?;
            let mut frames = Vec::new();
            frames.try_push(StfFrame {
                object,
                auto_width: Au(0),
                positioned,
            })?;
            self.modes.try_push(Mode::Stf(StfMode {
                objects,
                frames,
                cb,
            }))?;
            self.descend(node)
        } else {
            // Fixed width: ordinary flow, laid out in place. Margin solving
            // sees no slack, so auto margins become zero.
            let margin_box_inline_size = used.margin_box_inline_size();
            adjust_width_and_margins(&mut used, margin_box_inline_size);
            self.modes.try_push(Mode::Flow(FlowMode {
                blocks: Vec::new(),
            }))?;
            self.push_flow_frame(node, used, position)
        }
    }

    fn close_inline_mode(&mut self) -> Result<(), LayoutError> {
        let Some(Mode::Inline(inline)) = self.modes.pop() else {
            unreachable!("no inline mode to close")
        };
        let InlineMode {
            builder,
            target,
            max_line_length,
            cb,
        } = inline;

        match target {
            InlineTarget::FlowContainer { container } => {
                let subtree_id = self.current_subtree();
                let result = builder.finish(&mut self.boxes, self.fonts, subtree_id, max_line_length)?;
                let container_ref = BlockRef {
                    subtree: subtree_id,
                    index: container,
                };
                self.boxes.ifc_mut(result.ifc).parent_block = Some(container_ref);

                let s = self.boxes.subtree_mut(subtree_id);
                s.skip[container] = s.len() - container;
                let size = LayoutSize::new(cb.inline, result.height);
                s.box_offsets[container] = BoxOffsets {
                    border_pos: zero_point(),
                    border_size: size,
                    content_pos: zero_point(),
                    content_size: size,
                };
            },
            InlineTarget::Stf => {
                let subtree_id = self
                    .subtree_stack
                    .pop()
                    .expect("shrink-to-fit IFC lost its subtree");
                let result = builder.finish(&mut self.boxes, self.fonts, subtree_id, max_line_length)?;
                let s = self.boxes.subtree_mut(subtree_id);
                s.skip[0] = s.len();

                let Some(Mode::Stf(stf)) = self.modes.last_mut() else {
                    unreachable!("shrink-to-fit IFC outside shrink-to-fit mode")
                };
                stf.objects.push(
                    None,
                    StfObjectKind::Ifc {
                        subtree: subtree_id,
                        ifc: result.ifc,
                        min_width: result.longest_line,
                        height: result.height,
                    },
                )?;
                let frame = stf.frames.last_mut().expect("no open shrink-to-fit frame");
                frame.auto_width = frame.auto_width.max(result.longest_line);
            },
        }
        Ok(())
    }

    // -- shrink-to-fit mode -------------------------------------------------

    fn stf_block_element(&mut self, node: Node, position: Position) -> Result<(), LayoutError> {
        let cb = stf_containing_block();
        let mut used = solve_all_sizes(&mut self.styles, position, &cb);
        let positioned = position == Position::Relative;

        if used.inline_size().is_auto() {
            // Another unknown width: a nested object in the same run.
            let z: ZIndex = self.styles.specified_value();
            self.styles.set_computed_value(z.clone());
            let kind = solve_stacking_context(position, &z);
            let stacking_context = self.sc.push_without_block(kind)?;
            let absolute_cb = if positioned {
                Some(self.acb.push_without_block()?)
            } else {
                None
            };
            self.styles.commit_node()?;

            let Some(Mode::Stf(stf)) = self.modes.last_mut() else {
                unreachable!("shrink-to-fit element outside shrink-to-fit mode")
            };
            let object = stf.objects.push(
                Some(node),
                StfObjectKind::FlowStf {
                    used,
                    width_clamped: Au(0),
                    stacking_context,
                    absolute_cb,
                },
            )?;
            stf.frames.try_push(StfFrame {
                object,
                auto_width: Au(0),
                positioned,
            })?;
            self.descend(node)
        } else {
            // Fixed width: layout is immediately decidable. Run a complete
            // normal flow into a fresh subtree; phase 2 splices it back.
            let margin_box_inline_size = used.margin_box_inline_size();
            adjust_width_and_margins(&mut used, margin_box_inline_size);
            let subtree = self.boxes.push_subtree(None)?;
            self.subtree_stack.try_push(subtree)?;
            self.modes.try_push(Mode::Flow(FlowMode {
                blocks: Vec::new(),
            }))?;
            self.push_flow_frame(node, used, position)
        }
    }

    // -- end-of-siblings ----------------------------------------------------

    fn null_node(&mut self) -> Result<(), LayoutError> {
        // An IFC at its base level does not consume the null: the enclosing
        // mode sees the same end-of-siblings right after the IFC closes.
        if let Some(Mode::Inline(inline)) = self.modes.last() {
            if inline.builder.open_box_count() == 1 {
                return self.close_inline_mode();
            }
        }

        self.node_stack.pop();
        match self.modes.last() {
            None => Ok(()), // initial mode: traversal complete
            Some(Mode::Flow(_)) => self.close_flow_frame(),
            Some(Mode::Inline(_)) => {
                let boxes = &mut self.boxes;
                let Some(Mode::Inline(inline)) = self.modes.last_mut() else {
                    unreachable!()
                };
                inline.builder.pop_inline_box(boxes)?;
                self.advance();
                Ok(())
            },
            Some(Mode::Stf(_)) => self.close_stf_frame(),
        }
    }

    fn close_flow_frame(&mut self) -> Result<(), LayoutError> {
        let subtree_id = self.current_subtree();
        let (frame, now_empty) = {
            let Some(Mode::Flow(flow)) = self.modes.last_mut() else {
                unreachable!("no flow mode to close")
            };
            let frame = flow.blocks.pop().expect("flow frame underflow");
            (frame, flow.blocks.is_empty())
        };

        {
            let s = self.boxes.subtree_mut(subtree_id);
            s.skip[frame.block] = s.len() - frame.block;
            let auto_height = offset_child_blocks(s, frame.block);
            let height = solve_used_height(&frame.used, auto_height);
            set_block_data(
                s,
                frame.block,
                &frame.used,
                LayoutSize::new(frame.used.inline_size, height),
            );
        }
        self.cb_stack.pop();
        self.sc.pop();
        if frame.positioned {
            self.acb.pop();
        }

        if now_empty {
            self.modes.pop();
            self.after_flow_mode(subtree_id, frame.block)?;
        } else {
            self.advance();
        }
        Ok(())
    }

    /// The parent mode consumes a finished flow: the root flow simply ends,
    /// an in-place inline-block joins the open IFC, and a shrink-to-fit
    /// child becomes a `FlowNormal` object.
    fn after_flow_mode(&mut self, subtree: SubtreeId, root_block: usize) -> Result<(), LayoutError> {
        // The finished mode is already popped; its origin is recoverable
        // from the parent mode on the stack.
        match self.modes.last() {
            None => {
                // Root flow: back to the initial mode.
                self.advance();
                Ok(())
            },
            Some(Mode::Inline(_)) => {
                let boxes = &mut self.boxes;
                let Some(Mode::Inline(inline)) = self.modes.last_mut() else {
                    unreachable!()
                };
                inline.builder.add_inline_block(boxes, root_block)?;
                self.advance();
                Ok(())
            },
            Some(Mode::Stf(_)) => {
                let popped = self.subtree_stack.pop();
                debug_assert_eq!(popped, Some(subtree));
                let result = BlockRef {
                    subtree,
                    index: root_block,
                };
                let contribution = {
                    let s = self.boxes.subtree(subtree);
                    s.box_offsets(root_block).border_size.width +
                        s.margins(root_block).horizontal()
                };
                let Some(Mode::Stf(stf)) = self.modes.last_mut() else {
                    unreachable!()
                };
                stf.objects
                    .push(None, StfObjectKind::FlowNormal { result })?;
                let frame = stf.frames.last_mut().expect("no open shrink-to-fit frame");
                frame.auto_width = frame.auto_width.max(contribution);
                self.advance();
                Ok(())
            },
            Some(Mode::Flow(_)) => unreachable!("flow mode nested directly in flow mode"),
        }
    }

    fn close_stf_frame(&mut self) -> Result<(), LayoutError> {
        let now_empty = {
            let Some(Mode::Stf(stf)) = self.modes.last_mut() else {
                unreachable!("no shrink-to-fit mode to close")
            };
            let frame = stf.frames.pop().expect("shrink-to-fit frame underflow");
            let full_width = stf.objects.close_flow_stf(frame.object, frame.auto_width);
            if let Some(parent) = stf.frames.last_mut() {
                parent.auto_width = parent.auto_width.max(full_width);
            }
            if frame.positioned {
                self.acb.pop();
            }
            stf.frames.is_empty()
        };
        self.sc.pop();

        if now_empty {
            let Some(Mode::Stf(stf)) = self.modes.pop() else {
                unreachable!()
            };
            let target = self.current_subtree();
            let result = realize(
                &stf.objects,
                &mut self.boxes,
                &mut self.sc,
                &mut self.acb,
                target,
                stf.cb.inline,
            )?;
            self.after_stf_mode(result)?;
        } else {
            self.advance();
        }
        Ok(())
    }

    /// The enclosing IFC consumes a realized shrink-to-fit inline-block.
    fn after_stf_mode(&mut self, result: BlockRef) -> Result<(), LayoutError> {
        let boxes = &mut self.boxes;
        let Some(Mode::Inline(inline)) = self.modes.last_mut() else {
            unreachable!("shrink-to-fit completed outside an IFC")
        };
        inline.builder.add_inline_block(boxes, result.index)?;
        self.advance();
        Ok(())
    }
}
