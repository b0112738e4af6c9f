/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Inline formatting contexts: building the glyph stream, solving per-glyph
//! metrics, and cutting the stream into line boxes.
//!
//! Construction appends to the stream in document order. Metrics are left
//! undefined until a single linear sweep fills them from the shaper (and,
//! for inline-blocks, from the already-laid-out block boxes). A second sweep
//! splits the stream into line boxes, tracking the open inline box for
//! background segmentation and deferring inline-block y positions until the
//! line's baseline is known.

use app_units::Au;
use fonts::{FontHandle, FontStore, GlyphId, ShaperMethods, ShapingOptions};
use log::debug;
use smallvec::{SmallVec, smallvec};

use crate::LayoutError;
use crate::box_tree::{
    BoxTree, GlyphMetrics, IfcId, InlineBoxEdge, InlineBoxIndex, InlineFormattingContext,
    InlineMargins, LineBox, Special, SpecialKind, Subtree, SubtreeId,
};
use crate::dom::Node;
use crate::fallible::FallibleVec;
use crate::geom::{LayoutVector, fixed_to_au};
use crate::model::TAB_SIZE;

/// What a finished IFC reports back to the enclosing mode.
#[derive(Clone, Copy, Debug)]
pub(crate) struct InlineLayoutResult {
    pub ifc: IfcId,
    /// The length of the longest finished line.
    pub longest_line: Au,
    /// The summed height of the line boxes.
    pub height: Au,
}

/// Incrementally builds one IFC's glyph stream and inline-box tables.
pub(crate) struct IfcBuilder {
    pub ifc: IfcId,
    font: FontHandle,
    options: ShapingOptions,
    open_boxes: SmallVec<[InlineBoxIndex; 8]>,
    // Scratch buffer reused across shaping runs.
    shaped: Vec<GlyphId>,
}

impl IfcBuilder {
    /// Creates an empty IFC with its root inline box open.
    pub fn begin(tree: &mut BoxTree, font: FontHandle) -> Result<IfcBuilder, LayoutError> {
        let ifc = tree.push_ifc(font)?;
        let root = tree.ifc_mut(ifc).inline_boxes.push(
            None,
            InlineBoxEdge::default(),
            InlineBoxEdge::default(),
            InlineBoxEdge::default(),
            InlineBoxEdge::default(),
            InlineMargins::default(),
        )?;
        debug_assert_eq!(root, InlineBoxIndex(0));

        let mut builder = IfcBuilder {
            ifc,
            font,
            options: ShapingOptions::default(),
            open_boxes: smallvec![root],
            shaped: Vec::new(),
        };
        builder.emit_special(tree, Special::box_start(root))?;
        Ok(builder)
    }

    /// Opens an inline box for `node` with the given used edges.
    pub fn push_inline_box(
        &mut self,
        tree: &mut BoxTree,
        node: Node,
        inline_start: InlineBoxEdge,
        inline_end: InlineBoxEdge,
        block_start: InlineBoxEdge,
        block_end: InlineBoxEdge,
        margins: InlineMargins,
    ) -> Result<InlineBoxIndex, LayoutError> {
        let index = tree.ifc_mut(self.ifc).inline_boxes.push(
            Some(node),
            inline_start,
            inline_end,
            block_start,
            block_end,
            margins,
        )?;
        self.open_boxes.try_push(index)?;
        self.emit_special(tree, Special::box_start(index))?;
        Ok(index)
    }

    /// How many inline boxes are open, the root included.
    pub fn open_box_count(&self) -> usize {
        self.open_boxes.len()
    }

    /// Closes the innermost open inline box.
    pub fn pop_inline_box(&mut self, tree: &mut BoxTree) -> Result<(), LayoutError> {
        let index = self.open_boxes.pop().expect("no open inline box");
        assert!(index != InlineBoxIndex(0), "popped the root inline box");
        self.emit_special(tree, Special::box_end(index))
    }

    /// Shapes a text node into the stream. Separators cut the text into
    /// runs: newlines become explicit line breaks and tabs shape as a
    /// fixed-size run of spaces. Without a usable font the text produces
    /// nothing at all.
    pub fn add_text(
        &mut self,
        tree: &mut BoxTree,
        fonts: &FontStore,
        text: &str,
    ) -> Result<(), LayoutError> {
        let Some(shaper) = fonts.get(self.font) else {
            return Ok(());
        };

        const TAB_AS_SPACES: &str = "        ";
        debug_assert_eq!(TAB_AS_SPACES.len(), TAB_SIZE);

        let mut start = 0;
        let mut chars = text.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            match ch {
                '\n' => {
                    self.flush_run(tree, shaper, &text[start..i])?;
                    self.emit_special(tree, Special::LINE_BREAK)?;
                    start = i + 1;
                },
                '\r' => {
                    self.flush_run(tree, shaper, &text[start..i])?;
                    self.emit_special(tree, Special::LINE_BREAK)?;
                    start = i + 1;
                    if let Some(&(j, '\n')) = chars.peek() {
                        chars.next();
                        start = j + 1;
                    }
                },
                '\t' => {
                    self.flush_run(tree, shaper, &text[start..i])?;
                    self.flush_run(tree, shaper, TAB_AS_SPACES)?;
                    start = i + 1;
                },
                _ => {},
            }
        }
        self.flush_run(tree, shaper, &text[start..])
    }

    fn flush_run(
        &mut self,
        tree: &mut BoxTree,
        shaper: &dyn ShaperMethods,
        run: &str,
    ) -> Result<(), LayoutError> {
        if run.is_empty() {
            return Ok(());
        }
        self.shaped.clear();
        shaper.shape_text(run, &self.options, &mut self.shaped);
        debug!("shaped {} bytes into {} glyphs", run.len(), self.shaped.len());
        for i in 0..self.shaped.len() {
            let id = self.shaped[i];
            if id == 0 {
                self.emit_special(tree, Special::ZERO_GLYPH)?;
            } else {
                self.emit_glyph(tree, id)?;
            }
        }
        Ok(())
    }

    /// Records an already-laid-out inline-block at `block_index` within the
    /// IFC's subtree.
    pub fn add_inline_block(
        &mut self,
        tree: &mut BoxTree,
        block_index: usize,
    ) -> Result<(), LayoutError> {
        let special = Special::inline_block(block_index)?;
        self.emit_special(tree, special)
    }

    /// Closes the root box, solves metrics, and splits lines. The IFC's
    /// inline-blocks live in `subtree`; their offsets are assigned here.
    pub fn finish(
        mut self,
        tree: &mut BoxTree,
        fonts: &FontStore,
        subtree: SubtreeId,
        max_line_length: Au,
    ) -> Result<InlineLayoutResult, LayoutError> {
        assert_eq!(
            self.open_boxes.len(),
            1,
            "inline boxes left open at end of IFC"
        );
        self.emit_special(tree, Special::box_end(InlineBoxIndex(0)))?;

        let shaper = fonts.get(self.font);
        let (ifc, subtree) = tree.ifc_and_subtree_mut(self.ifc, subtree);

        match shaper {
            Some(shaper) => {
                let extents = shaper.font_extents();
                ifc.ascender = fixed_to_au(extents.ascender);
                ifc.descender = fixed_to_au(extents.descender);
            },
            None => {
                ifc.ascender = Au(0);
                ifc.descender = Au(0);
            },
        }

        solve_metrics(ifc, shaper, subtree);
        let (longest_line, height) = split_into_line_boxes(ifc, subtree, max_line_length)?;
        debug!(
            "IFC {:?}: {} lines, longest {:?}, height {:?}",
            self.ifc,
            ifc.line_boxes.len(),
            longest_line,
            height
        );

        Ok(InlineLayoutResult {
            ifc: self.ifc,
            longest_line,
            height,
        })
    }

    fn emit_glyph(&mut self, tree: &mut BoxTree, id: GlyphId) -> Result<(), LayoutError> {
        debug_assert!(id != 0);
        let ifc = tree.ifc_mut(self.ifc);
        ifc.glyph_indexes.try_push(id)?;
        ifc.metrics.try_push(GlyphMetrics::default())?;
        Ok(())
    }

    fn emit_special(&mut self, tree: &mut BoxTree, special: Special) -> Result<(), LayoutError> {
        let ifc = tree.ifc_mut(self.ifc);
        ifc.glyph_indexes.try_push(0)?;
        ifc.metrics.try_push(GlyphMetrics::default())?;
        ifc.glyph_indexes.try_push(special.encode())?;
        ifc.metrics.try_push(GlyphMetrics::default())?;
        Ok(())
    }
}

/// One linear sweep filling the parallel metrics array.
fn solve_metrics(
    ifc: &mut InlineFormattingContext,
    shaper: Option<&dyn ShaperMethods>,
    subtree: &Subtree,
) {
    let glyph_metrics = |id: GlyphId| -> GlyphMetrics {
        match shaper {
            Some(shaper) => {
                let extents = shaper.glyph_extents(id);
                GlyphMetrics {
                    offset: fixed_to_au(extents.x_bearing),
                    advance: fixed_to_au(extents.h_advance),
                    width: fixed_to_au(extents.width),
                }
            },
            None => GlyphMetrics::default(),
        }
    };

    let mut i = 0;
    while i < ifc.glyph_indexes.len() {
        let index = ifc.glyph_indexes[i];
        if index != 0 {
            ifc.metrics[i] = glyph_metrics(index);
            i += 1;
            continue;
        }

        let special = Special::decode(ifc.glyph_indexes[i + 1]);
        ifc.metrics[i] = match special.kind {
            SpecialKind::ZeroGlyphIndex => glyph_metrics(0),
            SpecialKind::BoxStart => {
                let b = InlineBoxIndex(special.data);
                let edge = ifc.inline_boxes.inline_start(b);
                let margins = ifc.inline_boxes.margins(b);
                GlyphMetrics {
                    offset: margins.start,
                    advance: margins.start + edge.sum(),
                    width: edge.sum(),
                }
            },
            SpecialKind::BoxEnd => {
                let b = InlineBoxIndex(special.data);
                let edge = ifc.inline_boxes.inline_end(b);
                let margins = ifc.inline_boxes.margins(b);
                GlyphMetrics {
                    offset: Au(0),
                    advance: edge.sum() + margins.end,
                    width: edge.sum(),
                }
            },
            SpecialKind::InlineBlock => {
                let block = special.data as usize;
                let width = subtree.box_offsets(block).border_size.width;
                let margins = subtree.margins(block);
                GlyphMetrics {
                    offset: margins.left,
                    advance: width + margins.left + margins.right,
                    width,
                }
            },
            SpecialKind::LineBreak => GlyphMetrics::default(),
        };
        ifc.metrics[i + 1] = GlyphMetrics::default();
        i += 2;
    }
}

struct PendingInlineBlock {
    block: usize,
    x: Au,
    margin_box_height: Au,
    margin_top: Au,
}

/// The line-splitting sweep. Returns `(longest_line, total_height)`.
fn split_into_line_boxes(
    ifc: &mut InlineFormattingContext,
    subtree: &mut Subtree,
    max_line_length: Au,
) -> Result<(Au, Au), LayoutError> {
    let top_height = ifc.ascender;
    let bottom_height = ifc.descender;

    let mut open_boxes: Vec<InlineBoxIndex> = vec![InlineBoxIndex(0)];
    let owner = |open_boxes: &[InlineBoxIndex]| -> Option<InlineBoxIndex> {
        match *open_boxes.last().expect("root inline box closed early") {
            InlineBoxIndex(0) => None,
            index => Some(index),
        }
    };

    let mut cursor = Au(0);
    let mut max_top_height = top_height;
    let mut committed: usize = 0;
    let mut pending: Vec<PendingInlineBlock> = Vec::new();
    let mut line_start: usize = 2;
    let mut line_owner = owner(&open_boxes);
    let mut y = Au(0);
    let mut longest_line = Au(0);

    // A closure cannot borrow all the locals it would need, so line
    // finalization is a macro over the surrounding state.
    macro_rules! finalize_line {
        ($end:expr, $next_start:expr) => {{
            let baseline = y + max_top_height;
            ifc.line_boxes.try_push(LineBox {
                baseline,
                elements: line_start..$end,
                inline_box: line_owner,
            })?;
            longest_line = longest_line.max(cursor);
            for p in pending.drain(..) {
                subtree.offset[p.block] =
                    LayoutVector::new(p.x, baseline - p.margin_box_height + p.margin_top);
            }
            y = baseline + bottom_height;
            cursor = Au(0);
            committed = 0;
            max_top_height = top_height;
            line_start = $next_start;
            line_owner = owner(&open_boxes);
        }};
    }

    let len = ifc.glyph_indexes.len();
    let mut i = 2;
    while i < len {
        let index = ifc.glyph_indexes[i];
        let metrics = ifc.metrics[i];
        let is_special = index == 0;

        let special = if is_special {
            let special = Special::decode(ifc.glyph_indexes[i + 1]);
            if special.kind == SpecialKind::LineBreak {
                finalize_line!(i + 2, i + 2);
                i += 2;
                continue;
            }
            Some(special)
        } else {
            None
        };

        // Wrap before committing width-bearing content that no longer fits,
        // but never leave a line without a single committed glyph.
        if cursor > Au(0) &&
            metrics.width > Au(0) &&
            cursor + metrics.offset + metrics.width > max_line_length &&
            committed > 0
        {
            finalize_line!(i, i);
        }

        match special {
            None => {
                committed += 1;
            },
            Some(special) => match special.kind {
                SpecialKind::ZeroGlyphIndex => {
                    committed += 1;
                },
                SpecialKind::BoxStart => {
                    open_boxes.try_push(InlineBoxIndex(special.data))?;
                },
                SpecialKind::BoxEnd => {
                    let popped = open_boxes.pop();
                    debug_assert_eq!(popped, Some(InlineBoxIndex(special.data)));
                },
                SpecialKind::InlineBlock => {
                    let block = special.data as usize;
                    let margin_box_height = subtree.box_offsets(block).border_size.height +
                        subtree.margins(block).vertical();
                    let margin_top = subtree.margins(block).top;
                    pending.push(PendingInlineBlock {
                        block,
                        x: cursor,
                        margin_box_height,
                        margin_top,
                    });
                    max_top_height = max_top_height.max(margin_box_height - margin_top);
                    committed += 1;
                },
                SpecialKind::LineBreak => unreachable!("handled above"),
            },
        }

        cursor += metrics.advance;
        i += if is_special { 2 } else { 1 };
    }

    if committed > 0 || cursor > Au(0) {
        finalize_line!(len, len);
    }

    Ok((longest_line, y))
}
