/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The box tree: layout's output.
//!
//! Block boxes live in columnar, skip-encoded *subtrees*: one array per
//! attribute, with each block's `skip` holding the size of its subtree
//! (itself included), so that `[i + 1, i + skip[i])` is exactly `i`'s
//! descendants and "next sibling" is one addition.
//!
//! ~~~ascii
//! +- Subtree ----------------------------------------+
//! |        +---+---+---+---+---+                     |
//! | skip:  | 5 | 3 | 1 | 1 | 1 |  block 1 has two    |
//! |        +---+---+---+---+---+  children (2 and 3) |
//! |          0   1   2   3   4                       |
//! +--------------------------------------------------+
//! ~~~
//!
//! Inline content lives in per-IFC glyph streams (see [`Special`] for the
//! marker encoding) with parallel metrics, plus columnar inline-box tables.
//! Paint order is the storage order of the stacking-context records.

use std::fmt::Write as _;
use std::ops::Range;

use app_units::Au;
use fonts::FontHandle;
use pixels::ImageHandle;
use rustc_hash::FxHashMap;

use crate::LayoutError;
use crate::dom::Node;
use crate::fallible::FallibleVec;
use crate::geom::{
    LayoutPoint, LayoutRect, LayoutSideOffsets, LayoutSize, LayoutVector, zero_point, zero_rect,
    zero_side_offsets, zero_size, zero_vector,
};
use crate::style::properties::{BackgroundRepeat, BackgroundRepeatKeyword, Rgba};

// ---------------------------------------------------------------------------
// Ids.

macro_rules! narrow_id {
    ($(#[$meta:meta])* $Name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $Name(pub u16);

        impl $Name {
            pub(crate) fn from_len(len: usize) -> Result<$Name, LayoutError> {
                u16::try_from(len)
                    .map($Name)
                    .map_err(|_| LayoutError::SizeLimitExceeded)
            }

            pub fn to_usize(self) -> usize {
                self.0 as usize
            }
        }
    };
}

narrow_id! {
    /// Identifies one block subtree within a box tree.
    SubtreeId
}
narrow_id! {
    /// Identifies one inline formatting context within a box tree.
    IfcId
}
narrow_id! {
    /// Identifies one stacking context within a box tree.
    StackingContextId
}
narrow_id! {
    /// Indexes an inline box within its IFC's tables. Index 0 is always the
    /// root inline box.
    InlineBoxIndex
}
narrow_id! {
    /// Addresses one `[begin, end)` slice of the background-image pool.
    BackgroundImagesHandle
}

/// A reference to one block box: a subtree plus an index within it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BlockRef {
    pub subtree: SubtreeId,
    pub index: usize,
}

// ---------------------------------------------------------------------------
// Per-block columns.

/// Border-box and content-box geometry, relative to the block's own
/// coordinate space (the parent's content origin translated by this block's
/// `offset`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxOffsets {
    pub border_pos: LayoutPoint,
    pub border_size: LayoutSize,
    pub content_pos: LayoutPoint,
    pub content_size: LayoutSize,
}

impl Default for BoxOffsets {
    fn default() -> BoxOffsets {
        BoxOffsets {
            border_pos: zero_point(),
            border_size: zero_size(),
            content_pos: zero_point(),
            content_size: zero_size(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockType {
    /// An ordinary block box.
    Block,
    /// An anonymous block holding one inline formatting context.
    IfcContainer(IfcId),
    /// A placeholder standing in for a subtree laid out separately
    /// (shrink-to-fit realization).
    SubtreeProxy(SubtreeId),
}

/// Used border colors, one per side.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BorderColors {
    pub top: Rgba,
    pub right: Rgba,
    pub bottom: Rgba,
    pub left: Rgba,
}

/// A block's used background: the color, the rectangle it is clipped to,
/// and an optional slice of rendered background images.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockBackground {
    pub color: Rgba,
    pub color_clip: LayoutRect,
    pub images: Option<BackgroundImagesHandle>,
}

impl Default for BlockBackground {
    fn default() -> BlockBackground {
        BlockBackground {
            color: Rgba::TRANSPARENT,
            color_clip: zero_rect(),
            images: None,
        }
    }
}

/// Iterates the direct children of a node in any skip-encoded array.
pub struct SkipChildren<'a> {
    skip: &'a [usize],
    next: usize,
    end: usize,
}

impl<'a> SkipChildren<'a> {
    pub(crate) fn new(skip: &'a [usize], index: usize) -> SkipChildren<'a> {
        SkipChildren {
            skip,
            next: index + 1,
            end: index + skip[index],
        }
    }
}

impl Iterator for SkipChildren<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.end {
            return None;
        }
        let child = self.next;
        self.next += self.skip[child];
        Some(child)
    }
}

/// One skip-encoded forest of block boxes, stored one array per attribute.
#[derive(Debug, Default)]
pub struct Subtree {
    pub(crate) parent: Option<BlockRef>,
    pub(crate) skip: Vec<usize>,
    pub(crate) block_type: Vec<BlockType>,
    pub(crate) stacking_context: Vec<Option<StackingContextId>>,
    pub(crate) node: Vec<Option<Node>>,
    pub(crate) box_offsets: Vec<BoxOffsets>,
    pub(crate) borders: Vec<LayoutSideOffsets>,
    pub(crate) margins: Vec<LayoutSideOffsets>,
    pub(crate) insets: Vec<LayoutVector>,
    pub(crate) border_colors: Vec<BorderColors>,
    pub(crate) background: Vec<BlockBackground>,
    pub(crate) offset: Vec<LayoutVector>,
}

impl Subtree {
    pub fn len(&self) -> usize {
        self.skip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skip.is_empty()
    }

    /// The block this subtree is spliced into, for proxy subtrees.
    pub fn parent(&self) -> Option<BlockRef> {
        self.parent
    }

    pub fn skip(&self, index: usize) -> usize {
        self.skip[index]
    }

    pub fn block_type(&self, index: usize) -> BlockType {
        self.block_type[index]
    }

    pub fn stacking_context(&self, index: usize) -> Option<StackingContextId> {
        self.stacking_context[index]
    }

    pub fn node(&self, index: usize) -> Option<Node> {
        self.node[index]
    }

    pub fn box_offsets(&self, index: usize) -> &BoxOffsets {
        &self.box_offsets[index]
    }

    pub fn borders(&self, index: usize) -> &LayoutSideOffsets {
        &self.borders[index]
    }

    pub fn margins(&self, index: usize) -> &LayoutSideOffsets {
        &self.margins[index]
    }

    pub fn insets(&self, index: usize) -> LayoutVector {
        self.insets[index]
    }

    pub fn border_colors(&self, index: usize) -> &BorderColors {
        &self.border_colors[index]
    }

    pub fn background(&self, index: usize) -> &BlockBackground {
        &self.background[index]
    }

    /// The paint-time translation from the parent's content origin.
    pub fn offset(&self, index: usize) -> LayoutVector {
        self.offset[index]
    }

    pub fn children(&self, index: usize) -> SkipChildren<'_> {
        SkipChildren::new(&self.skip, index)
    }

    /// Appends a block with default columns and `skip = 1`; returns its
    /// index.
    pub(crate) fn push_block(&mut self, node: Option<Node>) -> Result<usize, LayoutError> {
        let index = self.skip.len();
        self.skip.try_push(1)?;
        self.block_type.try_push(BlockType::Block)?;
        self.stacking_context.try_push(None)?;
        self.node.try_push(node)?;
        self.box_offsets.try_push(BoxOffsets::default())?;
        self.borders.try_push(zero_side_offsets())?;
        self.margins.try_push(zero_side_offsets())?;
        self.insets.try_push(zero_vector())?;
        self.border_colors.try_push(BorderColors::default())?;
        self.background.try_push(BlockBackground::default())?;
        self.offset.try_push(zero_vector())?;
        Ok(index)
    }
}

// ---------------------------------------------------------------------------
// Inline formatting contexts.

/// A glyph-stream entry: a shaped glyph id, or `0` marking that the *next*
/// entry is a [`Special`].
pub type GlyphIndex = u32;

/// Per-glyph used metrics, filled by the metrics pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GlyphMetrics {
    /// Horizontal offset from the pen position to the drawn content.
    pub offset: Au,
    /// Pen movement after this entry.
    pub advance: Au,
    /// Width of the drawn content.
    pub width: Au,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SpecialKind {
    /// A real shaped glyph whose id collides with the marker value 0.
    ZeroGlyphIndex,
    /// Opens inline box `data`.
    BoxStart,
    /// Closes inline box `data`.
    BoxEnd,
    /// An inline-block whose block box is at index `data` in the IFC's
    /// subtree.
    InlineBlock,
    /// A forced line break.
    LineBreak,
}

/// The second entry of a marker pair: a kind and a payload, packed 16 bits
/// each into one [`GlyphIndex`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Special {
    pub kind: SpecialKind,
    pub data: u16,
}

impl Special {
    pub(crate) const ZERO_GLYPH: Special = Special {
        kind: SpecialKind::ZeroGlyphIndex,
        data: 0,
    };

    pub(crate) const LINE_BREAK: Special = Special {
        kind: SpecialKind::LineBreak,
        data: 0,
    };

    pub(crate) fn box_start(index: InlineBoxIndex) -> Special {
        Special {
            kind: SpecialKind::BoxStart,
            data: index.0,
        }
    }

    pub(crate) fn box_end(index: InlineBoxIndex) -> Special {
        Special {
            kind: SpecialKind::BoxEnd,
            data: index.0,
        }
    }

    pub(crate) fn inline_block(block_index: usize) -> Result<Special, LayoutError> {
        let data = u16::try_from(block_index).map_err(|_| LayoutError::SizeLimitExceeded)?;
        Ok(Special {
            kind: SpecialKind::InlineBlock,
            data,
        })
    }

    pub fn encode(self) -> GlyphIndex {
        let kind = match self.kind {
            SpecialKind::ZeroGlyphIndex => 0u32,
            SpecialKind::BoxStart => 1,
            SpecialKind::BoxEnd => 2,
            SpecialKind::InlineBlock => 3,
            SpecialKind::LineBreak => 4,
        };
        (kind << 16) | GlyphIndex::from(self.data)
    }

    pub fn decode(value: GlyphIndex) -> Special {
        let kind = match value >> 16 {
            0 => SpecialKind::ZeroGlyphIndex,
            1 => SpecialKind::BoxStart,
            2 => SpecialKind::BoxEnd,
            3 => SpecialKind::InlineBlock,
            4 => SpecialKind::LineBreak,
            tag => unreachable!("corrupt special glyph entry (kind {})", tag),
        };
        Special {
            kind,
            data: value as u16,
        }
    }
}

/// One horizontal slice of an IFC.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineBox {
    /// Distance from the top of the IFC to this line's baseline.
    pub baseline: Au,
    /// The glyph entries on this line, as a range into the glyph stream.
    pub elements: Range<usize>,
    /// The inline box open when the line started; `None` for the root.
    pub inline_box: Option<InlineBoxIndex>,
}

/// Used border + padding widths on one side of an inline box.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InlineBoxEdge {
    pub border: Au,
    pub padding: Au,
}

impl InlineBoxEdge {
    pub fn sum(self) -> Au {
        self.border + self.padding
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InlineMargins {
    pub start: Au,
    pub end: Au,
}

/// Columnar per-inline-box data. Index 0 is the root inline box, which has
/// empty edges, margins, and background.
#[derive(Debug, Default)]
pub struct InlineBoxes {
    pub(crate) node: Vec<Option<Node>>,
    pub(crate) inline_start: Vec<InlineBoxEdge>,
    pub(crate) inline_end: Vec<InlineBoxEdge>,
    pub(crate) block_start: Vec<InlineBoxEdge>,
    pub(crate) block_end: Vec<InlineBoxEdge>,
    pub(crate) margins: Vec<InlineMargins>,
    pub(crate) insets: Vec<LayoutVector>,
    pub(crate) background_color: Vec<Rgba>,
    pub(crate) border_colors: Vec<BorderColors>,
}

impl InlineBoxes {
    pub fn len(&self) -> usize {
        self.node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    pub fn node(&self, index: InlineBoxIndex) -> Option<Node> {
        self.node[index.to_usize()]
    }

    pub fn inline_start(&self, index: InlineBoxIndex) -> InlineBoxEdge {
        self.inline_start[index.to_usize()]
    }

    pub fn inline_end(&self, index: InlineBoxIndex) -> InlineBoxEdge {
        self.inline_end[index.to_usize()]
    }

    pub fn block_start(&self, index: InlineBoxIndex) -> InlineBoxEdge {
        self.block_start[index.to_usize()]
    }

    pub fn block_end(&self, index: InlineBoxIndex) -> InlineBoxEdge {
        self.block_end[index.to_usize()]
    }

    pub fn margins(&self, index: InlineBoxIndex) -> InlineMargins {
        self.margins[index.to_usize()]
    }

    pub fn insets(&self, index: InlineBoxIndex) -> LayoutVector {
        self.insets[index.to_usize()]
    }

    pub fn background_color(&self, index: InlineBoxIndex) -> Rgba {
        self.background_color[index.to_usize()]
    }

    pub fn border_colors(&self, index: InlineBoxIndex) -> &BorderColors {
        &self.border_colors[index.to_usize()]
    }

    pub(crate) fn push(
        &mut self,
        node: Option<Node>,
        inline_start: InlineBoxEdge,
        inline_end: InlineBoxEdge,
        block_start: InlineBoxEdge,
        block_end: InlineBoxEdge,
        margins: InlineMargins,
    ) -> Result<InlineBoxIndex, LayoutError> {
        let index = InlineBoxIndex::from_len(self.node.len())?;
        self.node.try_push(node)?;
        self.inline_start.try_push(inline_start)?;
        self.inline_end.try_push(inline_end)?;
        self.block_start.try_push(block_start)?;
        self.block_end.try_push(block_end)?;
        self.margins.try_push(margins)?;
        self.insets.try_push(zero_vector())?;
        self.background_color.try_push(Rgba::TRANSPARENT)?;
        self.border_colors.try_push(BorderColors::default())?;
        Ok(index)
    }
}

/// One inline formatting context: a glyph stream with parallel metrics, the
/// line boxes cut from it, and the inline-box tables.
#[derive(Debug)]
pub struct InlineFormattingContext {
    pub(crate) parent_block: Option<BlockRef>,
    pub(crate) glyph_indexes: Vec<GlyphIndex>,
    pub(crate) metrics: Vec<GlyphMetrics>,
    pub(crate) line_boxes: Vec<LineBox>,
    pub(crate) inline_boxes: InlineBoxes,
    pub(crate) font: FontHandle,
    pub(crate) font_color: Rgba,
    pub(crate) ascender: Au,
    pub(crate) descender: Au,
}

/// One decoded glyph-stream entry, as yielded by [`GlyphStreamIter`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GlyphStreamEntry {
    /// A real shaped glyph.
    Glyph {
        index: GlyphIndex,
        metrics: GlyphMetrics,
    },
    /// A decoded marker pair. The metrics are those of the pair's first
    /// entry (box edges, inline-block extents, or zeros).
    Special {
        special: Special,
        metrics: GlyphMetrics,
    },
}

/// Walks a glyph stream, decoding marker pairs as it goes. Each item comes
/// with its starting position in the stream, so line-box element ranges can
/// be mapped back onto entries.
pub struct GlyphStreamIter<'a> {
    indexes: &'a [GlyphIndex],
    metrics: &'a [GlyphMetrics],
    position: usize,
    end: usize,
}

impl Iterator for GlyphStreamIter<'_> {
    type Item = (usize, GlyphStreamEntry);

    fn next(&mut self) -> Option<(usize, GlyphStreamEntry)> {
        if self.position >= self.end {
            return None;
        }
        let position = self.position;
        let index = self.indexes[position];
        let metrics = self.metrics[position];
        let entry = if index == 0 {
            self.position += 2;
            GlyphStreamEntry::Special {
                special: Special::decode(self.indexes[position + 1]),
                metrics,
            }
        } else {
            self.position += 1;
            GlyphStreamEntry::Glyph { index, metrics }
        };
        Some((position, entry))
    }
}

impl InlineFormattingContext {
    /// The block box this IFC's content is positioned within.
    pub fn parent_block(&self) -> BlockRef {
        self.parent_block.expect("IFC observed before layout bound it")
    }

    /// Decoded iteration over the whole glyph stream.
    pub fn entries(&self) -> GlyphStreamIter<'_> {
        self.entries_in(0..self.glyph_indexes.len())
    }

    /// Decoded iteration over a sub-range of the stream, e.g. a line box's
    /// `elements`. The range must start on an entry boundary.
    pub fn entries_in(&self, range: Range<usize>) -> GlyphStreamIter<'_> {
        debug_assert!(range.end <= self.glyph_indexes.len());
        GlyphStreamIter {
            indexes: &self.glyph_indexes,
            metrics: &self.metrics,
            position: range.start,
            end: range.end,
        }
    }

    pub fn glyph_indexes(&self) -> &[GlyphIndex] {
        &self.glyph_indexes
    }

    pub fn metrics(&self) -> &[GlyphMetrics] {
        &self.metrics
    }

    pub fn line_boxes(&self) -> &[LineBox] {
        &self.line_boxes
    }

    pub fn inline_boxes(&self) -> &InlineBoxes {
        &self.inline_boxes
    }

    pub fn font(&self) -> FontHandle {
        self.font
    }

    pub fn font_color(&self) -> Rgba {
        self.font_color
    }

    pub fn ascender(&self) -> Au {
        self.ascender
    }

    pub fn descender(&self) -> Au {
        self.descender
    }
}

// ---------------------------------------------------------------------------
// Stacking contexts.

/// The skip-encoded stacking-context tree. Storage order is paint order:
/// children of every context are stored in non-decreasing `z-index` order,
/// and a preorder walk of the records visits them exactly as painted.
#[derive(Debug, Default)]
pub struct StackingContextTree {
    pub(crate) skip: Vec<usize>,
    pub(crate) id: Vec<StackingContextId>,
    pub(crate) z_index: Vec<i32>,
    pub(crate) block: Vec<Option<BlockRef>>,
    pub(crate) ifcs: Vec<Vec<IfcId>>,
}

impl StackingContextTree {
    pub fn len(&self) -> usize {
        self.skip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skip.is_empty()
    }

    pub fn skip(&self, index: usize) -> usize {
        self.skip[index]
    }

    pub fn id(&self, index: usize) -> StackingContextId {
        self.id[index]
    }

    pub fn z_index(&self, index: usize) -> i32 {
        self.z_index[index]
    }

    pub fn block(&self, index: usize) -> BlockRef {
        self.block[index].expect("stacking context never bound to a block")
    }

    pub fn ifcs(&self, index: usize) -> &[IfcId] {
        &self.ifcs[index]
    }

    pub fn children(&self, index: usize) -> SkipChildren<'_> {
        SkipChildren::new(&self.skip, index)
    }

    /// Paint order: for skip-encoded storage this is simply storage order.
    pub fn preorder(&self) -> impl Iterator<Item = usize> + '_ {
        0..self.len()
    }
}

// ---------------------------------------------------------------------------
// Background image pool.

/// One rendered background image: used geometry for a single layer.
/// An entry with `image == None` is an empty slot (unresolvable URL).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundImage {
    pub image: Option<ImageHandle>,
    /// Top-left of the positioning area.
    pub origin: LayoutPoint,
    /// Top-left of the first tile.
    pub position: LayoutPoint,
    /// Used size of one tile.
    pub size: LayoutSize,
    pub repeat: BackgroundRepeat,
    /// The painting area the tiles are clipped to.
    pub clip: LayoutRect,
}

impl Default for BackgroundImage {
    fn default() -> BackgroundImage {
        BackgroundImage {
            image: None,
            origin: zero_point(),
            position: zero_point(),
            size: zero_size(),
            repeat: BackgroundRepeat {
                x: BackgroundRepeatKeyword::Repeat,
                y: BackgroundRepeatKeyword::Repeat,
            },
            clip: zero_rect(),
        }
    }
}

/// A flat image array plus a slices table; each handle addresses one
/// contiguous `[begin, end)` of image records.
#[derive(Debug, Default)]
pub struct BackgroundImages {
    pub(crate) slices: Vec<Range<usize>>,
    pub(crate) images: Vec<BackgroundImage>,
}

impl BackgroundImages {
    pub fn get(&self, handle: BackgroundImagesHandle) -> &[BackgroundImage] {
        let range = self.slices[handle.to_usize()].clone();
        &self.images[range]
    }

    /// Reserves a contiguous slice of `count` empty records.
    pub(crate) fn alloc(&mut self, count: usize) -> Result<BackgroundImagesHandle, LayoutError> {
        let handle = BackgroundImagesHandle::from_len(self.slices.len())?;
        let begin = self.images.len();
        self.images
            .try_reserve(count)
            .map_err(|_| LayoutError::OutOfMemory)?;
        self.images
            .extend(std::iter::repeat(BackgroundImage::default()).take(count));
        self.slices.try_push(begin..begin + count)?;
        Ok(handle)
    }

    pub(crate) fn set(
        &mut self,
        handle: BackgroundImagesHandle,
        index: usize,
        image: BackgroundImage,
    ) {
        let range = self.slices[handle.to_usize()].clone();
        debug_assert!(index < range.len());
        self.images[range.start + index] = image;
    }
}

// ---------------------------------------------------------------------------
// The tree.

/// The box (or boxes) a source node generated, if any.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GeneratedBox {
    Block(BlockRef),
    InlineBox { ifc: IfcId, index: InlineBoxIndex },
    Text(IfcId),
}

/// The output of layout: everything a renderer needs to paint.
#[derive(Debug)]
pub struct BoxTree {
    pub(crate) subtrees: Vec<Subtree>,
    pub(crate) ifcs: Vec<InlineFormattingContext>,
    pub(crate) stacking_contexts: StackingContextTree,
    pub(crate) background_images: BackgroundImages,
    pub(crate) generated_boxes: FxHashMap<Node, GeneratedBox>,
    pub(crate) initial_containing_block: BlockRef,
}

impl BoxTree {
    pub(crate) fn new() -> BoxTree {
        BoxTree {
            subtrees: Vec::new(),
            ifcs: Vec::new(),
            stacking_contexts: StackingContextTree::default(),
            background_images: BackgroundImages::default(),
            generated_boxes: FxHashMap::default(),
            initial_containing_block: BlockRef {
                subtree: SubtreeId(0),
                index: 0,
            },
        }
    }

    pub fn subtrees(&self) -> &[Subtree] {
        &self.subtrees
    }

    pub fn subtree(&self, id: SubtreeId) -> &Subtree {
        &self.subtrees[id.to_usize()]
    }

    pub fn ifcs(&self) -> &[InlineFormattingContext] {
        &self.ifcs
    }

    pub fn ifc(&self, id: IfcId) -> &InlineFormattingContext {
        &self.ifcs[id.to_usize()]
    }

    pub fn stacking_contexts(&self) -> &StackingContextTree {
        &self.stacking_contexts
    }

    pub fn background_images(&self) -> &BackgroundImages {
        &self.background_images
    }

    pub fn generated_box(&self, node: Node) -> Option<GeneratedBox> {
        self.generated_boxes.get(&node).copied()
    }

    /// The viewport-sized root block.
    pub fn initial_containing_block(&self) -> BlockRef {
        self.initial_containing_block
    }

    // -- construction (crate-internal) --------------------------------------

    pub(crate) fn push_subtree(
        &mut self,
        parent: Option<BlockRef>,
    ) -> Result<SubtreeId, LayoutError> {
        let id = SubtreeId::from_len(self.subtrees.len())?;
        self.subtrees.try_push(Subtree {
            parent,
            ..Subtree::default()
        })?;
        Ok(id)
    }

    pub(crate) fn subtree_mut(&mut self, id: SubtreeId) -> &mut Subtree {
        &mut self.subtrees[id.to_usize()]
    }

    pub(crate) fn push_ifc(&mut self, font: FontHandle) -> Result<IfcId, LayoutError> {
        let id = IfcId::from_len(self.ifcs.len())?;
        self.ifcs.try_push(InlineFormattingContext {
            parent_block: None,
            glyph_indexes: Vec::new(),
            metrics: Vec::new(),
            line_boxes: Vec::new(),
            inline_boxes: InlineBoxes::default(),
            font,
            font_color: Rgba::TRANSPARENT,
            ascender: Au(0),
            descender: Au(0),
        })?;
        Ok(id)
    }

    pub(crate) fn ifc_mut(&mut self, id: IfcId) -> &mut InlineFormattingContext {
        &mut self.ifcs[id.to_usize()]
    }

    /// Simultaneous mutable access to an IFC and the subtree holding its
    /// inline-block boxes.
    pub(crate) fn ifc_and_subtree_mut(
        &mut self,
        ifc: IfcId,
        subtree: SubtreeId,
    ) -> (&mut InlineFormattingContext, &mut Subtree) {
        (
            &mut self.ifcs[ifc.to_usize()],
            &mut self.subtrees[subtree.to_usize()],
        )
    }

    pub(crate) fn set_generated_box(
        &mut self,
        node: Node,
        generated: GeneratedBox,
    ) -> Result<(), LayoutError> {
        self.generated_boxes
            .try_reserve(1)
            .map_err(|_| LayoutError::OutOfMemory)?;
        let previous = self.generated_boxes.insert(node, generated);
        debug_assert!(previous.is_none(), "node generated two boxes");
        Ok(())
    }

    // -- debugging ----------------------------------------------------------

    /// A hierarchical dump of the block structure, for debugging renderers.
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        let icb = self.initial_containing_block;
        self.print_block(&mut out, icb.subtree, icb.index, 0);
        out
    }

    fn print_block(&self, out: &mut String, subtree_id: SubtreeId, index: usize, depth: usize) {
        let subtree = self.subtree(subtree_id);
        let offsets = subtree.box_offsets(index);
        let _ = writeln!(
            out,
            "{:indent$}{:?} border={:?}x{:?} content={:?}x{:?} offset={:?}",
            "",
            subtree.block_type(index),
            offsets.border_size.width,
            offsets.border_size.height,
            offsets.content_size.width,
            offsets.content_size.height,
            subtree.offset(index),
            indent = depth * 2,
        );
        match subtree.block_type(index) {
            BlockType::SubtreeProxy(proxied) => {
                if !self.subtree(proxied).is_empty() {
                    self.print_block(out, proxied, 0, depth + 1);
                }
            },
            _ => {
                for child in subtree.children(index) {
                    self.print_block(out, subtree_id, child, depth + 1);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_encoding_round_trips() {
        let cases = [
            Special::ZERO_GLYPH,
            Special::LINE_BREAK,
            Special::box_start(InlineBoxIndex(0)),
            Special::box_end(InlineBoxIndex(41)),
            Special::inline_block(7).unwrap(),
        ];
        for special in cases {
            assert_eq!(Special::decode(special.encode()), special);
        }
    }

    #[test]
    fn inline_block_index_is_bounded() {
        assert!(Special::inline_block(usize::from(u16::MAX)).is_ok());
        assert_eq!(
            Special::inline_block(usize::from(u16::MAX) + 1),
            Err(LayoutError::SizeLimitExceeded)
        );
    }

    #[test]
    fn glyph_stream_iteration_decodes_pairs() {
        let mut ifc = InlineFormattingContext {
            parent_block: None,
            glyph_indexes: Vec::new(),
            metrics: Vec::new(),
            line_boxes: Vec::new(),
            inline_boxes: InlineBoxes::default(),
            font: FontHandle::INVALID,
            font_color: Rgba::TRANSPARENT,
            ascender: Au(0),
            descender: Au(0),
        };
        let start = Special::box_start(InlineBoxIndex(0));
        ifc.glyph_indexes
            .extend([0, start.encode(), 17, 0, Special::LINE_BREAK.encode()]);
        ifc.metrics
            .extend(std::iter::repeat(GlyphMetrics::default()).take(5));

        let entries: Vec<(usize, GlyphStreamEntry)> = ifc.entries().collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0],
            (
                0,
                GlyphStreamEntry::Special {
                    special: start,
                    metrics: GlyphMetrics::default(),
                }
            )
        );
        assert_eq!(
            entries[1],
            (
                2,
                GlyphStreamEntry::Glyph {
                    index: 17,
                    metrics: GlyphMetrics::default(),
                }
            )
        );
        assert_eq!(entries[2].0, 3);
    }

    #[test]
    fn skip_children_iteration() {
        // 0 -> (1 -> (2, 3), 4)
        let skip = [5usize, 3, 1, 1, 1];
        let children: Vec<_> = SkipChildren::new(&skip, 0).collect();
        assert_eq!(children, vec![1, 4]);
        let children: Vec<_> = SkipChildren::new(&skip, 1).collect();
        assert_eq!(children, vec![2, 3]);
        assert_eq!(SkipChildren::new(&skip, 2).count(), 0);
    }
}
