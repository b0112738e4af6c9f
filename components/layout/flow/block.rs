/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Normal block flow: used-size solving, the CSS 2.2 §10.3.3 width/margin
//! constraint solution, auto heights, and vertical stacking of children.

use app_units::Au;
use bitflags::bitflags;

use crate::box_tree::{BoxOffsets, Subtree};
use crate::geom::{AuOrAuto, LayoutPoint, LayoutSideOffsets, LayoutSize, LayoutVector};
use crate::model;
use crate::stacking_context::StackingContextKind;
use crate::style::StyleComputer;
use crate::style::properties::{
    BorderStyles, BoxGen, ContentHeight, ContentWidth, HorizontalEdges, Insets, IntegerOrAuto,
    LengthPercentage, LengthPercentageAuto, MaxSize, Position, VerticalEdges, ZIndex,
};

/// The rectangle percentages and `auto` resolve against. A block-axis size
/// of `None` means the containing block's height depends on its own content.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct ContainingBlockSize {
    pub inline: Au,
    pub block: Option<Au>,
}

bitflags! {
    /// Which of a block's sizes were specified as `auto`. The corresponding
    /// untagged fields hold zero until the auto value is resolved.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub(crate) struct AutoSizes: u16 {
        const INLINE_SIZE = 1 << 0;
        const MARGIN_INLINE_START = 1 << 1;
        const MARGIN_INLINE_END = 1 << 2;
        const BLOCK_SIZE = 1 << 3;
        const INSET_LEFT = 1 << 4;
        const INSET_RIGHT = 1 << 5;
        const INSET_TOP = 1 << 6;
        const INSET_BOTTOM = 1 << 7;
    }
}

/// All of one block's used edges and sizes, with `auto` values tagged out
/// of band so the §10.3.3 solver can reason about them.
#[derive(Clone, Debug)]
pub(crate) struct BlockUsedSizes {
    pub border: LayoutSideOffsets,
    pub padding: LayoutSideOffsets,
    pub margin: LayoutSideOffsets,
    pub inline_size: Au,
    pub min_inline_size: Au,
    pub max_inline_size: Au,
    pub block_size: Au,
    pub min_block_size: Au,
    pub max_block_size: Au,
    pub inset_sides: LayoutSideOffsets,
    pub auto: AutoSizes,
    pub position: Position,
}

impl BlockUsedSizes {
    pub fn inline_size(&self) -> AuOrAuto {
        if self.auto.contains(AutoSizes::INLINE_SIZE) {
            AuOrAuto::Auto
        } else {
            AuOrAuto::Length(self.inline_size)
        }
    }

    pub fn set_inline_size(&mut self, size: Au) {
        self.auto.remove(AutoSizes::INLINE_SIZE);
        self.inline_size = size;
    }

    pub fn margin_inline_start(&self) -> AuOrAuto {
        if self.auto.contains(AutoSizes::MARGIN_INLINE_START) {
            AuOrAuto::Auto
        } else {
            AuOrAuto::Length(self.margin.left)
        }
    }

    pub fn margin_inline_end(&self) -> AuOrAuto {
        if self.auto.contains(AutoSizes::MARGIN_INLINE_END) {
            AuOrAuto::Auto
        } else {
            AuOrAuto::Length(self.margin.right)
        }
    }

    pub fn block_size(&self) -> AuOrAuto {
        if self.auto.contains(AutoSizes::BLOCK_SIZE) {
            AuOrAuto::Auto
        } else {
            AuOrAuto::Length(self.block_size)
        }
    }

    /// border + padding on the inline axis.
    pub fn inline_edges(&self) -> Au {
        self.border.horizontal() + self.padding.horizontal()
    }

    /// border + padding on the block axis.
    pub fn block_edges(&self) -> Au {
        self.border.vertical() + self.padding.vertical()
    }

    /// The full inline extent of the margin box, counting auto values as
    /// zero. This is what shrink-to-fit accumulates.
    pub fn margin_box_inline_size(&self) -> Au {
        self.inline_size + self.inline_edges() + self.margin.horizontal()
    }

    /// The used relative-positioning translation (CSS 2.2 §9.4.3: the
    /// explicit side wins; both `auto` means no offset).
    pub fn inset_vector(&self) -> LayoutVector {
        let x = if !self.auto.contains(AutoSizes::INSET_LEFT) {
            self.inset_sides.left
        } else if !self.auto.contains(AutoSizes::INSET_RIGHT) {
            -self.inset_sides.right
        } else {
            Au(0)
        };
        let y = if !self.auto.contains(AutoSizes::INSET_TOP) {
            self.inset_sides.top
        } else if !self.auto.contains(AutoSizes::INSET_BOTTOM) {
            -self.inset_sides.bottom
        } else {
            Au(0)
        };
        LayoutVector::new(x, y)
    }
}

/// Resolves every horizontal and vertical edge of the current element
/// against its containing block, publishing the computed groups as it goes.
///
/// Inline-axis percentages resolve against the containing block's width;
/// so do block-axis margin and padding percentages (CSS 2.2 §8.3).
pub(crate) fn solve_all_sizes(
    styles: &mut StyleComputer<'_, BoxGen>,
    position: Position,
    containing_block: &ContainingBlockSize,
) -> BlockUsedSizes {
    let cb_width = containing_block.inline;

    let content_width: ContentWidth = styles.specified_value();
    styles.set_computed_value(content_width.clone());
    let horizontal: HorizontalEdges = styles.specified_value();
    styles.set_computed_value(horizontal.clone());
    let content_height: ContentHeight = styles.specified_value();
    styles.set_computed_value(content_height.clone());
    let vertical: VerticalEdges = styles.specified_value();
    styles.set_computed_value(vertical.clone());
    let border_styles: BorderStyles = styles.specified_value();
    styles.set_computed_value(border_styles.clone());
    let insets: Insets = styles.specified_value();
    styles.set_computed_value(insets.clone());

    let mut used = BlockUsedSizes {
        border: LayoutSideOffsets::new(
            model::border_width(border_styles.top, vertical.border_top),
            model::border_width(border_styles.right, horizontal.border_right),
            model::border_width(border_styles.bottom, vertical.border_bottom),
            model::border_width(border_styles.left, horizontal.border_left),
        ),
        padding: LayoutSideOffsets::new(
            model::positive_length_percentage(vertical.padding_top, cb_width),
            model::positive_length_percentage(horizontal.padding_right, cb_width),
            model::positive_length_percentage(vertical.padding_bottom, cb_width),
            model::positive_length_percentage(horizontal.padding_left, cb_width),
        ),
        margin: LayoutSideOffsets::new(Au(0), Au(0), Au(0), Au(0)),
        inline_size: Au(0),
        min_inline_size: model::positive_length_percentage(content_width.min_width, cb_width),
        max_inline_size: model::max_size(content_width.max_width, cb_width),
        block_size: Au(0),
        min_block_size: Au(0),
        max_block_size: Au(i32::MAX),
        inset_sides: LayoutSideOffsets::new(Au(0), Au(0), Au(0), Au(0)),
        auto: AutoSizes::default(),
        position,
    };

    match model::length_percentage_auto(content_width.width, cb_width) {
        AuOrAuto::Auto => used.auto.insert(AutoSizes::INLINE_SIZE),
        AuOrAuto::Length(width) => used.inline_size = width.max(Au(0)),
    }
    match model::length_percentage_auto(horizontal.margin_left, cb_width) {
        AuOrAuto::Auto => used.auto.insert(AutoSizes::MARGIN_INLINE_START),
        AuOrAuto::Length(margin) => used.margin.left = margin,
    }
    match model::length_percentage_auto(horizontal.margin_right, cb_width) {
        AuOrAuto::Auto => used.auto.insert(AutoSizes::MARGIN_INLINE_END),
        AuOrAuto::Length(margin) => used.margin.right = margin,
    }

    // Block-axis margins never stay auto in normal flow (CSS 2.2 §10.6.3).
    used.margin.top = model::length_percentage_auto(vertical.margin_top, cb_width)
        .specified_or_zero();
    used.margin.bottom = model::length_percentage_auto(vertical.margin_bottom, cb_width)
        .specified_or_zero();

    // Heights: a percentage against an auto-height containing block
    // behaves as auto (or as no constraint, for min/max).
    match containing_block.block {
        Some(cb_height) => {
            match model::length_percentage_auto(content_height.height, cb_height) {
                AuOrAuto::Auto => used.auto.insert(AutoSizes::BLOCK_SIZE),
                AuOrAuto::Length(height) => used.block_size = height.max(Au(0)),
            }
            used.min_block_size =
                model::positive_length_percentage(content_height.min_height, cb_height);
            used.max_block_size = model::max_size(content_height.max_height, cb_height);
        },
        None => {
            match content_height.height {
                LengthPercentageAuto::Px(px) => used.block_size = model::positive_length(px),
                LengthPercentageAuto::Percentage(_) | LengthPercentageAuto::Auto => {
                    used.auto.insert(AutoSizes::BLOCK_SIZE)
                },
            }
            if let LengthPercentage::Px(px) = content_height.min_height {
                used.min_block_size = model::positive_length(px);
            }
            if let MaxSize::Px(px) = content_height.max_height {
                used.max_block_size = model::positive_length(px);
            }
        },
    }

    solve_insets(&mut used, &insets, containing_block);
    used
}

fn solve_insets(
    used: &mut BlockUsedSizes,
    insets: &Insets,
    containing_block: &ContainingBlockSize,
) {
    match used.position {
        Position::Static => {
            used.auto.insert(
                AutoSizes::INSET_LEFT |
                    AutoSizes::INSET_RIGHT |
                    AutoSizes::INSET_TOP |
                    AutoSizes::INSET_BOTTOM,
            );
        },
        Position::Relative => {
            let horizontal = |value, flag: AutoSizes, used: &mut BlockUsedSizes| {
                match model::length_percentage_auto(value, containing_block.inline) {
                    AuOrAuto::Auto => {
                        used.auto.insert(flag);
                        Au(0)
                    },
                    AuOrAuto::Length(v) => v,
                }
            };
            let left = horizontal(insets.left, AutoSizes::INSET_LEFT, used);
            let right = horizontal(insets.right, AutoSizes::INSET_RIGHT, used);
            used.inset_sides.left = left;
            used.inset_sides.right = right;

            let cb_height = containing_block.block;
            let vertical = |value, flag: AutoSizes, used: &mut BlockUsedSizes| match value {
                LengthPercentageAuto::Px(px) => model::length(px),
                LengthPercentageAuto::Percentage(p) => match cb_height {
                    Some(height) => model::percentage(p, height),
                    None => {
                        used.auto.insert(flag);
                        Au(0)
                    },
                },
                LengthPercentageAuto::Auto => {
                    used.auto.insert(flag);
                    Au(0)
                },
            };
            let top = vertical(insets.top, AutoSizes::INSET_TOP, used);
            let bottom = vertical(insets.bottom, AutoSizes::INSET_BOTTOM, used);
            used.inset_sides.top = top;
            used.inset_sides.bottom = bottom;
        },
        Position::Absolute | Position::Fixed | Position::Sticky => {
            unreachable!("out-of-flow positioning reached inset resolution")
        },
    }
}

/// What kind of stacking context the element's position and `z-index`
/// produce.
pub(crate) fn solve_stacking_context(
    position: Position,
    z_index: &ZIndex,
) -> StackingContextKind {
    match position {
        Position::Static => StackingContextKind::None,
        Position::Relative => match z_index.z_index {
            IntegerOrAuto::Integer(z) => StackingContextKind::Parentable(z),
            IntegerOrAuto::Auto => StackingContextKind::NonParentable(0),
        },
        Position::Absolute | Position::Fixed | Position::Sticky => {
            unreachable!("out-of-flow positioning reached stacking-context resolution")
        },
    }
}

/// CSS 2.2 §10.3.3.
/// Constraint equation: margin-left + width + margin-right = available,
/// where available = containing block width - (horizontal border + padding).
pub(crate) fn adjust_width_and_margins(used: &mut BlockUsedSizes, containing_block_width: Au) {
    use AuOrAuto::{Auto, Length as Specified};

    let available = containing_block_width - used.inline_edges();

    let (margin_start, inline_size, margin_end) = match (
        used.margin_inline_start(),
        used.inline_size(),
        used.margin_inline_end(),
    ) {
        // Over-constrained: the end margin absorbs the slack.
        (Specified(start), Specified(size), _) => (start, size, available - (start + size)),

        // Exactly one auto: solve for it.
        (Auto, Specified(size), Specified(end)) => (available - (size + end), size, end),

        // Width auto: it takes the slack; auto margins become zero.
        (Specified(start), Auto, Specified(end)) => (start, available - (start + end), end),
        (Auto, Auto, Specified(end)) => (Au(0), available - end, end),
        (Specified(start), Auto, Auto) => (start, available - start, Au(0)),
        (Auto, Auto, Auto) => (Au(0), available, Au(0)),

        // Both margins auto: split the slack, biasing the odd unit to the
        // end side.
        (Auto, Specified(size), Auto) => {
            let slack = available - size;
            let start = slack / 2;
            (start, size, slack - start)
        },
    };

    used.margin.left = margin_start;
    used.margin.right = margin_end;
    used.auto
        .remove(AutoSizes::MARGIN_INLINE_START | AutoSizes::MARGIN_INLINE_END);
    used.set_inline_size(model::clamp_size(
        inline_size,
        used.min_inline_size,
        used.max_inline_size,
    ));
}

/// The used height: an explicit height wins; otherwise the content height.
/// Either way the result is clamped (CSS 2.2 §10.7).
pub(crate) fn solve_used_height(used: &BlockUsedSizes, auto_height: Au) -> Au {
    let height = used.block_size().auto_is(|| auto_height);
    model::clamp_size(height, used.min_block_size, used.max_block_size)
}

/// Stacks the children of `index` vertically, each directly below the
/// previous one, and returns the resulting content-box height.
pub(crate) fn offset_child_blocks(subtree: &mut Subtree, index: usize) -> Au {
    let mut cursor = Au(0);
    let end = index + subtree.skip[index];
    let mut child = index + 1;
    while child < end {
        subtree.offset[child] = LayoutVector::new(Au(0), cursor);
        cursor += subtree.box_offsets[child].border_size.height +
            subtree.margins[child].vertical();
        child += subtree.skip[child];
    }
    cursor
}

/// Writes a block's final geometry into the subtree columns.
pub(crate) fn set_block_data(
    subtree: &mut Subtree,
    index: usize,
    used: &BlockUsedSizes,
    content_size: LayoutSize,
) {
    let border_pos = LayoutPoint::new(used.margin.left, used.margin.top);
    let border_size = LayoutSize::new(
        content_size.width + used.inline_edges(),
        content_size.height + used.block_edges(),
    );
    let content_pos = LayoutPoint::new(
        border_pos.x + used.border.left + used.padding.left,
        border_pos.y + used.border.top + used.padding.top,
    );
    subtree.box_offsets[index] = BoxOffsets {
        border_pos,
        border_size,
        content_pos,
        content_size,
    };
    subtree.borders[index] = used.border;
    subtree.margins[index] = used.margin;
    subtree.insets[index] = used.inset_vector();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes() -> BlockUsedSizes {
        BlockUsedSizes {
            border: LayoutSideOffsets::new(Au(0), Au(0), Au(0), Au(0)),
            padding: LayoutSideOffsets::new(Au(0), Au(0), Au(0), Au(0)),
            margin: LayoutSideOffsets::new(Au(0), Au(0), Au(0), Au(0)),
            inline_size: Au(0),
            min_inline_size: Au(0),
            max_inline_size: Au(i32::MAX),
            block_size: Au(0),
            min_block_size: Au(0),
            max_block_size: Au(i32::MAX),
            inset_sides: LayoutSideOffsets::new(Au(0), Au(0), Au(0), Au(0)),
            auto: AutoSizes::INLINE_SIZE |
                AutoSizes::MARGIN_INLINE_START |
                AutoSizes::MARGIN_INLINE_END |
                AutoSizes::BLOCK_SIZE,
            position: Position::Static,
        }
    }

    #[test]
    fn auto_width_takes_the_slack() {
        let mut used = sizes();
        adjust_width_and_margins(&mut used, Au(1000));
        assert_eq!(used.inline_size(), AuOrAuto::Length(Au(1000)));
        assert_eq!(used.margin.left, Au(0));
        assert_eq!(used.margin.right, Au(0));
    }

    #[test]
    fn auto_margins_center() {
        let mut used = sizes();
        used.set_inline_size(Au(400));
        adjust_width_and_margins(&mut used, Au(1000));
        assert_eq!(used.margin.left, Au(300));
        assert_eq!(used.margin.right, Au(300));
    }

    #[test]
    fn odd_slack_biases_the_end_margin() {
        let mut used = sizes();
        used.set_inline_size(Au(999));
        adjust_width_and_margins(&mut used, Au(1000));
        assert_eq!(used.margin.left, Au(0));
        assert_eq!(used.margin.right, Au(1));
    }

    #[test]
    fn over_constrained_discards_the_end_margin() {
        let mut used = sizes();
        used.set_inline_size(Au(500));
        used.auto
            .remove(AutoSizes::MARGIN_INLINE_START | AutoSizes::MARGIN_INLINE_END);
        used.margin.left = Au(100);
        used.margin.right = Au(100);
        adjust_width_and_margins(&mut used, Au(1000));
        assert_eq!(used.margin.left, Au(100));
        assert_eq!(used.margin.right, Au(400));
    }

    #[test]
    fn width_is_clamped_after_solving() {
        let mut used = sizes();
        used.max_inline_size = Au(300);
        adjust_width_and_margins(&mut used, Au(1000));
        assert_eq!(used.inline_size, Au(300));
    }

    #[test]
    fn explicit_height_wins() {
        let mut used = sizes();
        used.auto.remove(AutoSizes::BLOCK_SIZE);
        used.block_size = Au(700);
        assert_eq!(solve_used_height(&used, Au(100)), Au(700));

        let mut auto = sizes();
        auto.max_block_size = Au(50);
        assert_eq!(solve_used_height(&auto, Au(100)), Au(50));
    }

    #[test]
    fn relative_insets_prefer_the_explicit_side() {
        let mut used = sizes();
        used.position = Position::Relative;
        used.inset_sides = LayoutSideOffsets::new(Au(0), Au(30), Au(0), Au(0));
        used.auto.insert(
            AutoSizes::INSET_LEFT | AutoSizes::INSET_TOP | AutoSizes::INSET_BOTTOM,
        );
        assert_eq!(used.inset_vector(), LayoutVector::new(Au(-30), Au(0)));
    }
}
