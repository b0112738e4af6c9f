/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pure conversion of specified values into used geometric quantities:
//! lengths, percentages, border widths, colors, and the used form of
//! `display`/`position` per CSS 2.2 §9.7.

use app_units::Au;
use log::warn;

use crate::geom::AuOrAuto;
use crate::style::properties::{
    BorderStyle, BorderWidth, BoxStyle, CssColor, Display, Float, LengthPercentage,
    LengthPercentageAuto, MaxSize, Position, Rgba,
};

/// `thin | medium | thick` border widths, in pixels.
pub const BORDER_THIN_PX: f32 = 1.0;
pub const BORDER_MEDIUM_PX: f32 = 3.0;
pub const BORDER_THICK_PX: f32 = 5.0;

/// Tab characters shape as this many spaces.
pub const TAB_SIZE: usize = 8;

/// A specified pixel length in layout units, rounded.
#[inline]
pub fn length(px: f32) -> Au {
    Au::from_f64_px(f64::from(px))
}

/// Like [`length`], but negative, subnormal, and non-finite inputs clamp
/// to zero.
#[inline]
pub fn positive_length(px: f32) -> Au {
    if px.is_normal() && px > 0.0 {
        length(px)
    } else {
        Au(0)
    }
}

/// A percentage (as a fraction) of `base`, rounded.
#[inline]
pub fn percentage(p: f32, base: Au) -> Au {
    base.scale_by(p)
}

/// Like [`percentage`], floored at zero.
#[inline]
pub fn positive_percentage(p: f32, base: Au) -> Au {
    percentage(p, base).max(Au(0))
}

/// Clamps `size` into `[min, max]`; `min` wins over `max` per CSS 2.2 §10.4.
#[inline]
pub fn clamp_size(size: Au, min: Au, max: Au) -> Au {
    size.min(max).max(min)
}

/// The used width of one border, given its style and specified width.
pub fn border_width(style: BorderStyle, width: BorderWidth) -> Au {
    match style {
        BorderStyle::None | BorderStyle::Hidden => Au(0),
        _ => match width {
            BorderWidth::Px(px) => positive_length(px),
            BorderWidth::Thin => length(BORDER_THIN_PX),
            BorderWidth::Medium => length(BORDER_MEDIUM_PX),
            BorderWidth::Thick => length(BORDER_THICK_PX),
        },
    }
}

/// Resolves a CSS color against the element's used `color`.
#[inline]
pub fn color(value: CssColor, current_color: Rgba) -> Rgba {
    match value {
        CssColor::Rgba(rgba) => rgba,
        CssColor::CurrentColor => current_color,
        CssColor::Transparent => Rgba::TRANSPARENT,
    }
}

/// A margin, width, or inset against its percentage base.
#[inline]
pub fn length_percentage_auto(value: LengthPercentageAuto, base: Au) -> AuOrAuto {
    match value {
        LengthPercentageAuto::Px(px) => AuOrAuto::Length(length(px)),
        LengthPercentageAuto::Percentage(p) => AuOrAuto::Length(percentage(p, base)),
        LengthPercentageAuto::Auto => AuOrAuto::Auto,
    }
}

/// A padding or min-size against its percentage base; never negative.
#[inline]
pub fn positive_length_percentage(value: LengthPercentage, base: Au) -> Au {
    match value {
        LengthPercentage::Px(px) => positive_length(px),
        LengthPercentage::Percentage(p) => positive_percentage(p, base),
    }
}

/// A max-size against its percentage base; `none` lifts the constraint.
#[inline]
pub fn max_size(value: MaxSize, base: Au) -> Au {
    match value {
        MaxSize::Px(px) => positive_length(px),
        MaxSize::Percentage(p) => positive_percentage(p, base),
        MaxSize::None => Au(i32::MAX),
    }
}

// ---------------------------------------------------------------------------
// Used `display` / `position` (CSS 2.2 §9.7).

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockInner {
    Flow,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InlineInner {
    /// Ordinary inline content.
    Inline,
    /// An inline-level block container (`display: inline-block`).
    Block(BlockInner),
}

/// The used outer display type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UsedDisplay {
    None,
    Block(BlockInner),
    Inline(InlineInner),
    Absolute(BlockInner),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UsedBoxStyle {
    pub display: UsedDisplay,
    pub position: Position,
}

/// Applies CSS 2.2 §9.7: `display: none` short-circuits; out-of-flow
/// positioning and the root element blockify the display type and clear
/// `float`.
pub fn box_style(specified: &BoxStyle, is_root: bool) -> UsedBoxStyle {
    if specified.display == Display::None {
        return UsedBoxStyle {
            display: UsedDisplay::None,
            position: Position::Static,
        };
    }

    let position = match specified.position {
        Position::Sticky => {
            warn!("position: sticky is unsupported; treating as static");
            Position::Static
        },
        position => position,
    };

    if matches!(position, Position::Absolute | Position::Fixed) {
        return UsedBoxStyle {
            display: UsedDisplay::Absolute(BlockInner::Flow),
            position,
        };
    }

    let display = if is_root {
        UsedDisplay::Block(BlockInner::Flow)
    } else {
        if specified.float != Float::None {
            warn!("float is unsupported; treating as none");
        }
        match specified.display {
            Display::Block => UsedDisplay::Block(BlockInner::Flow),
            Display::Inline => UsedDisplay::Inline(InlineInner::Inline),
            Display::InlineBlock => UsedDisplay::Inline(InlineInner::Block(BlockInner::Flow)),
            Display::None => unreachable!("handled above"),
        }
    };

    UsedBoxStyle { display, position }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_round_to_units() {
        assert_eq!(length(1.0), Au(60));
        assert_eq!(length(0.5), Au(30));
        assert_eq!(length(-2.0), Au(-120));
        assert_eq!(positive_length(-2.0), Au(0));
        assert_eq!(positive_length(f32::MIN_POSITIVE / 2.0), Au(0));
        assert_eq!(positive_length(f32::NAN), Au(0));
    }

    #[test]
    fn percentages() {
        assert_eq!(percentage(0.5, Au(100)), Au(50));
        assert_eq!(positive_percentage(-0.5, Au(100)), Au(0));
    }

    #[test]
    fn clamping() {
        assert_eq!(clamp_size(Au(5), Au(0), Au(10)), Au(5));
        assert_eq!(clamp_size(Au(-5), Au(0), Au(10)), Au(0));
        assert_eq!(clamp_size(Au(15), Au(0), Au(10)), Au(10));
        // min wins over max
        assert_eq!(clamp_size(Au(15), Au(12), Au(10)), Au(12));
    }

    #[test]
    fn border_widths() {
        assert_eq!(border_width(BorderStyle::Solid, BorderWidth::Thin), Au(60));
        assert_eq!(
            border_width(BorderStyle::Solid, BorderWidth::Medium),
            Au(180)
        );
        assert_eq!(
            border_width(BorderStyle::Solid, BorderWidth::Thick),
            Au(300)
        );
        assert_eq!(border_width(BorderStyle::None, BorderWidth::Thick), Au(0));
        assert_eq!(border_width(BorderStyle::Hidden, BorderWidth::Px(4.0)), Au(0));
    }

    #[test]
    fn colors() {
        let current = Rgba::new(1, 2, 3, 255);
        assert_eq!(color(CssColor::CurrentColor, current), current);
        assert_eq!(color(CssColor::Transparent, current), Rgba::TRANSPARENT);
        assert_eq!(
            color(CssColor::Rgba(Rgba::WHITE), current),
            Rgba::WHITE
        );
    }

    #[test]
    fn display_none_wins() {
        let specified = BoxStyle {
            display: Display::None,
            position: Position::Relative,
            float: Float::Left,
        };
        let used = box_style(&specified, false);
        assert_eq!(used.display, UsedDisplay::None);
        assert_eq!(used.position, Position::Static);
    }

    #[test]
    fn root_is_blockified() {
        let specified = BoxStyle {
            display: Display::InlineBlock,
            position: Position::Static,
            float: Float::None,
        };
        let used = box_style(&specified, true);
        assert_eq!(used.display, UsedDisplay::Block(BlockInner::Flow));
    }

    #[test]
    fn absolute_is_blockified() {
        let specified = BoxStyle {
            display: Display::Inline,
            position: Position::Absolute,
            float: Float::None,
        };
        let used = box_style(&specified, false);
        assert_eq!(used.display, UsedDisplay::Absolute(BlockInner::Flow));
        assert_eq!(used.position, Position::Absolute);
    }

    #[test]
    fn inline_block_keeps_inner_block() {
        let specified = BoxStyle {
            display: Display::InlineBlock,
            position: Position::Static,
            float: Float::None,
        };
        let used = box_style(&specified, false);
        assert_eq!(
            used.display,
            UsedDisplay::Inline(InlineInner::Block(BlockInner::Flow))
        );
    }
}
