/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Geometry aliases and small helpers over `Au`.

use app_units::Au;

pub type LayoutPoint = euclid::default::Point2D<Au>;
pub type LayoutSize = euclid::default::Size2D<Au>;
pub type LayoutVector = euclid::default::Vector2D<Au>;
pub type LayoutRect = euclid::default::Rect<Au>;

/// Per-side `Au` values (borders, padding, margins, insets), in
/// top/right/bottom/left order.
pub type LayoutSideOffsets = euclid::default::SideOffsets2D<Au>;

pub fn zero_point() -> LayoutPoint {
    LayoutPoint::new(Au(0), Au(0))
}

pub fn zero_size() -> LayoutSize {
    LayoutSize::new(Au(0), Au(0))
}

pub fn zero_vector() -> LayoutVector {
    LayoutVector::new(Au(0), Au(0))
}

pub fn zero_rect() -> LayoutRect {
    LayoutRect::new(zero_point(), zero_size())
}

pub fn zero_side_offsets() -> LayoutSideOffsets {
    LayoutSideOffsets::new(Au(0), Au(0), Au(0), Au(0))
}

/// An `Au` or the CSS keyword `auto`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuOrAuto {
    Auto,
    Length(Au),
}

impl AuOrAuto {
    #[inline]
    pub fn is_auto(self) -> bool {
        matches!(self, AuOrAuto::Auto)
    }

    #[inline]
    pub fn non_auto(self) -> Option<Au> {
        match self {
            AuOrAuto::Auto => None,
            AuOrAuto::Length(value) => Some(value),
        }
    }

    #[inline]
    pub fn auto_is(self, f: impl FnOnce() -> Au) -> Au {
        match self {
            AuOrAuto::Auto => f(),
            AuOrAuto::Length(value) => value,
        }
    }

    #[inline]
    pub fn specified_or_zero(self) -> Au {
        self.auto_is(|| Au(0))
    }
}

/// Converts a 26.6 fixed-point value (the shaper's representation) to `Au`.
#[inline]
pub fn fixed_to_au(value: fonts::Fixed) -> Au {
    Au::from_f64_px(f64::from(value) / 64.0)
}
