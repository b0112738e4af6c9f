/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::{Deserialize, Serialize};

/// The id of a particular glyph within a font.
pub type GlyphId = u32;

/// A 26.6 fixed-point value: 64 units per pixel, the shaper's native
/// representation. Layout converts these to its own units at the boundary.
pub type Fixed = i32;

/// Horizontal extents of a single glyph, in 26.6 fixed point.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct GlyphExtents {
    /// Distance from the pen position to the glyph's leftmost ink.
    pub x_bearing: Fixed,
    /// Horizontal pen movement after drawing the glyph.
    pub h_advance: Fixed,
    /// Width of the glyph's ink.
    pub width: Fixed,
}

/// Font-wide vertical extents, in 26.6 fixed point.
///
/// `descender` is the distance from the baseline down to the lowest ink, as a
/// positive value, so that `ascender + descender` is the font's line height.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FontExtents {
    pub ascender: Fixed,
    pub descender: Fixed,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

/// An ISO 15924 script tag, e.g. `Latn`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Script(pub [u8; 4]);

impl Script {
    pub const LATIN: Script = Script(*b"Latn");
}

/// Per-run shaping parameters.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ShapingOptions {
    pub direction: Direction,
    pub script: Script,
    /// BCP 47 language tag.
    pub language: String,
}

impl Default for ShapingOptions {
    fn default() -> ShapingOptions {
        ShapingOptions {
            direction: Direction::LeftToRight,
            script: Script::LATIN,
            language: String::from("en"),
        }
    }
}

/// The shaping contract a registered font must satisfy.
///
/// Implementations are expected to be cheap to query repeatedly: layout asks
/// for glyph extents once per glyph in a separate metrics pass after shaping.
pub trait ShaperMethods {
    /// Shapes `text` and appends the resulting glyph ids, in visual order,
    /// to `glyphs`.
    fn shape_text(&self, text: &str, options: &ShapingOptions, glyphs: &mut Vec<GlyphId>);

    /// Horizontal extents of one glyph.
    fn glyph_extents(&self, glyph: GlyphId) -> GlyphExtents;

    /// Font-wide vertical extents.
    fn font_extents(&self) -> FontExtents;
}
