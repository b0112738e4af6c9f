/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The default [`ShaperMethods`] backend, built on `rustybuzz`.

use std::str::FromStr;

use log::warn;
use rustybuzz::ttf_parser;
use rustybuzz::{Face, Language, UnicodeBuffer};

use crate::font::{
    Direction, Fixed, FontExtents, GlyphExtents, GlyphId, ShaperMethods, ShapingOptions,
};

/// A shaping-ready font: raw font bytes plus a pixel size.
///
/// `rustybuzz::Face` borrows the font data, so the face is rebuilt per query
/// rather than stored; face construction only indexes the table directory.
pub struct Shaper {
    data: Vec<u8>,
    index: u32,
    size_px: f32,
}

impl Shaper {
    /// Wraps raw font bytes (`index` selects a face within a collection).
    /// Returns `None` if the data does not parse as a font.
    pub fn new(data: Vec<u8>, index: u32, size_px: f32) -> Option<Shaper> {
        if Face::from_slice(&data, index).is_none() {
            warn!("font data failed to parse; face index {}", index);
            return None;
        }
        Some(Shaper {
            data,
            index,
            size_px,
        })
    }

    fn face(&self) -> Face<'_> {
        // Validated in `new`.
        Face::from_slice(&self.data, self.index).expect("font data no longer parses")
    }

    /// Font units -> 26.6 fixed point at the shaper's pixel size.
    fn to_fixed(&self, face: &Face<'_>, value: f32) -> Fixed {
        let upem = face.units_per_em() as f32;
        (value * self.size_px * 64.0 / upem).round() as Fixed
    }
}

impl ShaperMethods for Shaper {
    fn shape_text(&self, text: &str, options: &ShapingOptions, glyphs: &mut Vec<GlyphId>) {
        let face = self.face();

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.set_direction(match options.direction {
            Direction::LeftToRight => rustybuzz::Direction::LeftToRight,
            Direction::RightToLeft => rustybuzz::Direction::RightToLeft,
        });
        let script_tag = ttf_parser::Tag::from_bytes(&options.script.0);
        if let Some(script) = rustybuzz::Script::from_iso15924_tag(script_tag) {
            buffer.set_script(script);
        }
        if let Ok(language) = Language::from_str(&options.language) {
            buffer.set_language(language);
        }

        let shaped = rustybuzz::shape(&face, &[], buffer);
        glyphs.extend(shaped.glyph_infos().iter().map(|info| info.glyph_id));
    }

    fn glyph_extents(&self, glyph: GlyphId) -> GlyphExtents {
        let face = self.face();
        let id = ttf_parser::GlyphId(glyph as u16);

        let h_advance = face.glyph_hor_advance(id).unwrap_or(0);
        let (x_bearing, width) = match face.glyph_bounding_box(id) {
            Some(bbox) => (bbox.x_min, bbox.width()),
            None => (0, 0),
        };

        GlyphExtents {
            x_bearing: self.to_fixed(&face, f32::from(x_bearing)),
            h_advance: self.to_fixed(&face, f32::from(h_advance)),
            width: self.to_fixed(&face, f32::from(width)),
        }
    }

    fn font_extents(&self) -> FontExtents {
        let face = self.face();
        FontExtents {
            ascender: self.to_fixed(&face, f32::from(face.ascender())),
            // ttf ascender/descender are signed distances from the baseline;
            // the contract wants the descender as a positive depth.
            descender: self.to_fixed(&face, f32::from(-face.descender())),
        }
    }
}

impl std::fmt::Debug for Shaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shaper")
            .field("index", &self.index)
            .field("size_px", &self.size_px)
            .finish()
    }
}
