/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The shaping contract between layout and its text shaper.
//!
//! Layout does not shape text itself; it talks to a font through the
//! [`ShaperMethods`] trait and stores fonts behind opaque [`FontHandle`]s in
//! a [`FontStore`]. The trait's vocabulary is HarfBuzz's: glyph ids, per-glyph
//! horizontal extents, and font-wide extents, all in 26.6 fixed point. The
//! default backend ([`Shaper`]) implements the contract with `rustybuzz`,
//! HarfBuzz's Rust port.

mod font;
mod font_store;
mod shapers;

pub use font::{
    Direction, FontExtents, Fixed, GlyphExtents, GlyphId, Script, ShaperMethods, ShapingOptions,
};
pub use font_store::{FontHandle, FontStore};
pub use shapers::Shaper;
