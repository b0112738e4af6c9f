/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::{Deserialize, Serialize};

use crate::font::ShaperMethods;

/// An opaque reference to a font registered in a [`FontStore`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct FontHandle(u32);

impl FontHandle {
    /// The "no font" sentinel. Text styled with this handle produces no
    /// glyphs and zero line metrics.
    pub const INVALID: FontHandle = FontHandle(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != FontHandle::INVALID
    }
}

/// The font registry handed to layout. Read-only for the engine's lifetime.
#[derive(Default)]
pub struct FontStore {
    fonts: Vec<Box<dyn ShaperMethods>>,
}

impl FontStore {
    pub fn new() -> FontStore {
        FontStore::default()
    }

    /// Registers a shaping-ready font and returns its handle.
    ///
    /// Panics if the store is full (the handle space reserves `u32::MAX` for
    /// [`FontHandle::INVALID`]).
    pub fn add_font(&mut self, font: Box<dyn ShaperMethods>) -> FontHandle {
        let index = self.fonts.len() as u32;
        assert!(index != u32::MAX, "font store is full");
        self.fonts.push(font);
        FontHandle(index)
    }

    /// Font matching is a stub: every query resolves to the first registered
    /// font, or to [`FontHandle::INVALID`] when the store is empty.
    pub fn query(&self) -> FontHandle {
        if self.fonts.is_empty() {
            FontHandle::INVALID
        } else {
            FontHandle(0)
        }
    }

    pub fn get(&self, handle: FontHandle) -> Option<&dyn ShaperMethods> {
        if !handle.is_valid() {
            return None;
        }
        self.fonts.get(handle.0 as usize).map(|font| &**font)
    }
}

impl std::fmt::Debug for FontStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontStore")
            .field("fonts", &self.fonts.len())
            .finish()
    }
}
