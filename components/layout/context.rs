/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Data shared by every stage of a layout run.

use fonts::FontStore;
use pixels::ImageStore;

use crate::geom::LayoutSize;

/// The read-only environment of one layout run. The registries are borrowed
/// for the run's lifetime and never mutated by the engine.
pub struct LayoutContext<'a> {
    /// The viewport, in layout units.
    pub viewport: LayoutSize,
    pub images: &'a ImageStore,
    pub fonts: &'a FontStore,
}
