/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The core of a CSS visual formatting engine.
//!
//! Given a styled element tree ([`dom::NodeTree`] with cascaded declarations
//! attached), a viewport, an image registry, and a font registry, a
//! [`Layout`] run produces a [`BoxTree`]: positioned and sized block boxes,
//! shaped inline content split into line boxes, and a stacking-context tree
//! fixing paint order.
//!
//! Layout is strictly single-threaded: one run borrows its environment
//! immutably, owns all intermediate state, and either returns a complete box
//! tree or an error with nothing observable left behind. The two recoverable
//! errors are allocation failure and id-width exhaustion; everything else
//! (unbalanced stacks, unsupported positioning schemes) is a contract
//! violation and panics.

use std::fmt;

use app_units::Au;
use fonts::FontStore;
use pixels::ImageStore;

mod background;
pub mod box_tree;
pub mod context;
mod cosmetic;
pub mod dom;
mod fallible;
mod flow;
pub mod geom;
pub mod model;
mod positioned;
mod stacking_context;
pub mod style;

pub use box_tree::BoxTree;

use context::LayoutContext;
use dom::NodeTree;
use flow::BoxGenerator;
use geom::LayoutSize;

/// The recoverable failures of a layout run. On error no partial box tree
/// is exposed; the caller may retry from scratch.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LayoutError {
    /// An allocation failed while growing the box tree or an engine stack.
    OutOfMemory,
    /// A subtree, IFC, stacking-context, inline-box, or block count
    /// overflowed the integer width of its id.
    SizeLimitExceeded,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::OutOfMemory => f.write_str("out of memory"),
            LayoutError::SizeLimitExceeded => f.write_str("box tree size limit exceeded"),
        }
    }
}

impl std::error::Error for LayoutError {}

/// One layout computation over one environment.
pub struct Layout<'a> {
    tree: &'a NodeTree,
    context: LayoutContext<'a>,
}

impl<'a> Layout<'a> {
    /// Prepares a layout of `tree` into a `width` x `height` pixel viewport.
    pub fn new(
        tree: &'a NodeTree,
        width: u32,
        height: u32,
        images: &'a ImageStore,
        fonts: &'a FontStore,
    ) -> Layout<'a> {
        let viewport = LayoutSize::new(Au::from_px(width as i32), Au::from_px(height as i32));
        Layout {
            tree,
            context: LayoutContext {
                viewport,
                images,
                fonts,
            },
        }
    }

    /// Runs the full pipeline: box generation, then the cosmetic pass.
    /// Deterministic: running twice over the same environment produces
    /// identical box trees.
    pub fn run(&self) -> Result<BoxTree, LayoutError> {
        let generator = BoxGenerator::new(self.tree, self.context.fonts, self.context.viewport);
        let mut boxes = generator.run()?;
        cosmetic::run_cosmetic_pass(
            self.tree,
            &mut boxes,
            self.context.images,
            self.context.viewport,
        )?;
        Ok(boxes)
    }
}
