/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Containing blocks for absolutely-positioned descendants.
//!
//! Absolute and fixed positioning are unimplemented (the dispatcher panics
//! before reaching layout), but positioned ancestors are still tracked so
//! the stack discipline is in place. Entry storage is append-only: a
//! shrink-to-fit entry can be bound to its block after its scope has been
//! popped, mirroring the stacking-context hand-off.

use crate::LayoutError;
use crate::box_tree::BlockRef;
use crate::fallible::FallibleVec;

#[derive(Debug, Default)]
pub(crate) struct AbsoluteContainingBlocks {
    entries: Vec<Option<BlockRef>>,
    active: Vec<usize>,
}

impl AbsoluteContainingBlocks {
    pub fn push(&mut self, block: BlockRef) -> Result<usize, LayoutError> {
        let index = self.entries.len();
        self.entries.try_push(Some(block))?;
        self.active.try_push(index)?;
        Ok(index)
    }

    /// Opens an entry whose block box does not exist yet; shrink-to-fit
    /// realization fills it with [`set_block`](Self::set_block).
    pub fn push_without_block(&mut self) -> Result<usize, LayoutError> {
        let index = self.entries.len();
        self.entries.try_push(None)?;
        self.active.try_push(index)?;
        Ok(index)
    }

    pub fn set_block(&mut self, index: usize, block: BlockRef) {
        debug_assert!(self.entries[index].is_none());
        self.entries[index] = Some(block);
    }

    pub fn pop(&mut self) {
        self.active.pop().expect("pop with no containing block");
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Whether every entry ever opened received a block binding.
    #[cfg(debug_assertions)]
    pub fn fully_bound(&self) -> bool {
        self.entries.iter().all(Option::is_some)
    }
}
