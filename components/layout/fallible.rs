/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Fallible growth for the collections that back the box tree.
//!
//! Every output collection and engine stack grows through these methods so
//! that allocation failure surfaces as [`LayoutError::OutOfMemory`] instead
//! of aborting; `Layout::run` unwinds cleanly and the caller may retry.

use smallvec::{Array, SmallVec};

use crate::LayoutError;

pub(crate) trait FallibleVec<T> {
    /// Appends `value`, reporting allocation failure instead of aborting.
    fn try_push(&mut self, value: T) -> Result<(), LayoutError>;

    /// Inserts `value` at `index`, reporting allocation failure instead of
    /// aborting.
    fn try_insert(&mut self, index: usize, value: T) -> Result<(), LayoutError>;
}

impl<T> FallibleVec<T> for Vec<T> {
    #[inline]
    fn try_push(&mut self, value: T) -> Result<(), LayoutError> {
        self.try_reserve(1).map_err(|_| LayoutError::OutOfMemory)?;
        self.push(value);
        Ok(())
    }

    #[inline]
    fn try_insert(&mut self, index: usize, value: T) -> Result<(), LayoutError> {
        self.try_reserve(1).map_err(|_| LayoutError::OutOfMemory)?;
        self.insert(index, value);
        Ok(())
    }
}

impl<A: Array> FallibleVec<A::Item> for SmallVec<A> {
    #[inline]
    fn try_push(&mut self, value: A::Item) -> Result<(), LayoutError> {
        self.try_reserve(1).map_err(|_| LayoutError::OutOfMemory)?;
        self.push(value);
        Ok(())
    }

    #[inline]
    fn try_insert(&mut self, index: usize, value: A::Item) -> Result<(), LayoutError> {
        self.try_reserve(1).map_err(|_| LayoutError::OutOfMemory)?;
        self.insert(index, value);
        Ok(())
    }
}
