//! Allocation cursor - hint-guided scan for the next free slot
//!
//! The scan runs forward from the hint to the end of the allocation range,
//! then wraps to the range start and stops at the hint. The bitmap is
//! searched a word at a time, so a dense prefix costs one compare per word.

use super::range::AllocRange;
use bitvec::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AllocCursor {
    hint: usize,
    range: AllocRange,
    /// Range was set by the owner rather than defaulted to the whole table
    restricted: bool,
}

impl AllocCursor {
    pub(crate) fn new(range: AllocRange) -> Self {
        Self { hint: range.start, range, restricted: false }
    }

    #[inline]
    pub(crate) fn hint(&self) -> usize {
        self.hint
    }

    #[inline]
    pub(crate) fn range(&self) -> AllocRange {
        self.range
    }

    /// Find a clear bit in the range without moving the hint
    pub(crate) fn find_free(&self, occupancy: &BitSlice) -> Option<usize> {
        let AllocRange { start, end } = self.range;
        let hint = self.hint;

        if let Some(offset) = occupancy[hint..end].first_zero() {
            return Some(hint + offset);
        }
        if hint == start {
            return None;
        }
        occupancy[start..hint].first_zero().map(|offset| start + offset)
    }

    /// Move the hint to `pos`, falling back to the range start when `pos`
    /// lies outside `[start, end]`
    #[inline]
    pub(crate) fn seek(&mut self, pos: usize) {
        self.hint = if pos >= self.range.start && pos <= self.range.end {
            pos
        } else {
            self.range.start
        };
    }

    /// Slot `index` was taken; continue after it
    #[inline]
    pub(crate) fn advance_past(&mut self, index: usize) {
        self.seek(index + 1);
    }

    /// Slot `index` was freed; try it first next time
    #[inline]
    pub(crate) fn rewind_to(&mut self, index: usize) {
        self.seek(index);
    }

    /// Replace the range and restart scanning at its start
    ///
    /// The range sticks across resizes: growing the table never widens it.
    pub(crate) fn restrict(&mut self, range: AllocRange) {
        self.range = range;
        self.hint = range.start;
        self.restricted = true;
    }

    /// Carry the cursor over to a table of `capacity` slots
    ///
    /// An unrestricted cursor follows the table size. A restricted one is
    /// only clipped, even when its range happened to cover the whole table.
    pub(crate) fn rebase(&mut self, capacity: usize) {
        let hint = self.hint;
        self.range = if self.restricted {
            self.range.clip(capacity)
        } else {
            AllocRange::full(capacity)
        };
        self.seek(hint);
    }
}
