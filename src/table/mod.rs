//! Fixed file table - index-addressed slots for shared resources
//!
//! Design: three parts kept in lock-step:
//! 1. Slot words (reference | flags, see `codec`)
//! 2. Occupancy bitmap (one bit per slot)
//! 3. Allocation cursor (hint + restricted range)
//!
//! The table does no locking of its own. Mutation takes `&mut self`, lookups
//! take `&self`, and the owner decides how the two are serialised.
//! Stored references are `Arc<F>` strong counts held by the table until
//! `remove` hands them back or the table is dropped.

mod codec;
mod cursor;
mod range;


pub use codec::{EncodedSlot, FileFlags};
pub use range::AllocRange;

use crate::errors::{TableError, TableResult};
use bitvec::prelude::*;
use cursor::AllocCursor;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct FileTable<F> {
    slots: Box<[EncodedSlot]>,
    occupancy: BitVec<usize, Lsb0>,
    cursor: AllocCursor,
    _owns: PhantomData<Arc<F>>,
}

impl<F> FileTable<F> {
    /// Create a table of `capacity` empty slots
    pub fn create(capacity: usize) -> TableResult<Self> {
        Ok(Self {
            slots: alloc_slots(capacity)?,
            occupancy: alloc_bitmap(capacity)?,
            cursor: AllocCursor::new(AllocRange::full(capacity)),
            _owns: PhantomData,
        })
    }

    /// Tear down a table whose owner has already emptied it
    pub fn destroy(self) {
        debug_assert!(
            self.is_empty(),
            "destroying file table with {} occupied slots",
            self.len()
        );
        drop(self);
    }

    /// Reallocate to `new_capacity` slots
    ///
    /// Slots below `min(capacity, new_capacity)` are preserved. Shrinking
    /// past an occupied slot fails with `InvalidRange` and changes nothing.
    pub fn resize(&mut self, new_capacity: usize) -> TableResult<()> {
        let old_capacity = self.capacity();
        if new_capacity < old_capacity {
            if let Some(index) = self.occupancy[new_capacity..].first_one() {
                return Err(TableError::InvalidRange {
                    offset: new_capacity + index,
                    len: 1,
                    capacity: new_capacity,
                });
            }
        }

        let keep = old_capacity.min(new_capacity);
        let mut slots = alloc_slots(new_capacity)?;
        let mut occupancy = alloc_bitmap(new_capacity)?;
        slots[..keep].copy_from_slice(&self.slots[..keep]);
        occupancy[..keep].copy_from_bitslice(&self.occupancy[..keep]);

        self.slots = slots;
        self.occupancy = occupancy;
        self.cursor.rebase(new_capacity);
        Ok(())
    }

    /// Restrict automatic allocation to `[offset, offset + len)`
    pub fn set_alloc_range(&mut self, offset: usize, len: usize) -> TableResult<()> {
        let range = AllocRange::new(offset, len, self.capacity())?;
        self.cursor.restrict(range);
        Ok(())
    }

    /// Install `file` at a caller-chosen slot
    ///
    /// On any error the table is unchanged and `file` is dropped.
    pub fn install_explicit(&mut self, index: usize, file: Arc<F>, flags: FileFlags) -> TableResult<()> {
        if index >= self.capacity() {
            return Err(TableError::InvalidRange { offset: index, len: 1, capacity: self.capacity() });
        }
        if self.occupancy[index] {
            return Err(TableError::AlreadyOccupied { index });
        }
        self.store(index, file, flags)
    }

    /// Install `file` at the next free slot in the allocation range
    pub fn install_auto(&mut self, file: Arc<F>, flags: FileFlags) -> TableResult<usize> {
        let index = self.cursor.find_free(&self.occupancy).ok_or(TableError::NoSpace)?;
        self.store(index, file, flags)?;
        Ok(index)
    }

    /// Take the reference out of slot `index`
    pub fn remove(&mut self, index: usize) -> TableResult<Arc<F>> {
        if !self.is_occupied(index) {
            return Err(TableError::NotFound { index });
        }
        let slot = std::mem::replace(&mut self.slots[index], EncodedSlot::EMPTY);
        self.occupancy.set(index, false);
        self.cursor.rewind_to(index);

        // Safety: occupied slots hold a pointer produced by Arc::into_raw in
        // `store`; ownership of that strong count moves back to the caller.
        Ok(unsafe { Arc::from_raw(slot.ptr::<F>()) })
    }

    /// Look up slot `index` (hot path, no mutation)
    #[inline]
    pub fn resolve(&self, index: usize) -> TableResult<(&F, FileFlags)> {
        if !self.is_occupied(index) {
            return Err(TableError::NotFound { index });
        }
        let (ptr, flags) = self.slots[index].decode::<F>();

        // Safety: the table holds a strong count for every occupied slot and
        // removal needs `&mut self`, so the pointee outlives this borrow.
        Ok((unsafe { &*ptr }, flags))
    }

    /// Like `resolve`, but hands out a new strong reference
    pub fn get(&self, index: usize) -> TableResult<(Arc<F>, FileFlags)> {
        if !self.is_occupied(index) {
            return Err(TableError::NotFound { index });
        }
        let (ptr, flags) = self.slots[index].decode::<F>();

        // Safety: `ptr` came from Arc::into_raw and the table's own count
        // keeps it alive while we add one for the caller.
        let file = unsafe {
            Arc::increment_strong_count(ptr);
            Arc::from_raw(ptr)
        };
        Ok((file, flags))
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.occupancy.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy.not_any()
    }

    #[inline]
    pub fn is_occupied(&self, index: usize) -> bool {
        index < self.capacity() && self.occupancy[index]
    }

    pub fn alloc_range(&self) -> AllocRange {
        self.cursor.range()
    }

    pub fn alloc_hint(&self) -> usize {
        self.cursor.hint()
    }

    /// Indices of occupied slots in ascending order
    pub fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        self.occupancy.iter_ones()
    }

    /// Snapshot for monitoring and debugging
    pub fn stats(&self) -> TableStats {
        let range = self.alloc_range();
        TableStats {
            capacity: self.capacity(),
            occupied: self.len(),
            alloc_range: range,
            alloc_hint: self.alloc_hint(),
            range_free: self.occupancy[range.start..range.end].count_zeros(),
        }
    }

    fn store(&mut self, index: usize, file: Arc<F>, flags: FileFlags) -> TableResult<()> {
        let ptr = Arc::into_raw(file);
        let slot = match EncodedSlot::encode(ptr, flags) {
            Ok(slot) => slot,
            Err(err) => {
                // Safety: `ptr` came from Arc::into_raw just above and was
                // never stored, so its count is handed straight back.
                drop(unsafe { Arc::from_raw(ptr) });
                return Err(err);
            }
        };
        // The slot now owns the count until `remove` or Drop.

        debug_assert!(!self.occupancy[index], "slot {} already set", index);
        self.slots[index] = slot;
        self.occupancy.set(index, true);
        self.cursor.advance_past(index);
        Ok(())
    }
}

impl<F> Drop for FileTable<F> {
    fn drop(&mut self) {
        for index in self.occupancy.iter_ones() {
            // Safety: see `remove`; each occupied slot owns one strong count.
            unsafe { drop(Arc::from_raw(self.slots[index].ptr::<F>())) };
        }
    }
}

impl<F> std::fmt::Debug for FileTable<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTable")
            .field("capacity", &self.capacity())
            .field("occupied", &self.len())
            .field("alloc_range", &self.alloc_range())
            .field("alloc_hint", &self.alloc_hint())
            .finish()
    }
}

/// Table statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub capacity: usize,
    pub occupied: usize,
    pub alloc_range: AllocRange,
    pub alloc_hint: usize,
    /// Free slots remaining inside the allocation range
    pub range_free: usize,
}

fn alloc_slots(capacity: usize) -> TableResult<Box<[EncodedSlot]>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| TableError::OutOfMemory { requested: capacity })?;
    slots.resize(capacity, EncodedSlot::EMPTY);
    Ok(slots.into_boxed_slice())
}

fn alloc_bitmap(capacity: usize) -> TableResult<BitVec<usize, Lsb0>> {
    let words = capacity.div_ceil(usize::BITS as usize);
    let mut raw: Vec<usize> = Vec::new();
    raw.try_reserve_exact(words)
        .map_err(|_| TableError::OutOfMemory { requested: capacity })?;
    raw.resize(words, 0);

    let mut bits = BitVec::from_vec(raw);
    bits.truncate(capacity);
    Ok(bits)
}
