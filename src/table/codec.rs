//! Flag codec - reference and hint flags packed into one word
//!
//! Design: references are at least 4-byte aligned, so the two low address
//! bits are always zero and carry the flags instead. One load of the slot
//! word yields both the identity and the fast-path hints.

use crate::errors::{TableError, TableResult};
use std::fmt;

bitflags::bitflags! {
    /// Per-slot fast-path hints, fixed at install time
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileFlags: usize {
        /// Resource supports non-blocking issue
        const NOWAIT = 0x1;
        /// Backing object is a regular file
        const REGULAR = 0x2;
    }
}

impl FileFlags {
    /// Every flag bit
    pub const MASK: usize = Self::all().bits();
}

/// Encoded slot word: reference address | flag bits. Zero means empty.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct EncodedSlot(usize);

// Flag bits must fit under the alignment of a pointer-sized value
const _: () = assert!(core::mem::align_of::<usize>() > FileFlags::MASK);

impl EncodedSlot {
    pub const EMPTY: Self = Self(0);

    /// Pack `ptr` with `flags`
    ///
    /// Fails if the address has any of the flag bits set.
    #[inline]
    pub fn encode<T>(ptr: *const T, flags: FileFlags) -> TableResult<Self> {
        let addr = ptr as usize;
        if addr & FileFlags::MASK != 0 {
            return Err(TableError::MisalignedReference { addr });
        }
        Ok(Self(addr | flags.bits()))
    }

    /// Unpack into reference and flags
    #[inline(always)]
    pub fn decode<T>(self) -> (*const T, FileFlags) {
        (self.ptr(), self.flags())
    }

    #[inline(always)]
    pub fn ptr<T>(self) -> *const T {
        (self.0 & !FileFlags::MASK) as *const T
    }

    #[inline(always)]
    pub fn flags(self) -> FileFlags {
        FileFlags::from_bits_truncate(self.0)
    }

    #[inline(always)]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Debug for EncodedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "EncodedSlot(empty)");
        }
        f.debug_struct("EncodedSlot")
            .field("addr", &format_args!("{:#x}", self.0 & !FileFlags::MASK))
            .field("flags", &self.flags())
            .finish()
    }
}
