//! Range restrictor - the window automatic allocation may use

use crate::errors::{TableError, TableResult};
use serde::Serialize;

/// Half-open window `[start, end)` of slots open to automatic allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocRange {
    pub start: usize,
    pub end: usize,
}

impl AllocRange {
    #[inline]
    pub const fn full(capacity: usize) -> Self {
        Self { start: 0, end: capacity }
    }

    /// Validate `[offset, offset + len)` against `capacity`
    pub fn new(offset: usize, len: usize, capacity: usize) -> TableResult<Self> {
        let invalid = TableError::InvalidRange { offset, len, capacity };
        let end = offset.checked_add(len).ok_or(invalid)?;
        if end > capacity {
            return Err(invalid);
        }
        Ok(Self { start: offset, end })
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub const fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// Clip to a table of `capacity` slots; never widens
    pub fn clip(self, capacity: usize) -> Self {
        let end = self.end.min(capacity);
        Self { start: self.start.min(end), end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_within_capacity() {
        let range = AllocRange::new(4, 4, 8).expect("fits");
        assert_eq!(range, AllocRange { start: 4, end: 8 });
        assert_eq!(range.len(), 4);
        assert!(range.contains(4));
        assert!(!range.contains(8));
    }

    #[test]
    fn range_past_capacity_rejected() {
        let err = AllocRange::new(6, 4, 8).unwrap_err();
        assert_eq!(err, TableError::InvalidRange { offset: 6, len: 4, capacity: 8 });
    }

    #[test]
    fn overflowing_range_rejected() {
        assert!(AllocRange::new(usize::MAX, 2, 8).is_err());
    }

    #[test]
    fn empty_range_is_valid() {
        let range = AllocRange::new(8, 0, 8).expect("empty at end");
        assert!(range.is_empty());
    }

    #[test]
    fn clip_only_narrows() {
        let range = AllocRange { start: 4, end: 12 };
        assert_eq!(range.clip(32), range);
        assert_eq!(range.clip(8), AllocRange { start: 4, end: 8 });
        assert_eq!(range.clip(2), AllocRange { start: 2, end: 2 });
        assert_eq!(AllocRange::full(8).clip(16), AllocRange::full(8));
    }
}
