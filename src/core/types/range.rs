//! Contiguous span of a foreign address space
//!
//! Modules, sections and regions all describe "some bytes at some address".
//! Rather than a common base type they each embed a [`MemoryRange`] value and
//! compose behavior on top of it.

use super::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous, half-open span `[base, base + size)` of a foreign address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRange {
    /// First address of the span
    pub base: Address,
    /// Length of the span in bytes
    pub size: u64,
}

impl MemoryRange {
    /// Creates a new range from a base address and a byte count
    pub const fn new(base: Address, size: u64) -> Self {
        MemoryRange { base, size }
    }

    /// First address past the end of the range (saturating at the top of the space)
    pub const fn end(&self) -> Address {
        self.base.saturating_add(self.size)
    }

    /// Checks if the range covers zero bytes
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Checks whether `address` lies within the range.
    ///
    /// The upper bound is exclusive: `base + size` is the first address that
    /// is *not* part of the range.
    pub fn contains(&self, address: Address) -> bool {
        address >= self.base && address < self.end()
    }

    /// Byte offset of `address` from the start of the range, if contained
    pub fn offset_of(&self, address: Address) -> Option<u64> {
        if self.contains(address) {
            address.checked_sub(self.base)
        } else {
            None
        }
    }

    /// The overlapping part of two ranges, `None` when they are disjoint
    pub fn intersect(&self, other: &MemoryRange) -> Option<MemoryRange> {
        let base = self.base.max(other.base);
        let end = self.end().min(other.end());
        let size = end.checked_sub(base)?;
        if size == 0 {
            return None;
        }
        Some(MemoryRange::new(base, size))
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} ({} bytes)", self.base, self.end(), self.size)
    }
}
