//! Memory region model for a foreign address space
//!
//! A region is a maximal contiguous span sharing state, type and protection,
//! as reported by the target's address space provider. Regions are produced
//! fresh on every query and never mutated.

use crate::core::types::{Address, MemoryRange};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Page protection attributes, encoded with the Windows `PAGE_*` values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Protection: u32 {
        const NO_ACCESS = 0x01;
        const READ_ONLY = 0x02;
        const READ_WRITE = 0x04;
        const WRITE_COPY = 0x08;
        const EXECUTE = 0x10;
        const EXECUTE_READ = 0x20;
        const EXECUTE_READ_WRITE = 0x40;
        const EXECUTE_WRITE_COPY = 0x80;
        const GUARD = 0x100;
        const NO_CACHE = 0x200;
        const WRITE_COMBINE = 0x400;
    }
}

impl Protection {
    /// True when pages with these attributes can be read at all
    pub fn is_readable(&self) -> bool {
        !self.contains(Protection::NO_ACCESS) && !self.contains(Protection::GUARD)
    }

    /// True when pages with these attributes can be written
    pub fn is_writable(&self) -> bool {
        self.intersects(
            Protection::READ_WRITE
                | Protection::WRITE_COPY
                | Protection::EXECUTE_READ_WRITE
                | Protection::EXECUTE_WRITE_COPY,
        )
    }

    /// True when pages with these attributes can be executed
    pub fn is_executable(&self) -> bool {
        self.intersects(
            Protection::EXECUTE
                | Protection::EXECUTE_READ
                | Protection::EXECUTE_READ_WRITE
                | Protection::EXECUTE_WRITE_COPY,
        )
    }
}

/// State of a memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionState {
    /// Memory is committed and backed
    Committed,
    /// Memory is reserved but not committed
    Reserved,
    /// Memory is free/unallocated
    Free,
}

/// Type of memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionKind {
    /// Private memory
    Private,
    /// Mapped memory (file mapping)
    Mapped,
    /// Image memory (executable or library)
    Image,
}

/// A snapshot of one region of the target's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Span covered by the region
    pub range: MemoryRange,
    /// Current state of the region
    pub state: RegionState,
    /// Type of the region
    pub kind: RegionKind,
    /// Protection flags for the region
    pub protection: Protection,
}

impl Region {
    /// Base address of the region
    pub fn base(&self) -> Address {
        self.range.base
    }

    /// Size of the region in bytes
    pub fn size(&self) -> u64 {
        self.range.size
    }

    /// First address past the region
    pub fn end(&self) -> Address {
        self.range.end()
    }

    /// True when the region is committed and its pages can be read
    pub fn is_readable(&self) -> bool {
        self.state == RegionState::Committed && self.protection.is_readable()
    }

    /// True when the region is committed and its pages can be written
    pub fn is_writable(&self) -> bool {
        self.state == RegionState::Committed && self.protection.is_writable()
    }

    /// True when the region is committed and its pages can be executed
    pub fn is_executable(&self) -> bool {
        self.state == RegionState::Committed && self.protection.is_executable()
    }

    /// True when the region carries the guard attribute
    pub fn is_guarded(&self) -> bool {
        self.protection.contains(Protection::GUARD)
    }

    /// Check if an address is within this region (upper bound exclusive)
    pub fn contains(&self, address: Address) -> bool {
        self.range.contains(address)
    }
}
