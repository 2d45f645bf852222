//! Address space providers
//!
//! The introspection core never talks to an operating system directly. All
//! raw access to the target goes through the [`AddressSpaceProvider`] trait:
//! a synchronous read/write/query/allocate/protect surface that the platform
//! layer implements. Every operation is a best-effort snapshot of an
//! independently running target; there is no transactional guarantee between
//! two calls.

mod buffer;
#[cfg(windows)]
mod windows;

pub use buffer::BufferAddressSpace;
#[cfg(windows)]
pub use windows::{ProcessAddressSpace, ProcessHandle};

use crate::core::types::{Address, MemoryResult};
use crate::memory::regions::{Protection, Region};

/// Raw, reentrant access to a target address space.
///
/// Implementations must be callable from multiple threads at once; the
/// library layers above impose no locking of their own.
pub trait AddressSpaceProvider: Send + Sync {
    /// Reads exactly `buffer.len()` bytes starting at `address`.
    fn read(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()>;

    /// Writes `data` at `address`, returning the number of bytes written.
    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<usize>;

    /// Returns the region containing `address`.
    ///
    /// An error means there is no region to report: the address is past the
    /// end of the target's space, or the target no longer exists. Region
    /// enumeration treats this as end-of-sequence.
    fn query_region(&self, address: Address) -> MemoryResult<Region>;

    /// Allocates `size` bytes of committed memory in the target.
    fn allocate(&self, size: u64, protection: Protection) -> MemoryResult<Address>;

    /// Changes the protection of `size` bytes at `address`, returning the
    /// previous flags.
    fn protect(&self, address: Address, size: u64, protection: Protection)
        -> MemoryResult<Protection>;

    /// Releases an allocation previously made with [`Self::allocate`].
    fn free(&self, address: Address) -> MemoryResult<()>;
}
