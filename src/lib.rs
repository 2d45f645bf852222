//! Remote process memory introspection.
//!
//! Enumerates a foreign process's address space, scans byte ranges for
//! wildcard signatures, parses loaded PE images straight out of target
//! memory, and reconstructs C++ RTTI vtables from layout and
//! cross-references alone, with no symbols and no cooperation from the
//! target.
//!
//! All raw access goes through the [`provider::AddressSpaceProvider`] trait;
//! the crate ships a synthetic in-memory provider for tests and, on Windows,
//! a live-process provider over the Win32 virtual memory API. Every read is
//! a best-effort snapshot of an independently running target: there are no
//! transactional guarantees between two operations, and the layers above
//! treat transient unreadability as missing data rather than failure.

pub mod core;
pub mod image;
pub mod memory;
pub mod provider;
pub mod rtti;

// Re-export the main types at the crate root
pub use crate::core::types::{Address, MemoryError, MemoryRange, MemoryResult};
pub use crate::image::{ExportRecord, Module, SectionRecord};
pub use crate::memory::{
    scan_buffer, MemoryScanner, Pattern, Protection, Region, RegionIter, RegionKind, RegionState,
};
pub use crate::provider::{AddressSpaceProvider, BufferAddressSpace};
#[cfg(windows)]
pub use crate::provider::{ProcessAddressSpace, ProcessHandle};
pub use crate::rtti::{CompleteObjectLocator, ResolvedObject};
