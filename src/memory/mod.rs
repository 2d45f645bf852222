//! Memory introspection primitives
//!
//! This module provides the region model of a foreign address space, the
//! lazy region enumerator, and the wildcard pattern scanner that operates
//! over readable parts of a target range.

pub mod enumerator;
pub mod regions;
pub mod scanner;

pub use enumerator::RegionIter;
pub use regions::{Protection, Region, RegionKind, RegionState};
pub use scanner::{scan_buffer, MemoryScanner, Pattern};
