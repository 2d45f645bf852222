//! Core type definitions for memsight
//!
//! This module contains the fundamental types used throughout the crate:
//! address and range wrappers plus the error taxonomy.

mod address;
mod error;
mod range;

// Re-export all public types
pub use address::Address;
pub use error::{MemoryError, MemoryResult};
pub use range::MemoryRange;

// Common type aliases
pub type ProcessId = u32;
pub type Rva = u32;
