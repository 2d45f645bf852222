//! Core module containing fundamental types for memsight
//!
//! This module provides the foundational building blocks used throughout
//! the crate, including address handling, range values and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{Address, MemoryError, MemoryRange, MemoryResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
