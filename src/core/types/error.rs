//! Custom error types for memsight

use super::address::Address;
use thiserror::Error;

/// Main error type for introspection operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Address space {operation} failed at {address}: OS error {code}")]
    AddressSpace {
        operation: &'static str,
        address: Address,
        code: u32,
    },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Failed to find export \"{name}\" in module \"{module}\"")]
    ExportNotFound { module: String, name: String },

    #[error("Failed to find section \"{name}\" in module \"{module}\"")]
    SectionNotFound { module: String, name: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

/// Result type alias for introspection operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates a provider failure for a read
    pub fn read_failed(address: Address, code: u32) -> Self {
        MemoryError::AddressSpace {
            operation: "read",
            address,
            code,
        }
    }

    /// Creates a provider failure for a write
    pub fn write_failed(address: Address, code: u32) -> Self {
        MemoryError::AddressSpace {
            operation: "write",
            address,
            code,
        }
    }

    /// Creates a provider failure for a region query
    pub fn query_failed(address: Address, code: u32) -> Self {
        MemoryError::AddressSpace {
            operation: "query",
            address,
            code,
        }
    }

    /// Creates an export lookup failure
    pub fn export_not_found(module: impl Into<String>, name: impl Into<String>) -> Self {
        MemoryError::ExportNotFound {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Creates a section lookup failure
    pub fn section_not_found(module: impl Into<String>, name: impl Into<String>) -> Self {
        MemoryError::SectionNotFound {
            module: module.into(),
            name: name.into(),
        }
    }
}
