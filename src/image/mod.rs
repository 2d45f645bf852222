//! Loaded-image parsing
//!
//! Interprets the byte layout of an executable image mapped into a foreign
//! process: header chain validation, export directory and section table
//! decoding, and the module snapshot type tying them together.

pub mod exports;
pub mod headers;
pub mod module;
pub mod sections;

pub use exports::ExportRecord;
pub use headers::{DataDirectory, ImageHeaders};
pub use module::Module;
pub use sections::SectionRecord;
