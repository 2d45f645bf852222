//! Section table parsing and the section record type

use super::headers::{self, ImageHeaders, SECTION_HEADER_SIZE};
use crate::core::types::{Address, MemoryRange, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named, contiguous sub-range of a loaded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    /// Section name, truncated at the first NUL of its fixed-width field
    pub name: String,
    /// Absolute virtual address range the section occupies
    pub range: MemoryRange,
    /// Size the loader reserves for the section
    pub virtual_size: u32,
    /// Size of the section's initialized data in the file
    pub raw_size: u32,
}

impl SectionRecord {
    /// Base address of the section
    pub fn base(&self) -> Address {
        self.range.base
    }

    /// Effective size: the larger of raw and virtual size, guarding against
    /// zero-filled or packed sections
    pub fn size(&self) -> u64 {
        self.range.size
    }
}

impl fmt::Display for SectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.name, self.range)
    }
}

/// Walks the fixed-size section header array inside the header snapshot.
pub(crate) fn parse_section_table(
    snapshot: &[u8],
    image_headers: &ImageHeaders,
    image_base: Address,
) -> MemoryResult<Vec<SectionRecord>> {
    let mut sections = Vec::with_capacity(image_headers.number_of_sections as usize);

    for index in 0..image_headers.number_of_sections as usize {
        let entry = image_headers.section_table_offset + index * SECTION_HEADER_SIZE;

        let name_field = snapshot.get(entry..entry + 8).ok_or_else(|| {
            crate::core::types::MemoryError::InvalidImage(format!(
                "section header {} extends past the header snapshot",
                index
            ))
        })?;
        let name_len = name_field.iter().position(|&b| b == 0).unwrap_or(8);
        let name = String::from_utf8_lossy(&name_field[..name_len]).into_owned();

        let virtual_size = headers::read_u32(snapshot, entry + 8)?;
        let virtual_address = headers::read_u32(snapshot, entry + 12)?;
        let raw_size = headers::read_u32(snapshot, entry + 16)?;

        sections.push(SectionRecord {
            name,
            range: MemoryRange::new(
                image_base.saturating_add(virtual_address as u64),
                u64::from(raw_size.max(virtual_size)),
            ),
            virtual_size,
            raw_size,
        });
    }

    Ok(sections)
}
