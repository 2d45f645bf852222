//! Bounds-checked decoding of a loaded image's header chain
//!
//! Everything here works on byte slices read out of the foreign process.
//! Fields are extracted as explicit little-endian reads with bounds checks;
//! a remote snapshot is never reinterpreted as a local structure, because it
//! carries no layout or alignment guarantee.

use crate::core::types::{MemoryError, MemoryResult};

/// Magic value of the legacy DOS header, `MZ`
pub const DOS_MAGIC: u16 = 0x5A4D;
/// Magic value of the extended NT headers, `PE\0\0`
pub const NT_MAGIC: u32 = 0x0000_4550;
/// Optional header magic for 32-bit images
pub const OPTIONAL_MAGIC_PE32: u16 = 0x010B;
/// Optional header magic for 64-bit images
pub const OPTIONAL_MAGIC_PE32_PLUS: u16 = 0x020B;

/// Offset of the extended-header offset field inside the DOS header
const DOS_LFANEW_OFFSET: usize = 0x3C;
/// Byte size of one section header entry
pub const SECTION_HEADER_SIZE: usize = 40;

/// Number of bytes of the image read at module construction; the header
/// chain and the section table must fit in this prefix
pub const HEADER_PAGE_SIZE: usize = 0x1000;

pub(crate) fn read_u16(buffer: &[u8], offset: usize) -> MemoryResult<u16> {
    let bytes = field(buffer, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32(buffer: &[u8], offset: usize) -> MemoryResult<u32> {
    let bytes = field(buffer, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn field(buffer: &[u8], offset: usize, width: usize) -> MemoryResult<&[u8]> {
    buffer
        .get(offset..offset + width)
        .ok_or_else(|| MemoryError::InvalidImage(format!(
            "header field at offset {:#x} extends past the {} byte snapshot",
            offset,
            buffer.len()
        )))
}

/// One data-directory entry of the extended header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataDirectory {
    /// RVA of the directory's data, zero when absent
    pub virtual_address: u32,
    /// Size of the directory's data in bytes
    pub size: u32,
}

impl DataDirectory {
    /// True when the image carries no data for this directory
    pub fn is_absent(&self) -> bool {
        self.virtual_address == 0
    }
}

/// Decoded metadata from the DOS and NT header chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeaders {
    /// Target machine identifier
    pub machine: u16,
    /// Number of entries in the section table
    pub number_of_sections: u16,
    /// Optional header magic (PE32 or PE32+)
    pub optional_magic: u16,
    /// RVA of the image entry point
    pub entry_point_rva: u32,
    /// Export data-directory entry
    pub export_directory: DataDirectory,
    /// Offset of the section table within the header snapshot
    pub section_table_offset: usize,
}

impl ImageHeaders {
    /// True for a 64-bit (PE32+) image
    pub fn is_64bit(&self) -> bool {
        self.optional_magic == OPTIONAL_MAGIC_PE32_PLUS
    }
}

/// Decodes the header chain from the image's first page.
///
/// Validates the DOS magic, follows the stored offset to the NT headers and
/// validates their magic, then extracts the fields the introspection layers
/// need. Fails with [`MemoryError::InvalidImage`] on any structural problem.
pub fn parse_headers(snapshot: &[u8]) -> MemoryResult<ImageHeaders> {
    let dos_magic = read_u16(snapshot, 0)?;
    if dos_magic != DOS_MAGIC {
        return Err(MemoryError::InvalidImage(format!(
            "bad DOS magic {:#06x}",
            dos_magic
        )));
    }

    let nt_offset = read_u32(snapshot, DOS_LFANEW_OFFSET)? as usize;
    let nt_magic = read_u32(snapshot, nt_offset)?;
    if nt_magic != NT_MAGIC {
        return Err(MemoryError::InvalidImage(format!(
            "bad NT magic {:#010x} at offset {:#x}",
            nt_magic, nt_offset
        )));
    }

    // IMAGE_FILE_HEADER immediately follows the NT signature.
    let file_header = nt_offset + 4;
    let machine = read_u16(snapshot, file_header)?;
    let number_of_sections = read_u16(snapshot, file_header + 2)?;
    let size_of_optional_header = read_u16(snapshot, file_header + 16)? as usize;

    let optional = file_header + 20;
    let optional_magic = read_u16(snapshot, optional)?;
    let directories_offset = match optional_magic {
        OPTIONAL_MAGIC_PE32 => optional + 96,
        OPTIONAL_MAGIC_PE32_PLUS => optional + 112,
        other => {
            return Err(MemoryError::InvalidImage(format!(
                "unknown optional header magic {:#06x}",
                other
            )))
        }
    };
    let entry_point_rva = read_u32(snapshot, optional + 16)?;

    let number_of_directories = read_u32(snapshot, directories_offset - 4)? as usize;
    let export_directory = if number_of_directories > 0 {
        DataDirectory {
            virtual_address: read_u32(snapshot, directories_offset)?,
            size: read_u32(snapshot, directories_offset + 4)?,
        }
    } else {
        DataDirectory::default()
    };

    Ok(ImageHeaders {
        machine,
        number_of_sections,
        optional_magic,
        entry_point_rva,
        export_directory,
        section_table_offset: optional + size_of_optional_header,
    })
}
