//! Export directory parsing and the export record type

use super::headers;
use crate::core::types::{Address, MemoryResult, Rva};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

// Field offsets within IMAGE_EXPORT_DIRECTORY.
const NUMBER_OF_NAMES: usize = 24;
const ADDRESS_OF_FUNCTIONS: usize = 28;
const ADDRESS_OF_NAMES: usize = 32;
const ADDRESS_OF_NAME_ORDINALS: usize = 36;
const DIRECTORY_HEADER_SIZE: usize = 40;

/// A named entry point of a module, derived from one snapshot of its export
/// directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Export name
    pub name: String,
    /// Ordinal index into the function table
    pub ordinal: u16,
    /// Address of the export relative to the module base
    pub rva: Rva,
    /// Absolute address of the export
    pub address: Address,
}

impl fmt::Display for ExportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ordinal {}) -> {:X}", self.name, self.ordinal, self.address)
    }
}

/// Decodes an export directory snapshot into export records.
///
/// `directory` holds exactly the bytes of the export data directory;
/// `directory_va` is its RVA, used to rebase the RVAs the tables contain.
/// Entries whose tables point outside the snapshot are skipped rather than
/// failing the whole parse, since the target may have been mid-update.
pub(crate) fn parse_export_directory(
    directory: &[u8],
    directory_va: u32,
    image_base: Address,
) -> MemoryResult<Vec<ExportRecord>> {
    if directory.len() < DIRECTORY_HEADER_SIZE {
        return Err(crate::core::types::MemoryError::InvalidImage(format!(
            "export directory of {} bytes is too small",
            directory.len()
        )));
    }

    let number_of_names = headers::read_u32(directory, NUMBER_OF_NAMES)?;
    let functions_rva = headers::read_u32(directory, ADDRESS_OF_FUNCTIONS)?;
    let names_rva = headers::read_u32(directory, ADDRESS_OF_NAMES)?;
    let ordinals_rva = headers::read_u32(directory, ADDRESS_OF_NAME_ORDINALS)?;

    // All three tables are addressed relative to the directory itself.
    let to_offset = |rva: u32| rva.checked_sub(directory_va).map(|o| o as usize);
    let (Some(names), Some(ordinals), Some(functions)) = (
        to_offset(names_rva),
        to_offset(ordinals_rva),
        to_offset(functions_rva),
    ) else {
        trace!("export tables precede the directory, treating as empty");
        return Ok(Vec::new());
    };

    // The count is foreign data; cap it at what the name table inside the
    // snapshot can actually hold before allocating or iterating.
    let capacity = directory.len().saturating_sub(names) / 4;
    let count = (number_of_names as usize).min(capacity);
    if count < number_of_names as usize {
        trace!(
            claimed = number_of_names,
            count,
            "name count exceeds snapshot, clamping"
        );
    }

    let mut exports = Vec::with_capacity(count);
    for index in 0..count {
        let Ok(name_rva) = headers::read_u32(directory, names + index * 4) else {
            trace!(index, "name table entry outside snapshot, skipping");
            continue;
        };
        let Ok(ordinal) = headers::read_u16(directory, ordinals + index * 2) else {
            trace!(index, "ordinal table entry outside snapshot, skipping");
            continue;
        };
        let Ok(rva) = headers::read_u32(directory, functions + ordinal as usize * 4) else {
            trace!(index, ordinal, "function table entry outside snapshot, skipping");
            continue;
        };
        let Some(name) = read_name(directory, to_offset(name_rva)) else {
            trace!(index, "export name outside snapshot, skipping");
            continue;
        };

        exports.push(ExportRecord {
            name,
            ordinal,
            rva,
            address: image_base.saturating_add(rva as u64),
        });
    }

    Ok(exports)
}

fn read_name(directory: &[u8], offset: Option<usize>) -> Option<String> {
    let offset = offset?;
    let tail = directory.get(offset..)?;
    let len = tail.iter().position(|&b| b == 0)?;
    Some(String::from_utf8_lossy(&tail[..len]).into_owned())
}
