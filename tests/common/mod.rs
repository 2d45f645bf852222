//! Shared builders for synthetic PE images mapped into a `BufferAddressSpace`

#![allow(dead_code)]

use memsight::{Address, BufferAddressSpace, Protection};
use tracing_subscriber::EnvFilter;

/// Installs a trace subscriber honoring `RUST_LOG`, writing through the test
/// harness. Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Base address the synthetic images are mapped at
pub const IMAGE_BASE: u64 = 0x1_4000_0000;

/// Offset of the NT headers inside the synthetic header page
pub const NT_OFFSET: usize = 0x100;

const DOS_MAGIC: u16 = 0x5A4D;
const NT_MAGIC: u32 = 0x0000_4550;
const OPTIONAL_MAGIC_PE32_PLUS: u16 = 0x020B;
const OPTIONAL_HEADER_SIZE: u16 = 240;

/// Builds a PE32+ header page.
///
/// `sections` lists `(name, virtual_address, size)` entries (raw and virtual
/// size set equal); `export` is the export data-directory entry as
/// `(virtual_address, size)`.
pub fn build_header_page(sections: &[(&str, u32, u32)], export: Option<(u32, u32)>) -> Vec<u8> {
    let mut page = vec![0u8; 0x1000];
    page[0..2].copy_from_slice(&DOS_MAGIC.to_le_bytes());
    page[0x3C..0x40].copy_from_slice(&(NT_OFFSET as u32).to_le_bytes());

    let nt = NT_OFFSET;
    page[nt..nt + 4].copy_from_slice(&NT_MAGIC.to_le_bytes());

    let file_header = nt + 4;
    page[file_header..file_header + 2].copy_from_slice(&0x8664u16.to_le_bytes()); // AMD64
    page[file_header + 2..file_header + 4]
        .copy_from_slice(&(sections.len() as u16).to_le_bytes());
    page[file_header + 16..file_header + 18].copy_from_slice(&OPTIONAL_HEADER_SIZE.to_le_bytes());

    let optional = file_header + 20;
    page[optional..optional + 2].copy_from_slice(&OPTIONAL_MAGIC_PE32_PLUS.to_le_bytes());
    page[optional + 16..optional + 20].copy_from_slice(&0x1000u32.to_le_bytes()); // entry point RVA
    page[optional + 108..optional + 112].copy_from_slice(&16u32.to_le_bytes()); // directory count
    if let Some((va, size)) = export {
        page[optional + 112..optional + 116].copy_from_slice(&va.to_le_bytes());
        page[optional + 116..optional + 120].copy_from_slice(&size.to_le_bytes());
    }

    let mut entry = optional + OPTIONAL_HEADER_SIZE as usize;
    for (name, va, size) in sections {
        let name_bytes = name.as_bytes();
        page[entry..entry + name_bytes.len()].copy_from_slice(name_bytes);
        page[entry + 8..entry + 12].copy_from_slice(&size.to_le_bytes()); // VirtualSize
        page[entry + 12..entry + 16].copy_from_slice(&va.to_le_bytes()); // VirtualAddress
        page[entry + 16..entry + 20].copy_from_slice(&size.to_le_bytes()); // SizeOfRawData
        entry += 40;
    }

    page
}

/// Builds an export directory blob for `entries` of `(name, ordinal, rva)`,
/// with all tables addressed relative to `directory_va`.
pub fn build_export_directory(directory_va: u32, entries: &[(&str, u16, u32)]) -> Vec<u8> {
    let count = entries.len();
    let names_off = 40;
    let ordinals_off = names_off + count * 4;
    let functions_count = entries.iter().map(|e| e.1 as usize + 1).max().unwrap_or(0);
    let functions_off = ordinals_off + count * 2;
    let strings_off = functions_off + functions_count * 4;

    let mut data = vec![0u8; strings_off];
    data[24..28].copy_from_slice(&(count as u32).to_le_bytes()); // NumberOfNames
    data[28..32].copy_from_slice(&(directory_va + functions_off as u32).to_le_bytes());
    data[32..36].copy_from_slice(&(directory_va + names_off as u32).to_le_bytes());
    data[36..40].copy_from_slice(&(directory_va + ordinals_off as u32).to_le_bytes());

    for (index, (name, ordinal, rva)) in entries.iter().enumerate() {
        let name_rva = directory_va + data.len() as u32;
        data[names_off + index * 4..names_off + index * 4 + 4]
            .copy_from_slice(&name_rva.to_le_bytes());
        data[ordinals_off + index * 2..ordinals_off + index * 2 + 2]
            .copy_from_slice(&ordinal.to_le_bytes());
        let f = functions_off + *ordinal as usize * 4;
        data[f..f + 4].copy_from_slice(&rva.to_le_bytes());
        data.extend_from_slice(name.as_bytes());
        data.push(0);
    }

    data
}

/// Maps a header page for an image with `.text`/`.data`/`.rdata` sections
/// and returns the space plus the base address.
pub fn map_standard_image() -> (BufferAddressSpace, Address) {
    init_tracing();
    let space = BufferAddressSpace::new();
    let base = Address::new(IMAGE_BASE);
    let header = build_header_page(
        &[
            (".text", 0x1000, 0x1000),
            (".data", 0x3000, 0x1000),
            (".rdata", 0x5000, 0x1000),
        ],
        None,
    );
    space.map_image(base, header, Protection::READ_ONLY);
    (space, base)
}
