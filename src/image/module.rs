//! A loaded module of the target process
//!
//! A [`Module`] is a point-in-time view of one loaded image: its header
//! chain is read and validated at construction, and its export and section
//! lists are computed at most once from snapshot reads. The caches are never
//! refreshed; if the target rewrites its image afterwards the module keeps
//! reporting what it saw.

use super::exports::{parse_export_directory, ExportRecord};
use super::headers::{self, ImageHeaders, HEADER_PAGE_SIZE};
use super::sections::{parse_section_table, SectionRecord};
use crate::core::types::{Address, MemoryError, MemoryRange, MemoryResult};
use crate::memory::scanner::{MemoryScanner, Pattern};
use crate::provider::AddressSpaceProvider;
use crate::rtti::{self, ResolvedObject};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One loaded image in the target's address space
pub struct Module<'a> {
    provider: &'a dyn AddressSpaceProvider,
    name: String,
    path: PathBuf,
    range: MemoryRange,
    headers: ImageHeaders,
    header_page: Vec<u8>,
    exports: OnceCell<Vec<ExportRecord>>,
    sections: OnceCell<Vec<SectionRecord>>,
}

impl<'a> Module<'a> {
    /// Opens a module at `base`, reading and validating its header chain.
    ///
    /// Fails with [`MemoryError::InvalidImage`] when the bytes at `base` do
    /// not carry a valid header chain, or with an address-space error when
    /// the header page cannot be read at all.
    pub fn open(
        provider: &'a dyn AddressSpaceProvider,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        base: Address,
        size: u64,
    ) -> MemoryResult<Self> {
        let mut header_page = vec![0u8; HEADER_PAGE_SIZE];
        provider.read(base, &mut header_page)?;
        let headers = headers::parse_headers(&header_page)?;

        let name = name.into();
        debug!(
            module = %name,
            %base,
            sections = headers.number_of_sections,
            "opened module image"
        );

        Ok(Module {
            provider,
            name,
            path: path.into(),
            range: MemoryRange::new(base, size),
            headers,
            header_page,
            exports: OnceCell::new(),
            sections: OnceCell::new(),
        })
    }

    /// Name of the module
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path to the module's backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base address of the loaded image
    pub fn base(&self) -> Address {
        self.range.base
    }

    /// Size of the loaded image in bytes
    pub fn size(&self) -> u64 {
        self.range.size
    }

    /// Address range the image occupies
    pub fn range(&self) -> MemoryRange {
        self.range
    }

    /// Absolute address of the image entry point
    pub fn entry_point(&self) -> Address {
        self.range
            .base
            .saturating_add(self.headers.entry_point_rva as u64)
    }

    /// Decoded header metadata
    pub fn headers(&self) -> &ImageHeaders {
        &self.headers
    }

    /// The module's named exports, computed once from a snapshot of its
    /// export directory.
    ///
    /// A module without an export directory yields an empty list; that is
    /// routine, not an error.
    pub fn exports(&self) -> MemoryResult<&[ExportRecord]> {
        self.exports
            .get_or_try_init(|| {
                let directory = self.headers.export_directory;
                if directory.is_absent() {
                    return Ok(Vec::new());
                }
                // The claimed size is foreign data; a directory cannot extend
                // past the end of its own image.
                let available = self
                    .range
                    .size
                    .saturating_sub(directory.virtual_address as u64);
                let mut snapshot = vec![0u8; (directory.size as u64).min(available) as usize];
                let directory_base = self
                    .range
                    .base
                    .saturating_add(directory.virtual_address as u64);
                self.provider.read(directory_base, &mut snapshot)?;
                parse_export_directory(&snapshot, directory.virtual_address, self.range.base)
            })
            .map(Vec::as_slice)
    }

    /// Looks up an export by name; absence is `None`, not an error
    pub fn fetch_export(&self, name: &str) -> MemoryResult<Option<&ExportRecord>> {
        Ok(self.exports()?.iter().find(|e| e.name == name))
    }

    /// Looks up an export by name, failing with a [`MemoryError::ExportNotFound`]
    /// naming both the export and the module when absent
    pub fn export(&self, name: &str) -> MemoryResult<&ExportRecord> {
        self.fetch_export(name)?
            .ok_or_else(|| MemoryError::export_not_found(&self.name, name))
    }

    /// The module's sections, computed once from the header snapshot
    pub fn sections(&self) -> MemoryResult<&[SectionRecord]> {
        self.sections
            .get_or_try_init(|| {
                parse_section_table(&self.header_page, &self.headers, self.range.base)
            })
            .map(Vec::as_slice)
    }

    /// Looks up a section by name; absence is `None`, not an error
    pub fn fetch_section(&self, name: &str) -> MemoryResult<Option<&SectionRecord>> {
        Ok(self.sections()?.iter().find(|s| s.name == name))
    }

    /// Looks up a section by name, failing with a [`MemoryError::SectionNotFound`]
    /// naming both the section and the module when absent
    pub fn section(&self, name: &str) -> MemoryResult<&SectionRecord> {
        self.fetch_section(name)?
            .ok_or_else(|| MemoryError::section_not_found(&self.name, name))
    }

    /// Scans the whole image range for the first match of `pattern`
    pub fn find(&self, pattern: &Pattern) -> MemoryResult<Option<Address>> {
        MemoryScanner::new(self.provider).find(pattern, self.range)
    }

    /// Scans the whole image range for every match of `pattern`
    pub fn find_all(&self, pattern: &Pattern) -> MemoryResult<Vec<Address>> {
        MemoryScanner::new(self.provider).find_all(pattern, self.range)
    }

    /// Reconstructs the vtables of every polymorphic type whose decorated
    /// name is `decorated`, by cross-referencing the image's RTTI metadata.
    ///
    /// A module without `.data`/`.rdata` sections, or without RTTI for the
    /// type, yields an empty list.
    pub fn fetch_objects(&self, decorated: &str) -> MemoryResult<Vec<ResolvedObject>> {
        let Some(data) = self.fetch_section(".data")? else {
            return Ok(Vec::new());
        };
        let data_range = data.range;
        let Some(rdata) = self.fetch_section(".rdata")? else {
            return Ok(Vec::new());
        };
        rtti::resolve_objects(
            self.provider,
            self.range.base,
            data_range,
            rdata.range,
            decorated,
        )
    }
}
