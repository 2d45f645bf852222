//! In-memory address space backed by explicit byte segments
//!
//! `BufferAddressSpace` stands in for a live target: tests and examples map
//! synthetic segments at chosen addresses and run the full introspection
//! stack against them. Gaps between segments behave like free regions and
//! the space ends after the last segment, so region enumeration terminates
//! the same way it does against a real process.

use super::AddressSpaceProvider;
use crate::core::types::{Address, MemoryError, MemoryRange, MemoryResult};
use crate::memory::regions::{Protection, Region, RegionKind, RegionState};
use parking_lot::RwLock;

const ERROR_INVALID_PARAMETER: u32 = 87;
const ERROR_PARTIAL_COPY: u32 = 299;
const ERROR_INVALID_ADDRESS: u32 = 487;
const ERROR_NOACCESS: u32 = 998;

const ALLOCATION_GRANULARITY: u64 = 0x1_0000;

#[derive(Debug)]
struct Segment {
    range: MemoryRange,
    state: RegionState,
    kind: RegionKind,
    protection: Protection,
    data: Vec<u8>,
}

/// A synthetic target address space held entirely in local memory
#[derive(Debug, Default)]
pub struct BufferAddressSpace {
    segments: RwLock<Vec<Segment>>,
}

impl BufferAddressSpace {
    /// Creates an empty address space with no mapped segments
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a committed private segment at `base`
    pub fn map(&self, base: Address, data: Vec<u8>, protection: Protection) {
        self.insert(base, data, RegionState::Committed, RegionKind::Private, protection);
    }

    /// Maps a committed image segment at `base`
    pub fn map_image(&self, base: Address, data: Vec<u8>, protection: Protection) {
        self.insert(base, data, RegionState::Committed, RegionKind::Image, protection);
    }

    /// Reserves an uncommitted segment at `base`; reads and writes against it fail
    pub fn reserve(&self, base: Address, size: u64) {
        self.insert(
            base,
            vec![0; size as usize],
            RegionState::Reserved,
            RegionKind::Private,
            Protection::NO_ACCESS,
        );
    }

    fn insert(
        &self,
        base: Address,
        data: Vec<u8>,
        state: RegionState,
        kind: RegionKind,
        protection: Protection,
    ) {
        let range = MemoryRange::new(base, data.len() as u64);
        let mut segments = self.segments.write();
        debug_assert!(
            segments.iter().all(|s| s.range.intersect(&range).is_none()),
            "overlapping segment mapped at {}",
            base
        );
        let segment = Segment {
            range,
            state,
            kind,
            protection,
            data,
        };
        let at = segments
            .iter()
            .position(|s| s.range.base > base)
            .unwrap_or(segments.len());
        segments.insert(at, segment);
    }
}

impl AddressSpaceProvider for BufferAddressSpace {
    fn read(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        let segments = self.segments.read();
        let mut cursor = address;
        let mut filled = 0;

        // A read may span adjacent segments but must not cross a gap or an
        // unreadable page.
        while filled < buffer.len() {
            let segment = segments
                .iter()
                .find(|s| s.range.contains(cursor))
                .ok_or_else(|| MemoryError::read_failed(address, ERROR_PARTIAL_COPY))?;

            if segment.state != RegionState::Committed || !segment.protection.is_readable() {
                return Err(MemoryError::read_failed(address, ERROR_NOACCESS));
            }

            let offset = cursor.checked_sub(segment.range.base).unwrap_or(0) as usize;
            let count = (buffer.len() - filled).min(segment.data.len() - offset);
            buffer[filled..filled + count].copy_from_slice(&segment.data[offset..offset + count]);
            filled += count;
            cursor = cursor.saturating_add(count as u64);
        }

        Ok(())
    }

    fn write(&self, address: Address, data: &[u8]) -> MemoryResult<usize> {
        let mut segments = self.segments.write();
        let mut cursor = address;
        let mut written = 0;

        while written < data.len() {
            let segment = segments
                .iter_mut()
                .find(|s| s.range.contains(cursor))
                .ok_or_else(|| MemoryError::write_failed(address, ERROR_PARTIAL_COPY))?;

            if segment.state != RegionState::Committed || !segment.protection.is_writable() {
                return Err(MemoryError::write_failed(address, ERROR_NOACCESS));
            }

            let offset = cursor.checked_sub(segment.range.base).unwrap_or(0) as usize;
            let count = (data.len() - written).min(segment.data.len() - offset);
            segment.data[offset..offset + count].copy_from_slice(&data[written..written + count]);
            written += count;
            cursor = cursor.saturating_add(count as u64);
        }

        Ok(written)
    }

    fn query_region(&self, address: Address) -> MemoryResult<Region> {
        let segments = self.segments.read();

        if let Some(segment) = segments.iter().find(|s| s.range.contains(address)) {
            return Ok(Region {
                range: segment.range,
                state: segment.state,
                kind: segment.kind,
                protection: segment.protection,
            });
        }

        // Synthesize the free region covering the gap the address falls in.
        let next = segments.iter().find(|s| s.range.base > address);
        match next {
            Some(next) => {
                let gap_start = segments
                    .iter()
                    .filter(|s| s.range.end() <= address)
                    .map(|s| s.range.end())
                    .max()
                    .unwrap_or_else(Address::null);
                let size = next
                    .range
                    .base
                    .checked_sub(gap_start)
                    .ok_or_else(|| MemoryError::query_failed(address, ERROR_INVALID_ADDRESS))?;
                Ok(Region {
                    range: MemoryRange::new(gap_start, size),
                    state: RegionState::Free,
                    kind: RegionKind::Private,
                    protection: Protection::NO_ACCESS,
                })
            }
            // Past the last segment: nothing left to report.
            None => Err(MemoryError::query_failed(address, ERROR_INVALID_PARAMETER)),
        }
    }

    fn allocate(&self, size: u64, protection: Protection) -> MemoryResult<Address> {
        if size == 0 {
            return Err(MemoryError::AddressSpace {
                operation: "allocate",
                address: Address::null(),
                code: ERROR_INVALID_PARAMETER,
            });
        }

        let base = {
            let segments = self.segments.read();
            let top = segments
                .iter()
                .map(|s| s.range.end())
                .max()
                .unwrap_or(Address::new(ALLOCATION_GRANULARITY));
            let aligned = (top.as_u64() + ALLOCATION_GRANULARITY - 1) & !(ALLOCATION_GRANULARITY - 1);
            Address::new(aligned.max(ALLOCATION_GRANULARITY))
        };

        self.insert(
            base,
            vec![0; size as usize],
            RegionState::Committed,
            RegionKind::Private,
            protection,
        );
        Ok(base)
    }

    fn protect(
        &self,
        address: Address,
        _size: u64,
        protection: Protection,
    ) -> MemoryResult<Protection> {
        let mut segments = self.segments.write();
        let segment = segments
            .iter_mut()
            .find(|s| s.range.contains(address))
            .ok_or(MemoryError::AddressSpace {
                operation: "protect",
                address,
                code: ERROR_INVALID_ADDRESS,
            })?;

        // Protection changes apply to the whole segment; page-granular splits
        // are not modeled here.
        Ok(std::mem::replace(&mut segment.protection, protection))
    }

    fn free(&self, address: Address) -> MemoryResult<()> {
        let mut segments = self.segments.write();
        let at = segments
            .iter()
            .position(|s| s.range.base == address)
            .ok_or(MemoryError::AddressSpace {
                operation: "free",
                address,
                code: ERROR_INVALID_ADDRESS,
            })?;
        segments.remove(at);
        Ok(())
    }
}
