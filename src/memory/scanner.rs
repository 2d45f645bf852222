//! Byte pattern matching over buffers and foreign address ranges

use crate::core::types::{Address, MemoryError, MemoryRange, MemoryResult};
use crate::provider::AddressSpaceProvider;
use tracing::{debug, trace};

/// A byte signature with per-position wildcards.
///
/// Immutable once built: construction validates that the signature is
/// non-empty and that the mask covers every position, so a `Pattern` in hand
/// is always scannable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: Vec<bool>,
}

impl Pattern {
    /// Creates a pattern from raw bytes and a mask; `true` marks an exact
    /// position, `false` a wildcard.
    pub fn new(bytes: Vec<u8>, mask: Vec<bool>) -> MemoryResult<Self> {
        if bytes.is_empty() {
            return Err(MemoryError::InvalidPattern("empty pattern".to_string()));
        }
        if bytes.len() != mask.len() {
            return Err(MemoryError::InvalidPattern(format!(
                "mask length {} does not match pattern length {}",
                mask.len(),
                bytes.len()
            )));
        }
        Ok(Pattern { bytes, mask })
    }

    /// Creates a pattern where every byte must match exactly
    pub fn exact(bytes: impl Into<Vec<u8>>) -> MemoryResult<Self> {
        let bytes = bytes.into();
        let mask = vec![true; bytes.len()];
        Pattern::new(bytes, mask)
    }

    /// Creates a pattern from a code-style byte string and mask string, where
    /// `x` marks an exact position and `?` a wildcard (e.g. `"xxx????xxxx"`)
    pub fn with_mask(bytes: impl Into<Vec<u8>>, mask: &str) -> MemoryResult<Self> {
        let mask = mask
            .chars()
            .map(|c| match c {
                'x' | 'X' => Ok(true),
                '?' => Ok(false),
                other => Err(MemoryError::InvalidPattern(format!(
                    "invalid mask character '{}'",
                    other
                ))),
            })
            .collect::<MemoryResult<Vec<bool>>>()?;
        Pattern::new(bytes.into(), mask)
    }

    /// Parses an IDA-style hex pattern such as `"48 8B ?? ?? 89"`, with
    /// `??` or `?` as wildcard tokens
    pub fn from_hex(text: &str) -> MemoryResult<Self> {
        let mut bytes = Vec::new();
        let mut mask = Vec::new();

        for token in text.split_whitespace() {
            if token == "??" || token == "?" {
                bytes.push(0);
                mask.push(false);
                continue;
            }
            let decoded = hex::decode(token)
                .map_err(|_| MemoryError::InvalidPattern(format!("invalid hex: {}", token)))?;
            if decoded.len() != 1 {
                return Err(MemoryError::InvalidPattern(format!(
                    "token '{}' is not a single byte",
                    token
                )));
            }
            bytes.push(decoded[0]);
            mask.push(true);
        }

        Pattern::new(bytes, mask)
    }

    /// Length of the signature in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false: empty patterns cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The signature bytes; wildcard positions hold zero
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The mask; `true` marks an exact position
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Checks whether the window starting at `data[0]` matches
    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() < self.bytes.len() {
            return false;
        }
        self.bytes
            .iter()
            .zip(&self.mask)
            .zip(data)
            .all(|((byte, exact), candidate)| !exact || byte == candidate)
    }
}

/// Returns every offset in `buffer` where `pattern` matches.
///
/// The window slides one byte at a time, so overlapping matches are all
/// reported.
pub fn scan_buffer(pattern: &Pattern, buffer: &[u8]) -> Vec<usize> {
    let len = pattern.len();
    if buffer.len() < len {
        return Vec::new();
    }
    (0..=buffer.len() - len)
        .filter(|&offset| pattern.matches(&buffer[offset..]))
        .collect()
}

/// Scans foreign address ranges for byte signatures.
///
/// Before touching memory, a range is restricted to the parts the target
/// reports as committed, non-guarded and accessible; any sub-range whose read
/// still fails is skipped rather than aborting the scan, because individual
/// pages of a live target may legitimately vanish between the query and the
/// read. Results are therefore best-effort partial, never an error.
pub struct MemoryScanner<'a> {
    provider: &'a dyn AddressSpaceProvider,
}

impl<'a> MemoryScanner<'a> {
    /// Creates a scanner over the given provider
    pub fn new(provider: &'a dyn AddressSpaceProvider) -> Self {
        MemoryScanner { provider }
    }

    /// Returns the absolute address of the first match in `range`
    pub fn find(&self, pattern: &Pattern, range: MemoryRange) -> MemoryResult<Option<Address>> {
        for chunk in self.readable_chunks(range) {
            if let Some(address) = self.scan_chunk_first(pattern, chunk) {
                return Ok(Some(address));
            }
        }
        Ok(None)
    }

    /// Returns the absolute addresses of every match in `range`, in
    /// ascending order
    pub fn find_all(&self, pattern: &Pattern, range: MemoryRange) -> MemoryResult<Vec<Address>> {
        let mut matches = Vec::new();
        for chunk in self.readable_chunks(range) {
            let Some(buffer) = self.read_chunk(chunk) else {
                continue;
            };
            matches.extend(
                scan_buffer(pattern, &buffer)
                    .into_iter()
                    .map(|offset| chunk.base.saturating_add(offset as u64)),
            );
        }
        debug!(
            pattern_len = pattern.len(),
            range = %range,
            matches = matches.len(),
            "pattern scan complete"
        );
        Ok(matches)
    }

    fn scan_chunk_first(&self, pattern: &Pattern, chunk: MemoryRange) -> Option<Address> {
        let buffer = self.read_chunk(chunk)?;
        let len = pattern.len();
        if buffer.len() < len {
            return None;
        }
        (0..=buffer.len() - len)
            .find(|&offset| pattern.matches(&buffer[offset..]))
            .map(|offset| chunk.base.saturating_add(offset as u64))
    }

    fn read_chunk(&self, chunk: MemoryRange) -> Option<Vec<u8>> {
        let mut buffer = vec![0u8; chunk.size as usize];
        match self.provider.read(chunk.base, &mut buffer) {
            Ok(()) => Some(buffer),
            Err(err) => {
                trace!(chunk = %chunk, %err, "skipping unreadable sub-range");
                None
            }
        }
    }

    /// The readable parts of `range`, in ascending order. Contiguous readable
    /// regions are fused so a signature spanning a region boundary is still
    /// found.
    fn readable_chunks(&self, range: MemoryRange) -> Vec<MemoryRange> {
        let mut chunks: Vec<MemoryRange> = Vec::new();
        let mut cursor = range.base;

        while cursor < range.end() {
            let region = match self.provider.query_region(cursor) {
                Ok(region) => region,
                Err(err) => {
                    trace!(%cursor, %err, "region query failed, ending chunk walk");
                    break;
                }
            };
            let next = region.end();
            if region.is_readable() {
                if let Some(part) = region.range.intersect(&range) {
                    match chunks.last_mut() {
                        Some(last) if last.end() == part.base => last.size += part.size,
                        _ => chunks.push(part),
                    }
                }
            }
            if next <= cursor {
                break;
            }
            cursor = next;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::regions::Protection;
    use crate::provider::BufferAddressSpace;

    #[test]
    fn test_pattern_construction_validation() {
        assert!(matches!(
            Pattern::new(Vec::new(), Vec::new()),
            Err(MemoryError::InvalidPattern(_))
        ));
        assert!(matches!(
            Pattern::new(vec![1, 2, 3], vec![true, false]),
            Err(MemoryError::InvalidPattern(_))
        ));
        assert!(matches!(
            Pattern::exact(Vec::new()),
            Err(MemoryError::InvalidPattern(_))
        ));
        assert!(matches!(
            Pattern::with_mask(vec![1, 2], "x"),
            Err(MemoryError::InvalidPattern(_))
        ));
        assert!(matches!(
            Pattern::with_mask(vec![1, 2], "xy"),
            Err(MemoryError::InvalidPattern(_))
        ));
        assert!(Pattern::new(vec![1, 2], vec![true, false]).is_ok());
    }

    #[test]
    fn test_pattern_from_hex() {
        let pattern = Pattern::from_hex("48 8B ?? ? 89").unwrap();
        assert_eq!(pattern.bytes(), &[0x48, 0x8B, 0x00, 0x00, 0x89]);
        assert_eq!(pattern.mask(), &[true, true, false, false, true]);

        assert!(Pattern::from_hex("").is_err());
        assert!(Pattern::from_hex("GG").is_err());
        assert!(Pattern::from_hex("488B").is_err());
    }

    #[test]
    fn test_pattern_matching_with_wildcards() {
        let pattern = Pattern::with_mask(vec![0x48, 0x8B, 0x00, 0x00, 0x89], "xx??x").unwrap();
        assert!(pattern.matches(&[0x48, 0x8B, 0xC1, 0xFF, 0x89]));
        assert!(!pattern.matches(&[0x48, 0x8C, 0xC1, 0xFF, 0x89]));
        assert!(!pattern.matches(&[0x48, 0x8B, 0xC1]));
    }

    #[test]
    fn test_scan_buffer_reports_overlaps() {
        let pattern = Pattern::exact(vec![0xAA, 0xAA]).unwrap();
        let buffer = [0xAA, 0xAA, 0xAA, 0x00, 0xAA, 0xAA];
        assert_eq!(scan_buffer(&pattern, &buffer), vec![0, 1, 4]);
    }

    #[test]
    fn test_scan_buffer_shorter_than_pattern() {
        let pattern = Pattern::exact(vec![1, 2, 3, 4]).unwrap();
        assert!(scan_buffer(&pattern, &[1, 2]).is_empty());
    }

    #[test]
    fn test_find_in_mapped_range() {
        let space = BufferAddressSpace::new();
        let mut data = vec![0u8; 4096];
        let needle = [0x48, 0x8D, 0x0D, 0x11, 0x22, 0x33, 0x44, 0x48, 0x8D, 0x55, 0xF8];
        data[128..128 + needle.len()].copy_from_slice(&needle);
        space.map(Address::new(0x40_0000), data, Protection::READ_ONLY);

        let pattern = Pattern::with_mask(
            vec![0x48, 0x8D, 0x0D, 0, 0, 0, 0, 0x48, 0x8D, 0x55, 0xF8],
            "xxx????xxxx",
        )
        .unwrap();
        let scanner = MemoryScanner::new(&space);
        let range = MemoryRange::new(Address::new(0x40_0000), 4096);

        assert_eq!(
            scanner.find(&pattern, range).unwrap(),
            Some(Address::new(0x40_0000 + 128))
        );
    }

    #[test]
    fn test_find_all_skips_unreadable_subranges() {
        let space = BufferAddressSpace::new();
        space.map(Address::new(0x1000), vec![0x90; 0x1000], Protection::READ_ONLY);
        space.map(
            Address::new(0x2000),
            vec![0x90; 0x1000],
            Protection::NO_ACCESS,
        );
        space.map(Address::new(0x3000), vec![0x90; 0x1000], Protection::READ_ONLY);

        let pattern = Pattern::exact(vec![0x90, 0x90, 0x90, 0x90]).unwrap();
        let scanner = MemoryScanner::new(&space);
        let all = scanner
            .find_all(&pattern, MemoryRange::new(Address::new(0x1000), 0x3000))
            .unwrap();

        // The inaccessible page contributes nothing; the rest is intact.
        assert!(all.contains(&Address::new(0x1000)));
        assert!(all.contains(&Address::new(0x3000)));
        assert!(all.iter().all(|a| !MemoryRange::new(Address::new(0x2000), 0x1000).contains(*a)));
    }

    #[test]
    fn test_find_spans_contiguous_regions() {
        let space = BufferAddressSpace::new();
        space.map(Address::new(0x1000), vec![0xAB; 0x1000], Protection::READ_ONLY);
        space.map(Address::new(0x2000), vec![0xCD; 0x1000], Protection::READ_ONLY);

        let pattern = Pattern::exact(vec![0xAB, 0xAB, 0xCD, 0xCD]).unwrap();
        let scanner = MemoryScanner::new(&space);
        let found = scanner
            .find(&pattern, MemoryRange::new(Address::new(0x1000), 0x2000))
            .unwrap();
        assert_eq!(found, Some(Address::new(0x1FFE)));
    }

    #[test]
    fn test_find_respects_range_bounds() {
        let space = BufferAddressSpace::new();
        let mut data = vec![0u8; 0x1000];
        data[0x800] = 0x77;
        space.map(Address::new(0x1000), data, Protection::READ_ONLY);

        let pattern = Pattern::exact(vec![0x77]).unwrap();
        let scanner = MemoryScanner::new(&space);

        // The match lies outside the scanned window.
        let found = scanner
            .find(&pattern, MemoryRange::new(Address::new(0x1000), 0x400))
            .unwrap();
        assert_eq!(found, None);
    }
}
