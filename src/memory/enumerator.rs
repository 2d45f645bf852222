//! Lazy enumeration of a target's memory regions

use crate::core::types::Address;
use crate::memory::regions::Region;
use crate::provider::AddressSpaceProvider;
use tracing::trace;

/// Walks the target's address space as an ordered sequence of disjoint
/// regions, starting at address zero.
///
/// Each step queries the provider for the region containing the cursor and
/// advances past it. A failed query is the end of the sequence, not an
/// error: the cursor has left the addressable range, or the target has
/// exited mid-walk. The iterator is not restartable.
pub struct RegionIter<'a> {
    provider: &'a dyn AddressSpaceProvider,
    // None is the terminated sentinel.
    cursor: Option<Address>,
}

impl<'a> RegionIter<'a> {
    /// Starts a walk at address zero
    pub fn new(provider: &'a dyn AddressSpaceProvider) -> Self {
        Self::starting_at(provider, Address::null())
    }

    /// Starts a walk at a chosen address
    pub fn starting_at(provider: &'a dyn AddressSpaceProvider, address: Address) -> Self {
        RegionIter {
            provider,
            cursor: Some(address),
        }
    }

    /// True once the walk has hit the end of the address space
    pub fn is_terminated(&self) -> bool {
        self.cursor.is_none()
    }

    /// Current cursor position, `None` when terminated
    pub fn position(&self) -> Option<Address> {
        self.cursor
    }
}

impl std::fmt::Debug for RegionIter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionIter")
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

/// Two walk positions are equal iff their cursors are, including the
/// terminated sentinel.
impl PartialEq for RegionIter<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cursor == other.cursor
    }
}

impl Eq for RegionIter<'_> {}

impl Iterator for RegionIter<'_> {
    type Item = Region;

    fn next(&mut self) -> Option<Region> {
        let cursor = self.cursor?;
        match self.provider.query_region(cursor) {
            Ok(region) => {
                let next = region.end();
                // A region that fails to advance the cursor would loop
                // forever; treat it as the end of the walk.
                self.cursor = (next > cursor).then_some(next);
                Some(region)
            }
            Err(err) => {
                trace!(%cursor, %err, "region walk terminated");
                self.cursor = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MemoryRange;
    use crate::memory::regions::{Protection, RegionState};
    use crate::provider::BufferAddressSpace;

    #[test]
    fn test_walk_covers_segments_and_gaps_in_order() {
        let space = BufferAddressSpace::new();
        space.map(Address::new(0x1000), vec![0; 0x1000], Protection::READ_WRITE);
        space.map(Address::new(0x4000), vec![0; 0x2000], Protection::READ_ONLY);

        let regions: Vec<Region> = RegionIter::new(&space).collect();
        assert_eq!(regions.len(), 4);

        // Free gap below the first segment, then alternating mapped/free.
        assert_eq!(regions[0].state, RegionState::Free);
        assert_eq!(regions[0].range, MemoryRange::new(Address::null(), 0x1000));
        assert_eq!(regions[1].base(), Address::new(0x1000));
        assert_eq!(regions[2].state, RegionState::Free);
        assert_eq!(regions[3].base(), Address::new(0x4000));

        // Ascending, disjoint coverage.
        for pair in regions.windows(2) {
            assert_eq!(pair[0].end(), pair[1].base());
        }
    }

    #[test]
    fn test_failing_first_query_yields_nothing() {
        let space = BufferAddressSpace::new();
        let mut iter = RegionIter::new(&space);
        assert_eq!(iter.next(), None);
        assert!(iter.is_terminated());
        // Exhausted stays exhausted.
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_positions_compare_by_cursor() {
        let space = BufferAddressSpace::new();
        space.map(Address::new(0x1000), vec![0; 0x1000], Protection::READ_WRITE);

        let mut a = RegionIter::new(&space);
        let mut b = RegionIter::new(&space);
        assert_eq!(a, b);

        a.next();
        assert_ne!(a, b);

        b.next();
        assert_eq!(a, b);

        // Drain both; terminated positions are equal.
        for _ in a.by_ref() {}
        for _ in b.by_ref() {}
        assert!(a.is_terminated());
        assert_eq!(a, b);
    }

    #[test]
    fn test_walk_is_finite() {
        let space = BufferAddressSpace::new();
        space.map(Address::new(0x1000), vec![0; 0x1000], Protection::READ_WRITE);
        assert_eq!(RegionIter::new(&space).count(), 2);
    }
}
