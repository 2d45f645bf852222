//! Region walk behavior against synthetic targets

use memsight::{
    Address, AddressSpaceProvider, BufferAddressSpace, Protection, Region, RegionIter, RegionState,
};
use pretty_assertions::assert_eq;

#[test]
fn empty_space_yields_zero_regions() {
    let space = BufferAddressSpace::new();
    let regions: Vec<Region> = RegionIter::new(&space).collect();
    assert!(regions.is_empty());
}

#[test]
fn walk_is_ordered_disjoint_and_unmerged() {
    let space = BufferAddressSpace::new();
    // Two adjacent committed segments with identical protection stay
    // separate regions.
    space.map(Address::new(0x1000), vec![0; 0x1000], Protection::READ_WRITE);
    space.map(Address::new(0x2000), vec![0; 0x1000], Protection::READ_WRITE);
    space.map(Address::new(0x5000), vec![0; 0x1000], Protection::READ_ONLY);

    let regions: Vec<Region> = RegionIter::new(&space).collect();
    assert_eq!(regions.len(), 5);
    assert_eq!(regions[1].base(), Address::new(0x1000));
    assert_eq!(regions[2].base(), Address::new(0x2000));
    assert_eq!(regions[3].state, RegionState::Free);

    for pair in regions.windows(2) {
        assert!(pair[0].base() < pair[1].base());
        assert_eq!(pair[0].end(), pair[1].base());
    }
}

#[test]
fn target_exit_mid_walk_terminates_without_error() {
    let space = BufferAddressSpace::new();
    space.map(Address::new(0x1000), vec![0; 0x1000], Protection::READ_WRITE);
    space.map(Address::new(0x2000), vec![0; 0x1000], Protection::READ_WRITE);

    let mut iter = RegionIter::new(&space);
    assert!(iter.next().is_some()); // leading free gap
    assert!(iter.next().is_some()); // first segment

    // The "process" goes away underneath the walk.
    space.free(Address::new(0x2000)).unwrap();

    // The remaining queries fail; the walk just ends.
    assert!(iter.next().is_none());
    assert!(iter.is_terminated());
}

#[test]
fn enumeration_is_not_restartable_but_fresh_walks_are_independent() {
    let space = BufferAddressSpace::new();
    space.map(Address::new(0x1000), vec![0; 0x1000], Protection::READ_WRITE);

    let mut first = RegionIter::new(&space);
    while first.next().is_some() {}
    assert!(first.is_terminated());
    assert_eq!(first.next(), None);

    let second = RegionIter::new(&space);
    assert_eq!(second.count(), 2);
}
