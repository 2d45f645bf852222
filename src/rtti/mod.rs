//! C++ runtime type metadata recovery
//!
//! Given only a module's `.data` and `.rdata` contents, this module
//! reconstructs the virtual-function tables of a polymorphic type from its
//! decorated name. The walk relies purely on positional knowledge: the type
//! descriptor embeds the name at a fixed offset, complete object locators
//! reference the descriptor by image-relative offset, and each vtable is
//! preceded by a pointer to its locator.

use crate::core::types::{Address, MemoryError, MemoryRange, MemoryResult};
use crate::memory::scanner::{MemoryScanner, Pattern};
use crate::provider::AddressSpaceProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Signature value a COL must carry on 64-bit images, where all of its
/// references are image-relative
pub const COL_SIGNATURE: u32 = 1;

/// Pointer width of the targeted architecture in bytes
pub const POINTER_SIZE: u64 = 8;

/// Distance from a type descriptor's embedded name back to the descriptor
/// itself: the name follows a vtable-pointer slot and a spare slot
const NAME_OFFSET_IN_TYPE_DESCRIPTOR: i64 = 2 * POINTER_SIZE as i64;

/// Offset of the type-descriptor field within a COL: signature, offset and
/// cdOffset precede it
const TYPE_DESCRIPTOR_FIELD_OFFSET: i64 = 12;

/// A complete object locator: per-(type, vtable) metadata linking a vtable
/// to its type descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteObjectLocator {
    /// Layout signature; must equal [`COL_SIGNATURE`] to be trusted
    pub signature: u32,
    /// Offset of this vtable within the complete object
    pub offset: u32,
    /// Constructor displacement offset
    pub cd_offset: u32,
    /// Image-relative offset of the type descriptor, signed
    pub type_descriptor_offset: i32,
}

impl CompleteObjectLocator {
    /// Byte size of the structure as laid out in the image
    pub const SIZE: usize = 16;

    /// Decodes a COL from the exact bytes read out of the image
    pub fn decode(bytes: &[u8]) -> MemoryResult<Self> {
        if bytes.len() < Self::SIZE {
            return Err(MemoryError::InvalidImage(format!(
                "complete object locator needs {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }
        let field = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        Ok(CompleteObjectLocator {
            signature: field(0),
            offset: field(4),
            cd_offset: field(8),
            type_descriptor_offset: field(12) as i32,
        })
    }

    /// True when the signature marks a COL of the targeted layout
    pub fn is_valid(&self) -> bool {
        self.signature == COL_SIGNATURE
    }
}

/// A reconstructed polymorphic object type: one vtable plus the validated
/// locator that led to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedObject {
    /// Address of the vtable's first virtual-function slot
    pub vtable: Address,
    /// The validated locator the vtable belongs to
    pub locator: CompleteObjectLocator,
}

/// Recovers every vtable associated with the decorated type name.
///
/// `data` and `rdata` are the module's data and read-only-data section
/// ranges; `image_base` rebases descriptor addresses to image-relative
/// offsets. Returns descriptors in cross-reference discovery order; absence
/// of the name or of any valid locator is an empty result.
pub fn resolve_objects(
    provider: &dyn AddressSpaceProvider,
    image_base: Address,
    data: MemoryRange,
    rdata: MemoryRange,
    decorated: &str,
) -> MemoryResult<Vec<ResolvedObject>> {
    let scanner = MemoryScanner::new(provider);

    let name_pattern = Pattern::exact(decorated.as_bytes())?;
    let Some(name_address) = scanner.find(&name_pattern, data)? else {
        trace!(decorated, "type name not present in data section");
        return Ok(Vec::new());
    };

    // The descriptor starts two pointer slots before its embedded name.
    let descriptor = name_address.offset(-NAME_OFFSET_IN_TYPE_DESCRIPTOR);
    let descriptor_rva = descriptor.as_u64().wrapping_sub(image_base.as_u64()) as i32;

    let rva_pattern = Pattern::exact(descriptor_rva.to_le_bytes().to_vec())?;
    let references = scanner.find_all(&rva_pattern, rdata)?;

    let mut objects = Vec::new();
    for reference in references {
        let col_address = reference.offset(-TYPE_DESCRIPTOR_FIELD_OFFSET);

        let mut bytes = [0u8; CompleteObjectLocator::SIZE];
        if provider.read(col_address, &mut bytes).is_err() {
            // Candidate came from a live scan; the page may be gone already.
            trace!(%col_address, "candidate locator unreadable, skipping");
            continue;
        }
        let locator = CompleteObjectLocator::decode(&bytes)?;
        if !locator.is_valid() {
            trace!(
                %col_address,
                signature = locator.signature,
                "signature mismatch, coincidental reference"
            );
            continue;
        }

        // A valid locator's address sits in the pointer slot right before
        // its vtable.
        let address_pattern = Pattern::exact(col_address.as_u64().to_le_bytes().to_vec())?;
        let Some(back_reference) = scanner.find(&address_pattern, rdata)? else {
            trace!(%col_address, "no vtable references this locator");
            continue;
        };

        objects.push(ResolvedObject {
            vtable: back_reference.offset(POINTER_SIZE as i64),
            locator,
        });
    }

    debug!(decorated, resolved = objects.len(), "object locator resolution complete");
    Ok(objects)
}
