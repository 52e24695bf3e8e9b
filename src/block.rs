//! Block header convention and the allocation facade sitting between raw
//! requests and the free-region engine.
//!
//! Every allocation is a block: a fixed-size header followed by the payload
//! the caller sees. The returned pointer is at the start of the payload.
//!
//! ```text
//! +---------------------+ <------+
//! |        size         |        |
//! +---------------------+        | -> Header (HEADER_SIZE bytes)
//! |        back         |        |
//! +---------------------+ <------+
//! |       Payload       |        |
//! |         ...         |        | -> Addressable content
//! |         ...         |        |
//! +---------------------+ <------+
//! ```
//!
//! The header records the block's total reserved size, so no deallocation
//! path ever needs a size from the caller. This matters because some entry
//! points (notably [`core::alloc::GlobalAlloc::dealloc`] as invoked by
//! collection internals) pass layouts the facade deliberately never trusts:
//! the header is the sole source of truth.

use core::alloc::Layout;
use core::ptr::{self, NonNull};

use crate::freelist::{FreeRegionList, MIN_ALIGNMENT};
use crate::utils::align;

/// Metadata prefix of every allocated block.
#[repr(C)]
struct BlockHeader {
    /// Total reserved size of the block: header, padding and payload.
    size: usize,
    /// Bytes between the start of the reserved span and this header. Always
    /// zero for requests whose alignment fits [`MIN_ALIGNMENT`]; nonzero
    /// only when the payload had to be pushed forward to satisfy an
    /// over-aligned [`Layout`].
    back: usize,
}

/// Header size, padded so the payload behind it keeps the engine's minimum
/// alignment.
pub(crate) const HEADER_SIZE: usize = align(size_of::<BlockHeader>(), MIN_ALIGNMENT);

const _: () = assert!(size_of::<BlockHeader>() <= HEADER_SIZE);

/// Clamps a requested payload size to at least one byte and rounds it up to
/// the engine's minimum alignment. Guarantees no zero-sized and no
/// misaligned payload region ever reaches the engine.
pub(crate) fn normalized_size(requested: usize) -> usize {
    align(requested.max(1), FreeRegionList::minimum_alignment())
}

/// Allocates a block for `layout` from `regions` and returns the payload
/// pointer, or null when no free region fits.
///
/// The reserved span is `HEADER_SIZE + normalized_size(layout.size())`
/// bytes, plus alignment slack when the layout asks for more than
/// [`MIN_ALIGNMENT`]. The header is written immediately before the returned
/// payload.
pub(crate) fn allocate_block(regions: &mut FreeRegionList, layout: Layout) -> *mut u8 {
    let slack = layout.align().saturating_sub(MIN_ALIGNMENT);
    let total = HEADER_SIZE + normalized_size(layout.size()) + slack;

    let Some(block) = regions.allocate(total) else {
        return ptr::null_mut();
    };

    // The engine hands out MIN_ALIGNMENT-aligned spans; push the payload
    // forward only when the layout demands more than that.
    let payload = block
        .as_ptr()
        .map_addr(|addr| align(addr + HEADER_SIZE, layout.align().max(MIN_ALIGNMENT)));

    unsafe {
        let header = payload.sub(HEADER_SIZE).cast::<BlockHeader>();
        header.write(BlockHeader {
            size: total,
            back: header.addr() - block.as_ptr().addr(),
        });
    }

    payload
}

/// Frees the block behind `ptr`. No-op on null.
///
/// The block's total size and start address are recovered from the header;
/// nothing is taken from the caller.
///
/// **SAFETY**: `ptr` must be null or a payload pointer previously returned
/// by [`allocate_block`] on the same `regions` and not freed since. A
/// foreign pointer or a double free corrupts the engine undetected.
pub(crate) unsafe fn deallocate_block(regions: &mut FreeRegionList, ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }

    unsafe {
        let header = ptr.sub(HEADER_SIZE).cast::<BlockHeader>();
        let BlockHeader { size, back } = header.read();
        let block = NonNull::new_unchecked(header.cast::<u8>().sub(back));
        regions.deallocate(block, size);
    }
}

/// Payload capacity of the live block behind `ptr`. Used by `realloc` to
/// decide whether a block can be reused in place.
///
/// **SAFETY**: same contract as [`deallocate_block`], minus the null case.
pub(crate) unsafe fn block_usable_size(ptr: *mut u8) -> usize {
    unsafe {
        let header = ptr.sub(HEADER_SIZE).cast::<BlockHeader>();
        let BlockHeader { size, back } = header.read();
        size - back - HEADER_SIZE
    }
}
