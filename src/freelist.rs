//! Intrusive list of free regions, the engine every allocation is served
//! from.
//!
//! The arena starts out as one big free region. Allocating carves blocks off
//! the front of free regions, deallocating turns blocks back into free
//! regions and merges them with their address-neighbours. All sizes handled
//! here are multiples of [`MIN_ALIGNMENT`], which the facade in
//! [`crate::block`] guarantees.
//!
//! Because we are the actual memory allocator, this data structure cannot
//! make allocations itself. The trick is that a free region's bytes are, by
//! definition, unused: we store the region's metadata (its size and a link
//! to the next free region) inside the region itself, so the list needs no
//! storage of its own.
//!
//! ```text
//!                  Arena
//! +------------------------------------------------------------------+
//! | +--------------+            +--------------+    +--------------+ |
//! | | FreeRegion   | Allocated  | FreeRegion   |    | FreeRegion   | |
//! | | size | next ------------------^   | next ---------^   | None | |
//! | +--------------+            +--------------+    +--------------+ |
//! +------------------------------------------------------------------+
//! ```
//!
//! The list is kept sorted by address. That is what makes coalescing
//! possible: after inserting a freed span we only have to look at the
//! regions immediately before and after it to know whether they touch.

use core::ptr::NonNull;

/// Minimum alignment of everything the engine hands out. Every region
/// address and every region size is a multiple of this.
pub(crate) const MIN_ALIGNMENT: usize = align_of::<FreeRegion>();

/// Header written at the start of every free region.
///
/// `size` counts the whole span, these header bytes included. When the
/// region is handed out by [`FreeRegionList::allocate`] the header bytes are
/// handed out with it; nothing of the engine survives inside an allocated
/// block.
#[repr(C, align(16))]
pub(crate) struct FreeRegion {
    /// Size of the whole free span in bytes.
    size: usize,
    /// Next free region in address order, or `None` for the last one.
    next: Option<NonNull<FreeRegion>>,
}

// A free span must always be able to host its own header.
const _: () = assert!(size_of::<FreeRegion>() == MIN_ALIGNMENT);

/// First-fit, address-ordered free-region list with splitting and
/// coalescing.
///
/// First-fit was picked over best-fit because it needs no extra bookkeeping
/// and terminates on the first usable region. The tie-break this implies:
/// under repeated alloc/free of mixed sizes, the *lowest-addressed* region
/// that fits is always the one reused.
pub(crate) struct FreeRegionList {
    /// Lowest-addressed free region, or `None` when the arena is exhausted.
    head: Option<NonNull<FreeRegion>>,
    /// Total bytes handed over in [`init`](Self::init). Zero until then.
    capacity: usize,
}

// All pointers point into the one arena this list was initialized with and
// are only dereferenced by the list itself, behind the caller's lock.
unsafe impl Send for FreeRegionList {}

impl FreeRegionList {
    /// Creates an empty, uninitialized list. Const so it can live in a
    /// `static` without running code before `main`.
    pub(crate) const fn new() -> Self {
        Self {
            head: None,
            capacity: 0,
        }
    }

    /// Minimum alignment of every address this engine returns.
    pub(crate) const fn minimum_alignment() -> usize {
        MIN_ALIGNMENT
    }

    pub(crate) const fn is_initialized(&self) -> bool {
        self.capacity != 0
    }

    /// Arena capacity in bytes. Zero before [`init`](Self::init).
    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hands the arena `[base, base + capacity)` over to the engine as one
    /// free region.
    ///
    /// **SAFETY**: `base` must be aligned to [`MIN_ALIGNMENT`] and point to
    /// `capacity` writable bytes (a multiple of [`MIN_ALIGNMENT`], at least
    /// one region header's worth) that nothing else touches for the lifetime
    /// of the list. Must be called at most once.
    pub(crate) unsafe fn init(&mut self, base: NonNull<u8>, capacity: usize) {
        debug_assert!(!self.is_initialized());
        debug_assert!(base.as_ptr().addr() % MIN_ALIGNMENT == 0);
        debug_assert!(capacity % MIN_ALIGNMENT == 0 && capacity >= size_of::<FreeRegion>());

        let region = base.cast::<FreeRegion>();
        unsafe {
            region.write(FreeRegion {
                size: capacity,
                next: None,
            });
        }
        self.head = Some(region);
        self.capacity = capacity;
    }

    /// Serves `total` bytes from the first region that fits, scanning in
    /// address order.
    ///
    /// If the match is larger than needed the leading `total` bytes are
    /// carved off and the suffix is re-linked as a smaller free region; an
    /// exact match is unlinked entirely. Returns `None` when no single
    /// region is large enough. Never blocks and never grows the arena, so a
    /// failure here is final.
    pub(crate) fn allocate(&mut self, total: usize) -> Option<NonNull<u8>> {
        debug_assert!(total % MIN_ALIGNMENT == 0 && total >= size_of::<FreeRegion>());

        let mut prev: Option<NonNull<FreeRegion>> = None;
        let mut current = self.head;

        while let Some(region) = current {
            let (size, next) = unsafe { (region.as_ref().size, region.as_ref().next) };

            if size >= total {
                let replacement = if size - total >= size_of::<FreeRegion>() {
                    // Split: the suffix becomes a smaller free region that
                    // keeps this region's place in the list.
                    let suffix = unsafe { region.cast::<u8>().add(total).cast::<FreeRegion>() };
                    unsafe {
                        suffix.write(FreeRegion {
                            size: size - total,
                            next,
                        });
                    }
                    Some(suffix)
                } else {
                    // Exact fit (sizes are multiples of MIN_ALIGNMENT, so a
                    // remainder smaller than a header is exactly zero).
                    next
                };

                match prev {
                    Some(mut preceding) => unsafe { preceding.as_mut().next = replacement },
                    None => self.head = replacement,
                }

                return Some(region.cast());
            }

            prev = current;
            current = next;
        }

        None
    }

    /// Returns `[addr, addr + total)` to the engine as a free region,
    /// merging it with the immediately preceding and/or following region
    /// when they are address-adjacent.
    ///
    /// Coalescing here is the only fragmentation mitigation the engine has;
    /// it keeps alternating alloc/free workloads from shredding the arena
    /// into unusable slivers.
    ///
    /// **SAFETY**: `[addr, addr + total)` must be exactly one span
    /// previously returned by [`allocate`](Self::allocate) with the same
    /// `total`, not freed since. Anything else (foreign pointer, double
    /// free, wrong size) corrupts the list; by contract this is not
    /// detected.
    pub(crate) unsafe fn deallocate(&mut self, addr: NonNull<u8>, total: usize) {
        debug_assert!(addr.as_ptr().addr() % MIN_ALIGNMENT == 0);
        debug_assert!(total % MIN_ALIGNMENT == 0 && total >= size_of::<FreeRegion>());

        let mut node = addr.cast::<FreeRegion>();

        // Find the insertion point that keeps the list address-ordered.
        let mut prev: Option<NonNull<FreeRegion>> = None;
        let mut next = self.head;
        while let Some(region) = next {
            if region > node {
                break;
            }
            prev = next;
            next = unsafe { region.as_ref().next };
        }

        unsafe {
            node.write(FreeRegion { size: total, next });

            // Merge with the following region if the spans touch.
            if let Some(following) = next {
                if Self::end(node) == following.cast() {
                    node.as_mut().size += following.as_ref().size;
                    node.as_mut().next = following.as_ref().next;
                }
            }

            // Merge with the preceding region if the spans touch, otherwise
            // just link the new region in.
            match prev {
                Some(mut preceding) if Self::end(preceding) == node.cast() => {
                    preceding.as_mut().size += node.as_ref().size;
                    preceding.as_mut().next = node.as_ref().next;
                }
                Some(mut preceding) => preceding.as_mut().next = Some(node),
                None => self.head = Some(node),
            }
        }
    }

    /// One past the last byte of `region`'s span.
    unsafe fn end(region: NonNull<FreeRegion>) -> NonNull<u8> {
        unsafe { region.cast::<u8>().add(region.as_ref().size) }
    }

    /// Total free bytes across all regions.
    pub(crate) fn free_bytes(&self) -> usize {
        self.regions().map(|region| unsafe { region.as_ref().size }).sum()
    }

    /// Number of free regions currently on the list.
    pub(crate) fn region_count(&self) -> usize {
        self.regions().count()
    }

    /// Size of the largest single free region. The largest request that can
    /// still succeed, before facade overhead.
    pub(crate) fn largest_region(&self) -> usize {
        self.regions()
            .map(|region| unsafe { region.as_ref().size })
            .max()
            .unwrap_or(0)
    }

    fn regions(&self) -> impl Iterator<Item = NonNull<FreeRegion>> + '_ {
        let mut current = self.head;
        core::iter::from_fn(move || {
            let region = current?;
            current = unsafe { region.as_ref().next };
            Some(region)
        })
    }
}
