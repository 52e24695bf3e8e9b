//! Process-wide interception of the language's allocation entry points.
//!
//! [`ArenaAlloc`] implements [`GlobalAlloc`], so installing it with
//! `#[global_allocator]` routes every dynamic allocation in the process
//! (`Box`, `Vec`, `String`, allocations inside dependencies, allocations
//! made during static initialization) through the fixed arena:
//!
//! ```rust,ignore
//! use arenalloc::ArenaAlloc;
//!
//! #[global_allocator]
//! static ALLOCATOR: ArenaAlloc = ArenaAlloc::new();
//! ```
//!
//! Failure contracts: every method here returns null on exhaustion and
//! never panics. For the language's infallible paths (`Box::new` and
//! friends) the standard library turns that null into the out-of-memory
//! abort via `handle_alloc_error`; fallible paths (`try_reserve`) see the
//! failure directly. Nothing here blocks beyond the engine's spin lock and
//! nothing here allocates on its own.

use core::alloc::{GlobalAlloc, Layout};

use crate::arena::with_regions;
use crate::block;
use crate::config::MEMORY_CAPACITY;

/// Handle to the process-wide arena allocator.
///
/// The type itself carries no state; all state lives in the lock-guarded
/// singleton engine, so any number of `ArenaAlloc` values refer to the same
/// arena.
pub struct ArenaAlloc;

impl ArenaAlloc {
    /// Const so the value can be installed in a `static` item.
    pub const fn new() -> Self {
        Self
    }

    /// Total capacity of the arena in bytes.
    pub const fn capacity(&self) -> usize {
        MEMORY_CAPACITY
    }

    /// Bytes currently free, summed over all free regions. A request this
    /// large is not guaranteed to succeed; see
    /// [`largest_free_region`](Self::largest_free_region).
    pub fn free_bytes(&self) -> usize {
        with_regions(|regions| regions.free_bytes())
    }

    /// Size of the largest contiguous free region. The hard upper bound on
    /// the next allocation, header overhead included.
    pub fn largest_free_region(&self) -> usize {
        with_regions(|regions| regions.largest_region())
    }

    /// Number of free regions the arena is currently split into.
    pub fn free_region_count(&self) -> usize {
        with_regions(|regions| regions.region_count())
    }
}

impl Default for ArenaAlloc {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for ArenaAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        with_regions(|regions| block::allocate_block(regions, layout))
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        // The layout is deliberately ignored; the block header is the sole
        // source of truth for the size being freed.
        with_regions(|regions| unsafe { block::deallocate_block(regions, ptr) });
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.alloc(layout) };
        if !ptr.is_null() {
            unsafe { ptr.write_bytes(0, layout.size()) };
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // Blocks are reserved in aligned units, so a grow often still fits
        // inside the span already paid for; shrinks always do.
        if unsafe { block::block_usable_size(ptr) } >= new_size {
            return ptr;
        }

        let new_layout = unsafe { Layout::from_size_align_unchecked(new_size, layout.align()) };
        let new_ptr = unsafe { self.alloc(new_layout) };
        if !new_ptr.is_null() {
            unsafe {
                new_ptr.copy_from_nonoverlapping(ptr, layout.size().min(new_size));
                self.dealloc(ptr, layout);
            }
        }
        new_ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    // These tests share the one static arena with every other test in the
    // binary. Tests that assert on its counters hold the crate's serial
    // test guard; all of them free everything they allocate.

    const ALLOCATOR: ArenaAlloc = ArenaAlloc::new();

    #[test]
    fn alloc_returns_usable_aligned_memory() {
        let _serial = crate::arena::test_guard();
        unsafe {
            let layout = Layout::from_size_align(64, 16).unwrap();
            let ptr = ALLOCATOR.alloc(layout);
            assert!(!ptr.is_null());
            assert_eq!(ptr.addr() % 16, 0);

            ptr.write_bytes(0x5A, 64);
            assert_eq!(ptr.add(63).read(), 0x5A);

            ALLOCATOR.dealloc(ptr, layout);
        }
    }

    #[test]
    fn dealloc_ignores_the_layout_it_is_given() {
        let _serial = crate::arena::test_guard();
        unsafe {
            let layout = Layout::from_size_align(256, 16).unwrap();
            let before = ALLOCATOR.free_bytes();
            let ptr = ALLOCATOR.alloc(layout);
            assert!(!ptr.is_null());

            // A wrong size must not corrupt the accounting: the header, not
            // the layout, decides how much is freed.
            let bogus = Layout::from_size_align(8, 8).unwrap();
            ALLOCATOR.dealloc(ptr, bogus);
            assert_eq!(ALLOCATOR.free_bytes(), before);
        }
    }

    #[test]
    fn alloc_zeroed_zeroes_the_payload() {
        let _serial = crate::arena::test_guard();
        unsafe {
            let layout = Layout::from_size_align(128, 16).unwrap();
            let ptr = ALLOCATOR.alloc_zeroed(layout);
            assert!(!ptr.is_null());
            for offset in 0..128 {
                assert_eq!(ptr.add(offset).read(), 0);
            }
            ALLOCATOR.dealloc(ptr, layout);
        }
    }

    #[test]
    fn realloc_preserves_contents_when_growing() {
        let _serial = crate::arena::test_guard();
        unsafe {
            let layout = Layout::from_size_align(32, 16).unwrap();
            let ptr = ALLOCATOR.alloc(layout);
            assert!(!ptr.is_null());
            for offset in 0..32 {
                ptr.add(offset).write(offset as u8);
            }

            let grown = ALLOCATOR.realloc(ptr, layout, 4096);
            assert!(!grown.is_null());
            for offset in 0..32 {
                assert_eq!(grown.add(offset).read(), offset as u8);
            }

            ALLOCATOR.dealloc(grown, Layout::from_size_align(4096, 16).unwrap());
        }
    }

    #[test]
    fn realloc_shrinks_in_place() {
        let _serial = crate::arena::test_guard();
        unsafe {
            let layout = Layout::from_size_align(256, 16).unwrap();
            let ptr = ALLOCATOR.alloc(layout);
            assert!(!ptr.is_null());

            let shrunk = ALLOCATOR.realloc(ptr, layout, 16);
            assert_eq!(shrunk, ptr);

            ALLOCATOR.dealloc(shrunk, layout);
        }
    }

    #[test]
    fn requests_beyond_capacity_fail_with_null() {
        let _serial = crate::arena::test_guard();
        unsafe {
            let layout = Layout::from_size_align(MEMORY_CAPACITY + 1, 16).unwrap();
            assert!(ALLOCATOR.alloc(layout).is_null());
        }
    }

    #[test]
    fn concurrent_allocations_are_serialized_by_the_lock() {
        let _serial = crate::arena::test_guard();
        let handles: Vec<_> = (0..8)
            .map(|seed| {
                thread::spawn(move || unsafe {
                    let layout = Layout::from_size_align(64 + seed * 16, 16).unwrap();
                    for _ in 0..100 {
                        let ptr = ALLOCATOR.alloc(layout);
                        assert!(!ptr.is_null());
                        ptr.write_bytes(seed as u8, layout.size());
                        assert_eq!(ptr.read(), seed as u8);
                        ALLOCATOR.dealloc(ptr, layout);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
