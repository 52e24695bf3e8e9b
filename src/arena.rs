//! The arena: one statically allocated buffer plus the process-wide engine
//! that owns it.
//!
//! The buffer is plain `.bss` storage, so it exists before any code runs and
//! is never torn down; process exit ends its lifetime implicitly. The engine
//! guarding it is initialized lazily, under the same lock that serializes
//! every allocate/deallocate, the first time anything asks for memory. That
//! initialization writes one region header into the buffer and nothing
//! else, so it is safe to trigger from allocations made while other statics
//! are still being constructed.

use core::ptr::NonNull;

use spin::Mutex;

use crate::config::MEMORY_CAPACITY;
use crate::freelist::{FreeRegionList, MIN_ALIGNMENT};

/// Backing storage, aligned so the first region header (and therefore every
/// address the engine derives from it) starts on the minimum alignment.
#[repr(align(16))]
struct ArenaStorage([u8; MEMORY_CAPACITY]);

const _: () = assert!(MEMORY_CAPACITY % MIN_ALIGNMENT == 0);
const _: () = assert!(align_of::<ArenaStorage>() == MIN_ALIGNMENT);

static mut STORAGE: ArenaStorage = ArenaStorage([0; MEMORY_CAPACITY]);

/// The one engine every allocation in the process goes through. The mutex
/// spans the whole of each allocate/deallocate: free-list traversal, splits
/// and merges are structural edits that cannot tolerate concurrent
/// mutation.
static REGIONS: Mutex<FreeRegionList> = Mutex::new(FreeRegionList::new());

/// Runs `f` with exclusive access to the engine, initializing it on first
/// use.
pub(crate) fn with_regions<F, R>(f: F) -> R
where
    F: FnOnce(&mut FreeRegionList) -> R,
{
    let mut regions = REGIONS.lock();
    if !regions.is_initialized() {
        // Raw pointer into the static buffer; no reference to the static
        // mut is ever formed.
        let base = unsafe { NonNull::new_unchecked((&raw mut STORAGE.0).cast::<u8>()) };
        unsafe { regions.init(base, MEMORY_CAPACITY) };
    }
    f(&mut *regions)
}

/// Serializes tests that assert on the shared arena's counters; the test
/// harness otherwise runs them on concurrent threads against the one
/// singleton.
#[cfg(test)]
pub(crate) fn test_guard() -> std::sync::MutexGuard<'static, ()> {
    static SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());
    SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_is_initialized_on_first_use() {
        with_regions(|regions| {
            assert!(regions.is_initialized());
            assert_eq!(regions.capacity(), MEMORY_CAPACITY);
        });
    }

    #[test]
    fn free_bytes_never_exceed_capacity() {
        with_regions(|regions| {
            assert!(regions.free_bytes() <= MEMORY_CAPACITY);
        });
    }
}
