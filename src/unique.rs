//! Single-owner handles over arena memory.
//!
//! [`UniquePtr`] owns one value, [`UniqueArray`] owns a run of elements and
//! remembers how many: freeing the raw bytes never needs the count (the
//! block header carries the size), but running the elements' destructors
//! does, so the deleter records it at construction time.
//!
//! Both handles allocate and free through the facade directly, so they work
//! the same whether or not [`crate::ArenaAlloc`] is installed as the global
//! allocator. Both are move-only by construction; dropping one frees its
//! block exactly once.
//!
//! The scalar/array split is carried by the types themselves: an array of
//! elements can only be built through [`UniqueArray`], and a fixed-size
//! array value `[T; N]` travels through [`UniquePtr`] as an ordinary value.
//! There is no pointer-decay path by which one could be freed as the other,
//! so the mismatch the original design had to reject is unrepresentable
//! here.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ops::{Deref, DerefMut};
use core::ptr::{self, NonNull};

use crate::arena::with_regions;
use crate::block;

/// Move-only owner of one value in the arena.
pub struct UniquePtr<T> {
    ptr: NonNull<T>,
    marker: PhantomData<T>,
}

impl<T> UniquePtr<T> {
    /// Allocates a block for `value` and moves it in. Returns `None` when
    /// the arena cannot serve the request; the value is dropped in that
    /// case.
    pub fn try_new(value: T) -> Option<Self> {
        let mut uninit = Self::try_new_uninit()?;
        uninit.write(value);
        Some(unsafe { uninit.assume_init() })
    }

    /// Allocates storage for one `T` without initializing it ("for
    /// overwrite"). Returns `None` on exhaustion; never panics.
    pub fn try_new_uninit() -> Option<UniquePtr<MaybeUninit<T>>> {
        let raw = with_regions(|regions| block::allocate_block(regions, Layout::new::<T>()));
        let ptr = NonNull::new(raw.cast::<MaybeUninit<T>>())?;
        Some(UniquePtr {
            ptr,
            marker: PhantomData,
        })
    }

    /// Raw payload pointer. The handle keeps ownership.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T> UniquePtr<MaybeUninit<T>> {
    /// Converts to an initialized handle.
    ///
    /// **SAFETY**: the value must have been fully initialized, otherwise
    /// dropping the returned handle runs `T`'s destructor on garbage.
    pub unsafe fn assume_init(self) -> UniquePtr<T> {
        let ptr = self.ptr.cast::<T>();
        core::mem::forget(self);
        UniquePtr {
            ptr,
            marker: PhantomData,
        }
    }
}

impl<T> Deref for UniquePtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for UniquePtr<T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for UniquePtr<T> {
    fn drop(&mut self) {
        let payload = self.ptr.cast::<u8>().as_ptr();
        unsafe { self.ptr.drop_in_place() };
        with_regions(|regions| unsafe { block::deallocate_block(regions, payload) });
    }
}

unsafe impl<T: Send> Send for UniquePtr<T> {}
unsafe impl<T: Sync> Sync for UniquePtr<T> {}

/// Move-only owner of `len` elements in the arena.
pub struct UniqueArray<T> {
    ptr: NonNull<T>,
    /// Element count, recorded at construction for the element-aware drop.
    len: usize,
}

impl<T> UniqueArray<T> {
    /// Allocates storage for `len` elements without initializing them ("for
    /// overwrite"). Returns `None` on exhaustion or when the layout
    /// overflows; never panics.
    pub fn try_new_uninit(len: usize) -> Option<UniqueArray<MaybeUninit<T>>> {
        let layout = Layout::array::<MaybeUninit<T>>(len).ok()?;
        let raw = with_regions(|regions| block::allocate_block(regions, layout));
        let ptr = NonNull::new(raw.cast::<MaybeUninit<T>>())?;
        Some(UniqueArray { ptr, len })
    }

    /// Number of elements recorded at construction.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw pointer to the first element. The handle keeps ownership.
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T: Copy> UniqueArray<T> {
    /// Allocates `len` elements and fills them with `value`.
    pub fn try_new_filled(len: usize, value: T) -> Option<Self> {
        let mut array = Self::try_new_uninit(len)?;
        for element in array.iter_mut() {
            element.write(value);
        }
        Some(unsafe { array.assume_init() })
    }
}

impl<T> UniqueArray<MaybeUninit<T>> {
    /// Converts to an initialized handle.
    ///
    /// **SAFETY**: all `len` elements must have been initialized.
    pub unsafe fn assume_init(self) -> UniqueArray<T> {
        let array = UniqueArray {
            ptr: self.ptr.cast::<T>(),
            len: self.len,
        };
        core::mem::forget(self);
        array
    }
}

impl<T> Deref for UniqueArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> DerefMut for UniqueArray<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> Drop for UniqueArray<T> {
    fn drop(&mut self) {
        let payload = self.ptr.cast::<u8>().as_ptr();
        unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len)) };
        with_regions(|regions| unsafe { block::deallocate_block(regions, payload) });
    }
}

unsafe impl<T: Send> Send for UniqueArray<T> {}
unsafe impl<T: Sync> Sync for UniqueArray<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MEMORY_CAPACITY;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DropCounter<'a>(&'a AtomicUsize);

    impl Drop for DropCounter<'_> {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn scalar_owns_and_drops_its_value() {
        let _serial = crate::arena::test_guard();
        let drops = AtomicUsize::new(0);

        let handle = UniquePtr::try_new(DropCounter(&drops)).unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scalar_value_roundtrip() {
        let _serial = crate::arena::test_guard();
        let mut handle = UniquePtr::try_new(41u64).unwrap();
        *handle += 1;
        assert_eq!(*handle, 42);
    }

    #[test]
    fn uninit_scalar_is_written_then_initialized() {
        let _serial = crate::arena::test_guard();
        let mut handle = UniquePtr::<u32>::try_new_uninit().unwrap();
        handle.write(7);
        let handle = unsafe { handle.assume_init() };
        assert_eq!(*handle, 7);
    }

    #[test]
    fn array_records_its_element_count() {
        let _serial = crate::arena::test_guard();
        let array = UniqueArray::<u8>::try_new_filled(37, 0xFF).unwrap();
        assert_eq!(array.len(), 37);
        assert!(array.iter().all(|&byte| byte == 0xFF));
    }

    #[test]
    fn array_drops_every_element() {
        let _serial = crate::arena::test_guard();
        let drops = AtomicUsize::new(0);

        let mut array = UniqueArray::<DropCounter>::try_new_uninit(5).unwrap();
        for slot in array.iter_mut() {
            slot.write(DropCounter(&drops));
        }
        let array = unsafe { array.assume_init() };

        drop(array);
        assert_eq!(drops.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn array_is_usable_as_a_slice() {
        let _serial = crate::arena::test_guard();
        let mut array = UniqueArray::<u32>::try_new_filled(8, 0).unwrap();
        for (index, element) in array.iter_mut().enumerate() {
            *element = index as u32;
        }
        assert_eq!(array[3], 3);
        assert_eq!(array.iter().sum::<u32>(), 28);
    }

    #[test]
    fn exhaustion_yields_none_not_a_panic() {
        let _serial = crate::arena::test_guard();
        assert!(UniqueArray::<u8>::try_new_uninit(MEMORY_CAPACITY + 1).is_none());
        assert!(UniquePtr::<[u8; MEMORY_CAPACITY + 1]>::try_new_uninit().is_none());
    }

    #[test]
    fn freed_blocks_are_reusable() {
        let _serial = crate::arena::test_guard();
        let free_before = crate::ArenaAlloc::new().free_bytes();

        let a = UniqueArray::<u8>::try_new_filled(1024, 1).unwrap();
        let b = UniqueArray::<u8>::try_new_filled(1024, 2).unwrap();
        drop(a);
        drop(b);

        assert_eq!(crate::ArenaAlloc::new().free_bytes(), free_before);
    }
}
