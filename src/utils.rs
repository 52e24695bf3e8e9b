//! Helper functions for the allocator. These don't particularly belong to
//! any concrete module of the program.

/// It aligns `to_be_aligned` upwards using `alignment`.
///
/// This is used to round payload sizes up to [`crate::freelist::MIN_ALIGNMENT`]
/// and to place payload pointers on the alignment a [`core::alloc::Layout`]
/// asks for. `alignment` must be a power of two.
pub(crate) const fn align(to_be_aligned: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (to_be_aligned + alignment - 1) & !(alignment - 1)
}
