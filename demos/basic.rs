//! Exercises the allocator through the raw `GlobalAlloc` surface and the
//! owning-pointer handles, without installing it as the global allocator.

use std::alloc::{GlobalAlloc, Layout};

use arenalloc::{ArenaAlloc, UniqueArray, UniquePtr};

fn log_alloc(addr: *mut u8, layout: Layout) {
    println!("Requested {} bytes of memory", layout.size());
    println!("Received this address: {addr:?}");
}

fn main() {
    let allocator = ArenaAlloc::new();
    println!(
        "Arena: {} bytes capacity, {} free",
        allocator.capacity(),
        allocator.free_bytes()
    );

    unsafe {
        let l1 = Layout::new::<u64>();
        let addr1 = allocator.alloc(l1);
        log_alloc(addr1, l1);

        let l2 = Layout::array::<u8>(8).unwrap();
        let addr2 = allocator.alloc(l2);
        log_alloc(addr2, l2);

        println!("Free after two allocations: {}", allocator.free_bytes());

        allocator.dealloc(addr1, l1);
        allocator.dealloc(addr2, l2);
    }

    println!(
        "Free after releasing them:   {} ({} region)",
        allocator.free_bytes(),
        allocator.free_region_count()
    );

    // The same arena through the owning handles.
    let value = UniquePtr::try_new(42u64).expect("arena exhausted");
    println!("UniquePtr value: {} at {:p}", *value, value.as_ptr());

    let mut table = UniqueArray::<u32>::try_new_filled(8, 0).expect("arena exhausted");
    for (index, slot) in table.iter_mut().enumerate() {
        *slot = (index * index) as u32;
    }
    println!("UniqueArray of {} squares: {:?}", table.len(), &table[..]);
}
