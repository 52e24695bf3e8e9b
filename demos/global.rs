//! Installs the arena as the process-wide allocator and exercises it
//! through the standard library: every `Box`, `Vec` and `String` below is
//! served from the fixed arena, as is anything the runtime allocates before
//! `main`.

use std::thread;

use arenalloc::ArenaAlloc;

#[global_allocator]
static ALLOCATOR: ArenaAlloc = ArenaAlloc::new();

fn main() {
    println!(
        "Arena capacity {} bytes, {} free at main()",
        ALLOCATOR.capacity(),
        ALLOCATOR.free_bytes()
    );

    // Box example
    let val_box = Box::new(22);
    println!("Box Value: {}, At: {:p}", val_box, val_box);

    // Vec example: growth goes through realloc
    let mut v = Vec::new();
    for i in 0..5 {
        v.push(i * 10);
        println!("Added {}; Capacity: {}; At: {:p}", v[i], v.capacity(), v.as_ptr());
    }

    // String example
    let msg = String::from("Arena Testing");
    println!("\nString '{}' - At: {:p}", msg, msg.as_ptr());

    // Free-then-reallocate: first-fit hands the same region back.
    let p1 = Box::new(2.22);
    let addr_p1 = format!("{:p}", p1);
    println!("P1 Allocated at: {addr_p1}");

    drop(p1);
    println!("P1 Deallocated");

    let p2 = Box::new(2.22);
    println!("P2 at: {:p}", p2);

    // Merge example: freeing two adjacent blocks must leave a region large
    // enough for one block of their combined size.
    let a = Box::new([0u8; 64]);
    let b = Box::new([0u8; 64]);
    let ptr_a = a.as_ptr();

    drop(a);
    drop(b);

    let c = Box::new([0u8; 128]);
    let ptr_c = c.as_ptr();

    if ptr_a == ptr_c {
        println!("Correctly reused at {ptr_c:p}");
    } else {
        println!("Not correctly reused. A was at {ptr_a:p} and C is at {ptr_c:p}");
    }

    // Threads allocate through the same lock-guarded arena.
    let t1 = thread::spawn(|| {
        let _ = Box::new(222);
    });

    let t2 = thread::spawn(|| {
        let _ = Box::new(222);
    });

    t1.join().unwrap();
    t2.join().unwrap();

    println!(
        "{} bytes free across {} region(s) at exit",
        ALLOCATOR.free_bytes(),
        ALLOCATOR.free_region_count()
    );
}
