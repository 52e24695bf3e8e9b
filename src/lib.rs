//! Fixed-capacity arena allocator.
//!
//! Every dynamic allocation in the process is served from one statically
//! sized arena; memory use is bounded at compile time and nothing is ever
//! requested from or returned to the operating system. Intended for
//! programs that need deterministic memory behaviour, where heap growth is
//! a bug rather than a feature.
//!
//! ```text
//!                          Arena (MEMORY_CAPACITY bytes, static)
//! +----------------------------------------------------------------------+
//! | +--------+---------+  +--------+---------+  +---------------------+  |
//! | | Header | Payload |  | Header | Payload |  |     Free region     |  |
//! | +--------+---------+  +--------+---------+  +---------------------+  |
//! +----------------------------------------------------------------------+
//!              ^ pointers handed to callers point at payloads
//! ```
//!
//! The pieces, bottom up:
//!
//! - `freelist`: intrusive, address-ordered list of free regions.
//!   First-fit allocation with splitting, coalescing deallocation.
//! - `block`: the header written in front of every payload, recording the
//!   block's total reserved size, and the facade that normalizes request
//!   sizes.
//! - `arena`: the static buffer and the lock-guarded singleton engine.
//! - [`ArenaAlloc`]: [`core::alloc::GlobalAlloc`] implementation; install
//!   it with `#[global_allocator]` to intercept every allocation call site
//!   in the process.
//! - [`UniquePtr`] / [`UniqueArray`]: single-owner handles built on the
//!   facade, with fallible "for overwrite" constructors.
//!
//! ```rust,ignore
//! use arenalloc::ArenaAlloc;
//!
//! #[global_allocator]
//! static ALLOCATOR: ArenaAlloc = ArenaAlloc::new();
//!
//! fn main() {
//!     // Box, Vec, String, ... all live inside the arena now.
//!     let boxed = Box::new(42);
//!     println!("{boxed} at {boxed:p}, {} bytes free", ALLOCATOR.free_bytes());
//! }
//! ```
//!
//! Allocation failure is surfaced as a null pointer (or `None` from the
//! owning-pointer constructors); the standard library escalates that to the
//! usual out-of-memory abort on infallible paths. Freeing a pointer the
//! arena never handed out, or freeing one twice, is undefined behaviour by
//! contract: detecting it would cost every well-behaved call site.

mod arena;
mod block;
mod config;
mod freelist;
mod global;
mod unique;
mod utils;

pub use config::MEMORY_CAPACITY;
pub use global::ArenaAlloc;
pub use unique::{UniqueArray, UniquePtr};
