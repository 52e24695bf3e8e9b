//! Build-time configuration of the allocator.
//!
//! Everything here is a plain constant consumed by the rest of the crate.
//! Projects embedding this allocator are expected to tune these values for
//! their target and rebuild; nothing is read at runtime.

/// Total size in bytes of the arena every allocation in the process is
/// served from. The arena never grows past this, so this is the hard upper
/// bound on dynamic memory use.
///
/// Must be a multiple of the engine's minimum alignment (16 bytes).
pub const MEMORY_CAPACITY: usize = 16 * 1024 * 1024;
