//! VM parameters

/// Size in bytes of a value cell. Cells are wide enough to hold any of the
/// five supported operand widths; narrower writes touch only the low bits.
pub const CELL_SIZE: usize = 8;

/// Size of a single spill-stack chunk, in bytes.
///
/// Matches the source bytecode interpreter's `STACK_CHUNKSIZE`: large enough
/// that a handful of recursive call frames fit in one chunk, small enough
/// that a misbehaving recursion depth exhausts it quickly rather than
/// growing the process unboundedly.
pub const STACK_CHUNK_SIZE: usize = 16 * 1024;

/// Alignment unit used for spill-stack bookkeeping (the widest type the
/// allocator rounds block sizes to a multiple of).
pub const STACK_ALIGN: usize = 8;

/// Size in bytes of the trailer appended to every spill-stack allocation,
/// recording the previous top-of-stack block size in units of [`STACK_ALIGN`].
pub const STACK_TRAILER_SIZE: usize = 2;
