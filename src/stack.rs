//! Chunked bump-allocator spill stack.
//!
//! Call frames live here rather than on the Rust call stack or the heap
//! per-instruction: a linked list of fixed-size chunks is bump-allocated
//! within, and deallocation is required to happen in strict LIFO order.
//! Each allocation is suffixed by a trailer recording the previous
//! top-of-stack block size, so `free` can restore that size in O(1) without
//! a separate metadata stack.

use tracing::warn;

use crate::consts::{STACK_ALIGN, STACK_CHUNK_SIZE, STACK_TRAILER_SIZE};
use crate::error::StackError;

fn round_up(n: usize, align: usize) -> usize {
    (n + align - 1) / align * align
}

struct StackChunk {
    data: Vec<u8>,
    used: usize,
}

impl StackChunk {
    fn new() -> Self {
        StackChunk {
            data: vec![0u8; STACK_CHUNK_SIZE],
            used: 0,
        }
    }
}

/// A handle to a live spill-stack allocation. Opaque to callers beyond
/// indexing the region it names; there is no raw pointer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackHandle {
    chunk_index: usize,
    offset: usize,
    len: usize,
}

impl StackHandle {
    /// Length in bytes of the caller-visible payload (excludes the trailer).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Chunked LIFO allocator backing activation-frame value regions.
pub struct SpillStack {
    chunks: Vec<StackChunk>,
    /// Size, in [`STACK_ALIGN`] units, of the most recent live allocation.
    last_size: u16,
    current_chunk: usize,
}

impl SpillStack {
    /// Creates an empty stack with one chunk linked.
    pub fn new() -> Self {
        SpillStack {
            chunks: vec![StackChunk::new()],
            last_size: 0,
            current_chunk: 0,
        }
    }

    /// Allocates `len` bytes, returning a handle to the payload region.
    /// Fails if `len` plus the trailer does not fit a single chunk.
    pub fn alloc(&mut self, len: usize) -> Result<StackHandle, StackError> {
        let rounded = round_up(len + STACK_TRAILER_SIZE, STACK_ALIGN);
        if rounded >= STACK_CHUNK_SIZE {
            return Err(StackError::AllocationTooLarge {
                requested: len,
                capacity: STACK_CHUNK_SIZE,
            });
        }

        if self.chunks[self.current_chunk].used + rounded > STACK_CHUNK_SIZE {
            self.chunks.push(StackChunk::new());
            self.current_chunk += 1;
        }

        let chunk = &mut self.chunks[self.current_chunk];
        let offset = chunk.used;
        let trailer_off = offset + len;
        chunk.data[trailer_off..trailer_off + STACK_TRAILER_SIZE]
            .copy_from_slice(&self.last_size.to_le_bytes());
        chunk.used += rounded;

        let block_units = (rounded / STACK_ALIGN) as u16;
        self.last_size = block_units;

        Ok(StackHandle {
            chunk_index: self.current_chunk,
            offset,
            len,
        })
    }

    /// Frees the most recent allocation. `handle` must name the current
    /// top-of-stack block; any other handle is refused without mutating the
    /// stack, matching the source's "left intact" free-order contract.
    pub fn free(&mut self, handle: StackHandle) -> Result<(), StackError> {
        if self.chunks.is_empty() || self.last_size == 0 {
            return Err(StackError::FreeOnEmptyStack);
        }

        let rounded = round_up(handle.len + STACK_TRAILER_SIZE, STACK_ALIGN);
        let expected_units = (rounded / STACK_ALIGN) as u16;
        let expected_offset = self.chunks[self.current_chunk].used.checked_sub(rounded);

        if handle.chunk_index != self.current_chunk
            || expected_units != self.last_size
            || Some(handle.offset) != expected_offset
        {
            let expected_offset = expected_offset.unwrap_or(0);
            warn!(
                expected = self.last_size,
                actual = expected_units,
                expected_offset,
                actual_offset = handle.offset,
                "spill stack free refused: not the top-of-stack block"
            );
            return Err(StackError::FreeOutOfOrder {
                expected: self.last_size as usize * STACK_ALIGN,
                actual: expected_units as usize * STACK_ALIGN,
            });
        }

        let trailer_off = handle.offset + handle.len;
        let chunk = &mut self.chunks[self.current_chunk];
        let prev_size = u16::from_le_bytes(
            chunk.data[trailer_off..trailer_off + STACK_TRAILER_SIZE]
                .try_into()
                .unwrap(),
        );
        chunk.used -= rounded;
        self.last_size = prev_size;

        if chunk.used == 0 && self.current_chunk > 0 {
            self.chunks.pop();
            self.current_chunk -= 1;
        }

        Ok(())
    }

    /// Mutable view of the bytes backing a live allocation.
    pub fn region_mut(&mut self, handle: StackHandle) -> &mut [u8] {
        let chunk = &mut self.chunks[handle.chunk_index];
        &mut chunk.data[handle.offset..handle.offset + handle.len]
    }

    /// Immutable view of the bytes backing a live allocation.
    pub fn region(&self, handle: StackHandle) -> &[u8] {
        let chunk = &self.chunks[handle.chunk_index];
        &chunk.data[handle.offset..handle.offset + handle.len]
    }

    /// Releases every chunk. Called unconditionally on exit from
    /// [`crate::execute`], on both success and error paths.
    pub fn destroy(&mut self) {
        self.chunks.clear();
        self.chunks.push(StackChunk::new());
        self.last_size = 0;
        self.current_chunk = 0;
    }

    /// True when no frame is currently allocated.
    pub fn is_empty(&self) -> bool {
        self.last_size == 0
    }
}

impl Default for SpillStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SpillStack {
    fn drop(&mut self) {
        self.chunks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_then_free_is_lifo() {
        let mut stack = SpillStack::new();
        let a = stack.alloc(32).unwrap();
        let b = stack.alloc(64).unwrap();
        stack.free(b).unwrap();
        stack.free(a).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn out_of_order_free_is_refused_and_stack_stays_intact() {
        let mut stack = SpillStack::new();
        let a = stack.alloc(32).unwrap();
        let b = stack.alloc(64).unwrap();
        let err = stack.free(a).unwrap_err();
        assert!(matches!(err, StackError::FreeOutOfOrder { .. }));
        // stack is untouched; freeing b (the real top) still succeeds
        stack.free(b).unwrap();
        stack.free(a).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn freeing_an_older_same_size_block_is_refused_by_offset() {
        // Same-size frames are common for recursive calls into the same
        // function; size alone must not be enough to pass the free check.
        let mut stack = SpillStack::new();
        let a = stack.alloc(48).unwrap();
        let b = stack.alloc(48).unwrap();
        let err = stack.free(a).unwrap_err();
        assert!(matches!(err, StackError::FreeOutOfOrder { .. }));
        stack.free(b).unwrap();
        stack.free(a).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn oversize_allocation_is_rejected() {
        let mut stack = SpillStack::new();
        let err = stack.alloc(STACK_CHUNK_SIZE).unwrap_err();
        assert!(matches!(err, StackError::AllocationTooLarge { .. }));
    }

    #[test]
    fn chunk_rollover_links_a_new_chunk() {
        let mut stack = SpillStack::new();
        let mut handles = Vec::new();
        for _ in 0..200 {
            handles.push(stack.alloc(128).unwrap());
        }
        assert!(stack.chunks.len() > 1);
        for handle in handles.into_iter().rev() {
            stack.free(handle).unwrap();
        }
        assert!(stack.is_empty());
    }

    #[test]
    fn destroy_resets_to_a_single_empty_chunk() {
        let mut stack = SpillStack::new();
        stack.alloc(32).unwrap();
        stack.destroy();
        assert!(stack.is_empty());
        assert_eq!(stack.chunks.len(), 1);
    }
}
