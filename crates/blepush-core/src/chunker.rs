//! Payload chunking
//!
//! Splits a payload into ordered, bounded-size segments. The final segment
//! is shortened to whatever remains, so no chunk ever reaches past the end
//! of the payload.

use std::ops::Range;

// ----------------------------------------------------------------------------
// Chunk
// ----------------------------------------------------------------------------

/// Read-only view into a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the transfer, starting at 0
    pub index: usize,
    /// Byte offset into the payload
    pub offset: usize,
    /// Number of bytes, never zero
    pub len: usize,
}

impl Chunk {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Borrow this chunk's bytes from the payload it was cut from
    pub fn slice<'a>(&self, payload: &'a [u8]) -> &'a [u8] {
        &payload[self.range()]
    }
}

// ----------------------------------------------------------------------------
// Chunker
// ----------------------------------------------------------------------------

/// Restartable chunk plan for a payload of known length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    payload_len: usize,
    chunk_size: usize,
}

impl Chunker {
    /// Returns `None` for a zero chunk size
    pub fn new(payload_len: usize, chunk_size: usize) -> Option<Self> {
        (chunk_size > 0).then_some(Self {
            payload_len,
            chunk_size,
        })
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// `ceil(payload_len / chunk_size)`
    pub fn chunk_count(&self) -> usize {
        self.payload_len.div_ceil(self.chunk_size)
    }

    /// Chunk at `index`, or `None` past the end
    pub fn chunk(&self, index: usize) -> Option<Chunk> {
        let offset = index.checked_mul(self.chunk_size)?;
        if offset >= self.payload_len {
            return None;
        }
        let len = self.chunk_size.min(self.payload_len - offset);
        Some(Chunk { index, offset, len })
    }

    /// Iterate all chunks in ascending offset order
    pub fn iter(&self) -> ChunkIter {
        ChunkIter {
            chunker: *self,
            next: 0,
        }
    }
}

impl IntoIterator for Chunker {
    type Item = Chunk;
    type IntoIter = ChunkIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`Chunker`]'s plan
#[derive(Debug, Clone)]
pub struct ChunkIter {
    chunker: Chunker,
    next: usize,
}

impl Iterator for ChunkIter {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunker.chunk(self.next)?;
        self.next += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.chunker.chunk_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIter {}
