//! Records describing how a chunked body arrived on the wire.
//!
//! These are produced by the chunked decoder and attached to the completed
//! body so the caller can inspect the original chunk boundaries and the
//! trailing header block, even though the payload itself is delivered as a
//! plain byte stream.

/// One chunk of a chunked transfer encoded body.
///
/// `started_at` is the offset of the chunk's payload within the reassembled
/// body (not within the wire form), so consecutive chunks tile the body:
/// `chunk[n+1].started_at() == chunk[n].started_at() + chunk[n].size()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    started_at: u64,
    size: u64,
}

impl Chunk {
    pub(crate) fn new(started_at: u64, size: u64) -> Self {
        Self { started_at, size }
    }

    /// Offset of the chunk payload relative to the start of the body.
    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    /// Declared size of the chunk in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A header-like field from the trailing block after the terminal chunk.
///
/// A trailer line with a colon but nothing after it is still recorded, with
/// an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingField {
    name: String,
    value: String,
}

impl TrailingField {
    pub(crate) fn new(name: String, value: String) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Everything the chunked decoder learned about a body's wire form.
///
/// Only produced when the body actually used chunked transfer encoding; a
/// non-chunked body yields no `ChunkedInputInfo` at all rather than an empty
/// one, so "not chunked" and "chunked but empty" stay distinguishable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedInputInfo {
    chunks: Vec<Chunk>,
    trailing_fields: Vec<TrailingField>,
}

impl ChunkedInputInfo {
    pub(crate) fn new(chunks: Vec<Chunk>, trailing_fields: Vec<TrailingField>) -> Self {
        Self { chunks, trailing_fields }
    }

    /// Number of non-terminal chunks seen on the wire.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk records in the order they were decoded.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of trailing fields after the terminal chunk.
    pub fn field_count(&self) -> usize {
        self.trailing_fields.len()
    }

    /// Trailing fields in the order they appeared on the wire.
    pub fn trailing_fields(&self) -> &[TrailingField] {
        &self.trailing_fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_tile_the_body() {
        let info = ChunkedInputInfo::new(
            vec![Chunk::new(0, 6), Chunk::new(6, 1), Chunk::new(7, 6)],
            Vec::new(),
        );

        assert_eq!(info.chunk_count(), 3);
        for pair in info.chunks().windows(2) {
            assert_eq!(pair[1].started_at(), pair[0].started_at() + pair[0].size());
        }
    }

    #[test]
    fn empty_info_is_still_chunked_input() {
        let info = ChunkedInputInfo::default();
        assert_eq!(info.chunk_count(), 0);
        assert_eq!(info.field_count(), 0);
    }
}
