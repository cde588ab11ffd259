use bytes::Bytes;

use crate::protocol::ChunkedInputInfo;

/// Represents an item in the decoded body stream.
///
/// The body decoders produce data chunks followed by a terminal `Eof`. When
/// the body used chunked transfer encoding, `Eof` carries the
/// [`ChunkedInputInfo`] describing its wire form; for any other framing it
/// carries `None` — the distinct "no chunked input" marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A piece of the body payload
    Chunk(Bytes),
    /// Marks the end of the body stream
    Eof(Option<ChunkedInputInfo>),
}

/// Represents the size information of a message body.
///
/// This is the narrow interface between the header-parsing layer and the
/// body decoders: it tells them how the payload is framed on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    pub fn new_length(length: u64) -> Self {
        PayloadSize::Length(length)
    }

    pub fn new_chunked() -> Self {
        PayloadSize::Chunked
    }

    pub fn new_empty() -> Self {
        PayloadSize::Empty
    }

    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl PayloadItem {
    /// Returns true if this item represents the end of the body stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof(_))
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Returns a reference to the contained bytes if this is a `Chunk`
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof(_) => None,
        }
    }

    /// Consumes the item and returns the contained bytes if this is a `Chunk`
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof(_) => None,
        }
    }

    /// Returns the chunked input description if this is an `Eof` for a
    /// chunked body
    pub fn chunked_info(&self) -> Option<&ChunkedInputInfo> {
        match self {
            PayloadItem::Chunk(_) => None,
            PayloadItem::Eof(info) => info.as_ref(),
        }
    }

    /// Consumes the item and returns the chunked input description, if any
    pub fn into_chunked_info(self) -> Option<ChunkedInputInfo> {
        match self {
            PayloadItem::Chunk(_) => None,
            PayloadItem::Eof(info) => info,
        }
    }
}
