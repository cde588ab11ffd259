//! Decoder implementation for message payloads.
//!
//! This module provides a unified decoder over the different body framings:
//! - Content-Length based payloads
//! - Chunked transfer encoding
//! - Messages with no body
//!
//! The framing is chosen by the caller (typically derived from the
//! `Transfer-Encoding` and `Content-Length` headers) and handed in as a
//! [`PayloadSize`]. Only the chunked strategy produces a
//! [`ChunkedInputInfo`](crate::protocol::ChunkedInputInfo) with its terminal
//! item; the other two finish with `Eof(None)`, which is the explicit
//! "no chunked input" marker rather than an empty description.

use crate::codec::chunked_decoder::ChunkedDecoder;
use crate::codec::length_decoder::LengthDecoder;
use crate::protocol::{ChunkError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// A unified decoder for handling message payloads.
///
/// This decoder supports three payload types:
/// - Fixed length payloads (using Content-Length)
/// - Chunked transfer encoding
/// - No body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    /// The specific decoding strategy to use
    kind: Kind,
}

/// Enum representing different payload decoding strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// Decode payload with a fixed content length
    Length(LengthDecoder),

    /// Decode payload using chunked transfer encoding
    Chunked(ChunkedDecoder),

    /// Handle messages with no body
    NoBody,
}

impl PayloadDecoder {
    /// Creates a PayloadDecoder for messages with no body.
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    /// Creates a PayloadDecoder for chunked transfer encoding.
    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    /// Creates a PayloadDecoder for a fixed-length payload.
    ///
    /// # Arguments
    /// * `size` - The expected content length in bytes
    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    /// Returns whether this decoder handles chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        matches!(&self.kind, Kind::Chunked(_))
    }

    /// Returns whether this decoder handles messages with no body.
    pub fn is_empty(&self) -> bool {
        matches!(&self.kind, Kind::NoBody)
    }

    /// Returns whether this decoder handles fixed-length payloads.
    pub fn is_fix_length(&self) -> bool {
        matches!(&self.kind, Kind::Length(_))
    }
}

/// Builds the decoder matching the framing the header layer discovered.
impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => Self::fix_length(size),
            PayloadSize::Chunked => Self::chunked(),
            PayloadSize::Empty => Self::empty(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ChunkError;

    /// Decodes bytes from the input buffer using the appropriate strategy.
    ///
    /// Delegates to the specific decoder implementation; no-body messages
    /// yield EOF immediately.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof(None))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_payload_size() {
        assert!(PayloadDecoder::from(PayloadSize::new_chunked()).is_chunked());
        assert!(PayloadDecoder::from(PayloadSize::new_length(42)).is_fix_length());
        assert!(PayloadDecoder::from(PayloadSize::new_empty()).is_empty());
    }

    #[test]
    fn non_chunked_body_yields_no_chunked_input() {
        let mut buffer: BytesMut = BytesMut::from(&b"01234567890123456789"[..]);
        let mut decoder = PayloadDecoder::from(PayloadSize::new_length(20));

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap().len(), 20);

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        // "no chunked input" is distinct from a chunked body with no chunks
        assert!(eof.into_chunked_info().is_none());
    }

    #[test]
    fn empty_body_yields_no_chunked_input() {
        let mut buffer = BytesMut::new();
        let mut decoder = PayloadDecoder::empty();

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
        assert!(eof.into_chunked_info().is_none());
    }

    #[test]
    fn chunked_body_yields_chunked_input() {
        let mut buffer: BytesMut = BytesMut::from(&b"3\r\nabc\r\n0\r\n\r\n"[..]);
        let mut decoder = PayloadDecoder::from(PayloadSize::new_chunked());

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&chunk.as_bytes().unwrap()[..], b"abc");

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        let info = eof.into_chunked_info().unwrap();
        assert_eq!(info.chunk_count(), 1);
    }
}
