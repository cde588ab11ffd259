//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! This module provides functionality to decode message bodies that use chunked
//! transfer encoding as specified in
//! [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! Besides streaming the payload out, the decoder records how the body arrived
//! on the wire: one [`Chunk`] per size-prefixed chunk (offset and size within
//! the reassembled body) and one [`TrailingField`] per trailer line after the
//! terminal zero-sized chunk. The records are handed over with the terminal
//! [`PayloadItem::Eof`].

use crate::protocol::{Chunk, ChunkError, ChunkedInputInfo, PayloadItem, TrailingField};
use bytes::{Buf, Bytes, BytesMut};
use std::mem;
use std::task::Poll;
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

/// A decoder for handling HTTP chunked transfer encoding.
///
/// The decoder processes incoming bytes according to the chunked format:
/// - Each chunk starts with its size in hexadecimal
/// - Followed by optional extensions and CRLF
/// - Then the chunk data and CRLF
/// - A zero-sized chunk introduces the optional trailer block and the
///   terminating empty line
///
/// Decoding is resumable: all progress (current state, bytes left in the
/// current chunk, the partially read trailer line) is kept in the struct, so
/// the decoder picks up exactly where it stopped when more bytes arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    /// Offset within the reassembled body where the next chunk payload starts.
    body_offset: u64,
    chunks: Vec<Chunk>,
    trailing_fields: Vec<TrailingField>,
    trailer_line: Vec<u8>,
    info_taken: bool,
}

impl ChunkedDecoder {
    /// Creates a new ChunkedDecoder instance.
    ///
    /// The decoder starts in the Size state, ready to read the size of the first chunk.
    pub fn new() -> Self {
        Self {
            state: Size,
            remaining_size: 0,
            body_offset: 0,
            chunks: Vec::new(),
            trailing_fields: Vec::new(),
            trailer_line: Vec::new(),
            info_taken: false,
        }
    }

    fn take_info(&mut self) -> Option<ChunkedInputInfo> {
        if self.info_taken {
            return None;
        }
        self.info_taken = true;
        Some(ChunkedInputInfo::new(mem::take(&mut self.chunks), mem::take(&mut self.trailing_fields)))
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Handle whitespace after size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// Read LF after chunk size
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Accumulate one trailer line up to its CR
    Trailer,
    /// Read LF after a trailer line, record or finish
    TrailerLf,
    /// Final state after reading the last chunk
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ChunkError;

    /// Decodes chunked transfer encoded data from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when a piece of chunk payload is decoded
    /// - `Ok(Some(PayloadItem::Eof(Some(info))))` when the terminal chunk and its
    ///   trailer block have been processed; `info` is handed over once, repeated
    ///   polls yield `Eof(None)`
    /// - `Ok(None)` when more data is needed
    /// - `Err(ChunkError)` if the chunked encoding is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof(self.take_info())));
            }

            if src.is_empty() {
                // need more data
                return Ok(None);
            }

            let mut buf = None;

            self.state = match self.step(src, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.len() > 0 {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

impl ChunkedDecoder {
    /// Processes the next step in the chunked decoding state machine.
    fn step(&mut self, src: &mut BytesMut, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ChunkError>> {
        match self.state {
            Size => self.read_size(src),
            SizeLws => Self::read_size_lws(src),
            Extension => Self::read_extension(src),
            SizeLf => self.read_size_lf(src),
            Body => self.read_body(src, buf),
            BodyCr => Self::read_body_cr(src),
            BodyLf => Self::read_body_lf(src),
            Trailer => self.read_trailer(src),
            TrailerLf => self.read_trailer_lf(src),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// Reads and parses the chunk size in hexadecimal format.
    ///
    /// The size is read digit by digit until a delimiter is encountered.
    /// Supports both uppercase and lowercase hex digits.
    ///
    /// # State Transitions
    /// - On hex digit (0-9, a-f, A-F): Stay in Size state to read more digits
    /// - On whitespace (tab/space): Transition to SizeLws state
    /// - On semicolon: Transition to Extension state to handle chunk extensions
    /// - On CR: Transition to SizeLf state to finish size line
    /// - On invalid character: Return error
    fn read_size(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ChunkError>> {
        macro_rules! or_overflow {
            ($e:expr) => {
                match $e {
                    Some(val) => val,
                    None => return Poll::Ready(Err(ChunkError::ChunkSizeOverflow)),
                }
            };
        }

        let radix = 16;
        match try_next_byte!(src) {
            b @ b'0'..=b'9' => {
                self.remaining_size = or_overflow!(self.remaining_size.checked_mul(radix));
                self.remaining_size = or_overflow!(self.remaining_size.checked_add((b - b'0') as u64));
            }

            b @ b'a'..=b'f' => {
                self.remaining_size = or_overflow!(self.remaining_size.checked_mul(radix));
                self.remaining_size = or_overflow!(self.remaining_size.checked_add((b + 10 - b'a') as u64));
            }
            b @ b'A'..=b'F' => {
                self.remaining_size = or_overflow!(self.remaining_size.checked_mul(radix));
                self.remaining_size = or_overflow!(self.remaining_size.checked_add((b + 10 - b'A') as u64));
            }
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),

            _ => return Poll::Ready(Err(ChunkError::malformed_size("invalid size character"))),
        }

        Poll::Ready(Ok(Size))
    }

    /// Processes linear whitespace (LWS) after the chunk size.
    ///
    /// Only tabs and spaces are allowed after the chunk size; no more digits
    /// can follow once whitespace has been seen.
    fn read_size_lws(src: &mut BytesMut) -> Poll<Result<ChunkedState, ChunkError>> {
        match try_next_byte!(src) {
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => Poll::Ready(Err(ChunkError::malformed_size("invalid character after linear white space"))),
        }
    }

    /// Processes chunk extensions in the chunked encoding format.
    ///
    /// Extensions (`;name[=value]` pairs) are validated for shape only and
    /// then discarded; their values are never interpreted. They "end" at the
    /// next CRLF.
    ///
    /// Some implementations may not check for the CR, so to save them from
    /// themselves, we reject extensions containing a plain LF as well.
    fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, ChunkError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Err(ChunkError::malformed_size("chunk extension contains bare LF"))),
            _ => Poll::Ready(Ok(Extension)),
        }
    }

    /// Validates the LF byte after the chunk size line.
    ///
    /// This is where a completed size line becomes a [`Chunk`] record: the
    /// chunk starts at the current body offset and covers the declared size.
    ///
    /// # State Transitions
    /// - On LF with size 0: Move to Trailer state (terminal chunk)
    /// - On LF with size > 0: Move to Body state to read chunk data
    /// - On any other byte: Return error
    fn read_size_lf(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ChunkError>> {
        match try_next_byte!(src) {
            b'\n' => {
                if self.remaining_size == 0 {
                    Poll::Ready(Ok(Trailer))
                } else {
                    self.chunks.push(Chunk::new(self.body_offset, self.remaining_size));
                    self.body_offset += self.remaining_size;
                    Poll::Ready(Ok(Body))
                }
            }

            _ => Poll::Ready(Err(ChunkError::malformed_size("missing LF after chunk size"))),
        }
    }

    /// Reads the actual chunk data bytes.
    ///
    /// Reads up to `remaining_size` bytes from the input buffer; a chunk may
    /// surface as several `PayloadItem::Chunk`s when it arrives fragmented.
    fn read_body(&mut self, src: &mut BytesMut, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ChunkError>> {
        if src.is_empty() {
            return Poll::Ready(Ok(Body));
        }

        if self.remaining_size == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        // cap remaining bytes at the max capacity of usize
        let remaining = match self.remaining_size {
            r if r > usize::MAX as u64 => usize::MAX,
            r => r as usize,
        };

        let read_size = std::cmp::min(remaining, src.len());

        self.remaining_size -= read_size as u64;
        let bytes = src.split_to(read_size).freeze();
        *buf = Some(bytes);

        if self.remaining_size > 0 {
            Poll::Ready(Ok(Body))
        } else {
            Poll::Ready(Ok(BodyCr))
        }
    }

    /// Validates the CR byte after chunk data.
    fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ChunkError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            _ => Poll::Ready(Err(ChunkError::MalformedChunkTerminator)),
        }
    }

    /// Validates the LF byte after chunk data.
    ///
    /// # State Transitions
    /// - On LF: Move back to Size state for next chunk
    /// - On any other byte: Return error
    fn read_body_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ChunkError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(Size)),
            _ => Poll::Ready(Err(ChunkError::MalformedChunkTerminator)),
        }
    }

    /// Accumulates one trailer line after the terminal chunk.
    ///
    /// Bytes are collected until the line's CR. An empty line is the end of
    /// the trailer block; anything else must be a `name ':' [value]` field.
    fn read_trailer(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ChunkError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(TrailerLf)),
            b'\n' => Poll::Ready(Err(ChunkError::malformed_trailing("trailer line contains bare LF"))),
            b => {
                self.trailer_line.push(b);
                Poll::Ready(Ok(Trailer))
            }
        }
    }

    /// Validates the LF after a trailer line and records the field.
    ///
    /// # State Transitions
    /// - On LF with an empty line: Move to End state (block terminator)
    /// - On LF with field content: Record the trailing field, back to Trailer
    /// - On any other byte: Return error
    fn read_trailer_lf(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ChunkError>> {
        match try_next_byte!(src) {
            b'\n' => {
                if self.trailer_line.is_empty() {
                    return Poll::Ready(Ok(End));
                }

                let line = mem::take(&mut self.trailer_line);
                match parse_trailer_line(&line) {
                    Ok(field) => {
                        trace!(name = field.name(), "read trailing field");
                        self.trailing_fields.push(field);
                        Poll::Ready(Ok(Trailer))
                    }
                    Err(e) => Poll::Ready(Err(e)),
                }
            }
            _ => Poll::Ready(Err(ChunkError::malformed_trailing("missing LF after trailer line"))),
        }
    }
}

/// Splits a trailer line into a [`TrailingField`].
///
/// The value may be empty; the field is recorded either way. Lines without a
/// colon separator are rejected.
fn parse_trailer_line(line: &[u8]) -> Result<TrailingField, ChunkError> {
    let colon = line
        .iter()
        .position(|b| *b == b':')
        .ok_or_else(|| ChunkError::malformed_trailing("missing ':' separator"))?;

    let name = std::str::from_utf8(line[..colon].trim_ascii())
        .map_err(|_| ChunkError::malformed_trailing("field name is not valid utf-8"))?;
    if name.is_empty() {
        return Err(ChunkError::malformed_trailing("empty field name"));
    }

    let value = std::str::from_utf8(line[colon + 1..].trim_ascii())
        .map_err(|_| ChunkError::malformed_trailing("field value is not valid utf-8"))?;

    Ok(TrailingField::new(name.to_owned(), value.to_owned()))
}
