//! Body codec module for decoding message payloads.
//!
//! This module provides streaming decoders for the two body framings a
//! message can arrive with, plus a dispatching decoder that picks the right
//! strategy from a [`PayloadSize`](crate::protocol::PayloadSize):
//!
//! - [`ChunkedDecoder`]: chunked transfer encoding (RFC 7230), recording
//!   chunk boundaries and trailing fields as it goes
//! - [`LengthDecoder`]: Content-Length framed payloads
//! - [`PayloadDecoder`]: strategy dispatch, and the place where the
//!   "no chunked input" tri-state is realized
//!
//! All decoders implement `tokio_util::codec::Decoder` and are resumable:
//! `Ok(None)` means "feed me more bytes and call again", and every piece of
//! parse progress is held in the decoder itself rather than on the call
//! stack.

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use chunked_decoder::ChunkedDecoder;
pub use length_decoder::LengthDecoder;
pub use payload_decoder::PayloadDecoder;
