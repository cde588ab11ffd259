//! Core protocol types shared by the body decoders and the WebSocket layer.
//!
//! # Architecture
//!
//! - **Stream items** ([`message`]): what the body decoders emit
//!   - [`PayloadItem`]: a payload chunk, or EOF carrying the chunked wire
//!     description
//!   - [`PayloadSize`]: how the body is framed (length / chunked / empty)
//!
//! - **Chunked wire records** ([`chunked`]):
//!   - [`Chunk`]: one `(started_at, size)` range within the body
//!   - [`TrailingField`]: a name/value pair from the trailer block
//!   - [`ChunkedInputInfo`]: the aggregate attached to a completed body
//!
//! - **Error taxonomies** ([`error`]):
//!   - [`ChunkError`]: malformed chunked encoding
//!   - [`WsError`]: WebSocket handshake, framing and protocol failures
//!
//! Needing more input is never modeled as an error. Decoders return
//! `Ok(None)` and are resumed with a grown buffer; their progress lives in
//! explicit state, not on the call stack.

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod chunked;
pub use chunked::Chunk;
pub use chunked::ChunkedInputInfo;
pub use chunked::TrailingField;

mod error;
pub use error::ChunkError;
pub use error::WsError;
