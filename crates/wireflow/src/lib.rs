//! Wire-level protocol layers for async servers: HTTP chunked
//! transfer decoding and WebSocket framing.
//!
//! This crate provides two independent, composable protocol layers over a
//! byte stream, built on tokio and the `tokio_util` codec traits:
//!
//! - a **chunked-body decoder** that streams an RFC 7230 chunked body out
//!   while recording every chunk boundary and the trailing header block
//! - a **WebSocket frame codec and session state machine** implementing the
//!   RFC 6455 framing layer: handshake, masking, fragmentation, control
//!   frames and the close handshake
//!
//! Both layers decode untrusted network input into structured records and
//! behave deterministically under partial delivery: a decoder that runs out
//! of bytes returns `Ok(None)`, keeps its progress in explicit state, and
//! resumes when the transport feeds it more.
//!
//! The HTTP request/response model, routing and connection acceptance are
//! deliberately out of scope; the crate consumes a byte-stream positioned at
//! body start plus an "is chunked" flag ([`protocol::PayloadSize`]), or an
//! upgrade request's headers plus the connection's reader and writer.
//!
//! # Example
//!
//! ```no_run
//! use http::HeaderMap;
//! use tokio::net::TcpStream;
//! use tracing::{error, info};
//! use wireflow::ws::{WsConfig, WsSession};
//!
//! async fn serve_websocket(stream: TcpStream, upgrade_headers: HeaderMap) {
//!     let (reader, writer) = stream.into_split();
//!     let (mut session, handle) = WsSession::new(reader, writer, WsConfig::default());
//!
//!     if let Err(e) = session.handshake(&upgrade_headers).await {
//!         error!(cause = %e, "upgrade rejected");
//!         return;
//!     }
//!
//!     let result = session.process(
//!         |weak, message| {
//!             // echo every message back through the weak handle; if the
//!             // session is already gone this is a silent no-op
//!             if let Some(handle) = weak.upgrade() {
//!                 handle.send_message(message);
//!             }
//!         },
//!         |reason| info!(reason = %reason, "websocket closed"),
//!     );
//!
//!     if let Err(e) = result.await {
//!         error!(cause = %e, "websocket session failed");
//!     }
//!     drop(handle);
//! }
//! ```
//!
//! Decoding a chunked body works the same way micro HTTP stacks drive any
//! `tokio_util` decoder:
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use wireflow::codec::PayloadDecoder;
//! use wireflow::protocol::{PayloadItem, PayloadSize};
//!
//! let mut decoder = PayloadDecoder::from(PayloadSize::new_chunked());
//! let mut buffer = BytesMut::from(&b"6\r\nHello,\r\n1\r\n \r\n6\r\nWorld!\r\n0\r\n\r\n"[..]);
//!
//! let mut body = Vec::new();
//! loop {
//!     match decoder.decode(&mut buffer).unwrap() {
//!         Some(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
//!         Some(PayloadItem::Eof(info)) => {
//!             let info = info.expect("chunked body carries its wire description");
//!             assert_eq!(info.chunk_count(), 3);
//!             break;
//!         }
//!         None => unreachable!("body is complete in the buffer"),
//!     }
//! }
//! assert_eq!(&body, b"Hello, World!");
//! ```
//!
//! # Architecture
//!
//! - [`cursor`]: [`ByteCursor`](cursor::ByteCursor), the peeking view over
//!   buffered bytes that decoders parse through before committing
//! - [`protocol`]: shared records and error taxonomies
//! - [`codec`]: body decoders (chunked / content-length / none)
//! - [`ws`]: WebSocket framing, handshake and sessions
//!
//! # Concurrency model
//!
//! One session is processed by exactly one logical flow of control; inbound
//! decode and callback invocation are strictly sequential per session.
//! Independent sessions run in parallel freely, sharing nothing. Handles are
//! safe to use from callbacks and other tasks: every operation consults the
//! session's atomic state first and degrades to a no-op once the session is
//! closing or closed.

pub mod codec;
pub mod cursor;
pub mod protocol;
pub mod ws;

mod utils;
pub(crate) use utils::ensure;
