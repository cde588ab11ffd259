//! WebSocket protocol support.
//!
//! The layer splits the way the protocol does:
//!
//! - [`frame`]: frame and message types — [`OpCode`](frame::OpCode),
//!   [`FrameHeader`](frame::FrameHeader), [`WsMessage`](frame::WsMessage),
//!   [`CloseCode`](frame::CloseCode)
//! - [`mask`]: the XOR masking engine for client-originated payloads
//! - [`frame_codec`]: [`FrameDecoder`](frame_codec::FrameDecoder) /
//!   [`FrameEncoder`](frame_codec::FrameEncoder), single frames to and from
//!   raw bytes
//! - [`handshake`]: upgrade-request validation and the
//!   `101 Switching Protocols` response
//! - [`session`]: the per-connection state machine
//!   (`Handshaking -> Open -> Closing -> Closed`), message reassembly,
//!   control-frame handling and the close handshake
//!
//! A server typically only touches [`session::WsSession`] and
//! [`session::WsHandle`]; the lower modules are public for callers that
//! need raw frame access (clients, tests, proxies).

pub mod frame;
pub mod frame_codec;
pub mod handshake;
pub mod mask;
pub mod session;

pub use frame::{CloseCode, FrameHeader, OpCode, WsMessage};
pub use frame_codec::{FrameDecoder, FrameEncoder, Role};
pub use session::{SessionState, WsConfig, WsHandle, WsSession, WsWeakHandle};
