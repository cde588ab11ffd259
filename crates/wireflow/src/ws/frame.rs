//! WebSocket frame and message types.
//!
//! Frames are the atomic protocol unit defined in
//! [RFC 6455 Section 5.2](https://datatracker.ietf.org/doc/html/rfc6455#section-5.2):
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |         (16 or 64 bits)       |
//! |N|V|V|V|       |S|             |                               |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |        Extended payload length continued, if payload len == 127|
//! +---------------------------------------------------------------+
//! |                               |   Masking-key, if MASK set to 1|
//! +-------------------------------+-------------------------------+
//! |     Masking-key (continued)       |          Payload Data      |
//! +-----------------------------------+ - - - - - - - - - - - - - -+
//! ```
//!
//! A [`WsMessage`] pairs a [`FrameHeader`] with its payload. The frame codec
//! deals in single frames; the session layer reassembles fragmented messages
//! (a non-final data frame plus continuations) into one `WsMessage` before
//! delivering it.

use bytes::Bytes;

use crate::protocol::WsError;

/// WebSocket operation code identifying the frame type.
///
/// Data frames (`Continuation`, `Text`, `Binary`) carry application payload;
/// control frames (`Close`, `Ping`, `Pong`) manage the connection and may be
/// interleaved with a fragmented message. Values outside the six assigned
/// codes are reserved and rejected during decoding.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    /// Returns `true` for `Close`, `Ping` and `Pong`.
    ///
    /// Control frames cannot be fragmented and their payload must not exceed
    /// 125 bytes.
    pub fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = WsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            _ => Err(WsError::UnknownOpcode(value)),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(val: OpCode) -> Self {
        match val {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }
}

/// Close status codes from the RFC 6455 registry.
///
/// Only the codes this crate sends or interprets are named; anything else is
/// carried through as `Other`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CloseCode {
    /// 1000: normal closure
    Normal,
    /// 1001: endpoint is going away
    GoingAway,
    /// 1002: protocol error
    ProtocolError,
    /// 1003: unsupported data type
    UnsupportedData,
    /// 1007: payload inconsistent with message type (e.g. non-UTF-8 text)
    InvalidPayload,
    /// 1008: policy violation
    PolicyViolation,
    /// 1009: message too big
    MessageTooBig,
    /// Any other registered or private-use code
    Other(u16),
}

impl From<u16> for CloseCode {
    fn from(value: u16) -> Self {
        match value {
            1000 => Self::Normal,
            1001 => Self::GoingAway,
            1002 => Self::ProtocolError,
            1003 => Self::UnsupportedData,
            1007 => Self::InvalidPayload,
            1008 => Self::PolicyViolation,
            1009 => Self::MessageTooBig,
            other => Self::Other(other),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(val: CloseCode) -> Self {
        match val {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::Other(other) => other,
        }
    }
}

/// The parsed header of one WebSocket frame.
///
/// `mask` is present if and only if the frame was client-originated: the
/// protocol mandates masking on the client-to-server direction and forbids
/// it on the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment flag; `false` means a continuation frame follows.
    pub fin: bool,
    /// Frame type.
    pub opcode: OpCode,
    /// Declared payload length in bytes.
    pub payload_len: u64,
    /// 4-byte masking key, kept for inspection; payloads handed out by the
    /// decoder are always already unmasked.
    pub mask: Option<[u8; 4]>,
}

impl FrameHeader {
    pub(crate) fn data(opcode: OpCode, payload_len: u64) -> Self {
        Self { fin: true, opcode, payload_len, mask: None }
    }
}

/// A WebSocket message: one frame, or a fully reassembled logical message,
/// depending on the layer it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsMessage {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl WsMessage {
    fn data(opcode: OpCode, payload: Bytes) -> Self {
        let header = FrameHeader::data(opcode, payload.len() as u64);
        Self { header, payload }
    }

    /// Creates a final text frame. The payload must already be valid UTF-8.
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self::data(OpCode::Text, payload.into())
    }

    /// Creates a final binary frame.
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::data(OpCode::Binary, payload.into())
    }

    /// Creates a ping frame with an optional application payload.
    pub fn ping(payload: impl Into<Bytes>) -> Self {
        Self::data(OpCode::Ping, payload.into())
    }

    /// Creates a pong frame; its payload should echo the ping's.
    pub fn pong(payload: impl Into<Bytes>) -> Self {
        Self::data(OpCode::Pong, payload.into())
    }

    /// Creates a close frame carrying a status code and a UTF-8 reason.
    pub fn close(code: CloseCode, reason: &str) -> Self {
        let code16 = u16::from(code);
        let mut payload = Vec::with_capacity(2 + reason.len());
        payload.extend_from_slice(&code16.to_be_bytes());
        payload.extend_from_slice(reason.as_bytes());
        Self::data(OpCode::Close, payload.into())
    }

    /// Creates a close frame with an empty payload (no status code).
    pub(crate) fn close_empty() -> Self {
        Self::data(OpCode::Close, Bytes::new())
    }

    pub fn opcode(&self) -> OpCode {
        self.header.opcode
    }

    pub fn is_final(&self) -> bool {
        self.header.fin
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The payload as text, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Extracts the status code from a close frame's payload.
    ///
    /// Returns `None` when the payload is too short to carry one.
    pub fn close_code(&self) -> Option<CloseCode> {
        let code = u16::from_be_bytes(self.payload.get(0..2)?.try_into().ok()?);
        Some(CloseCode::from(code))
    }

    /// Extracts the UTF-8 reason from a close frame's payload.
    ///
    /// Returns `None` when there is no reason or it is not valid UTF-8.
    pub fn close_reason(&self) -> Option<&str> {
        if self.payload.len() < 2 {
            return None;
        }
        std::str::from_utf8(&self.payload[2..]).ok()
    }
}
