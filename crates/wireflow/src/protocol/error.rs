use std::io;
use thiserror::Error;

use crate::ws::frame::CloseCode;

/// Errors raised while decoding a chunked transfer encoded body.
///
/// Needing more input is not an error: the decoders signal it by returning
/// `Ok(None)` and resume from the same wire position on the next call.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("invalid chunk size line: {reason}")]
    MalformedChunkSize { reason: &'static str },

    #[error("chunk size overflows u64")]
    ChunkSizeOverflow,

    #[error("missing CRLF after chunk payload")]
    MalformedChunkTerminator,

    #[error("invalid trailing field: {reason}")]
    MalformedTrailingField { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ChunkError {
    pub fn malformed_size(reason: &'static str) -> Self {
        Self::MalformedChunkSize { reason }
    }

    pub fn malformed_trailing<S: ToString>(reason: S) -> Self {
        Self::MalformedTrailingField { reason: reason.to_string() }
    }
}

/// Errors raised by the WebSocket layer.
///
/// The variants map onto the protocol's failure classes: malformed frames and
/// protocol violations close the session with a status-coded close frame
/// (see [`WsError::close_code`]), handshake rejections leave the transport to
/// the HTTP layer, and `Io` is a transport-level termination for which no
/// close handshake is attempted.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("unknown opcode {0:#03x}")]
    UnknownOpcode(u8),

    #[error("frame payload of {size} bytes exceeds the limit of {max}")]
    FrameTooLarge { size: u64, max: usize },

    #[error("invalid control frame: {reason}")]
    InvalidControlFrame { reason: &'static str },

    #[error("protocol violation: {reason}")]
    ProtocolViolation { reason: &'static str },

    #[error("invalid utf-8 in text payload")]
    InvalidUtf8,

    #[error("handshake rejected: {reason}")]
    Handshake { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl WsError {
    pub fn invalid_control_frame(reason: &'static str) -> Self {
        Self::InvalidControlFrame { reason }
    }

    pub fn protocol_violation(reason: &'static str) -> Self {
        Self::ProtocolViolation { reason }
    }

    pub fn handshake<S: ToString>(reason: S) -> Self {
        Self::Handshake { reason: reason.to_string() }
    }

    /// Whether this error came from the transport rather than the protocol.
    ///
    /// Transport errors tear the session down without a close handshake.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// The close status code a session should send before tearing down.
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::FrameTooLarge { .. } => CloseCode::MessageTooBig,
            Self::InvalidUtf8 => CloseCode::InvalidPayload,
            _ => CloseCode::ProtocolError,
        }
    }
}
