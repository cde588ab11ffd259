//! Frame-level codec for WebSocket connections.
//!
//! [`FrameDecoder`] and [`FrameEncoder`] translate between raw bytes and
//! single [`WsMessage`] frames; message reassembly and control-frame
//! semantics live one layer up, in the session. Both halves implement the
//! `tokio_util` codec traits so a connection is just a
//! `FramedRead`/`FramedWrite` pair over the transport.
//!
//! Decoding is peek-then-commit: the header is parsed through a
//! [`ByteCursor`] without touching the buffer, and bytes are only consumed
//! once the whole frame (header and payload) is available. A partial frame
//! leaves the buffer untouched and yields `Ok(None)`.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::cursor::ByteCursor;
use crate::ensure;
use crate::protocol::WsError;
use crate::ws::frame::{FrameHeader, OpCode, WsMessage};
use crate::ws::mask::apply_mask;

/// Default cap on a single frame's payload length.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Largest possible frame header: 2 base bytes, 8 length bytes, 4 mask bytes.
const MAX_HEADER_SIZE: usize = 14;

/// Control frames must fit in a single unfragmented frame of at most 125
/// payload bytes.
const MAX_CONTROL_PAYLOAD: u64 = 125;

/// Which end of the connection this codec sits on.
///
/// The protocol mandates masking on client-to-server frames and forbids it
/// on server-to-client frames, so the codec behaves differently per role on
/// both the decode and encode paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// A decoder for single WebSocket frames.
///
/// The decoder validates the mask direction for its [`Role`], rejects
/// reserved opcodes and malformed control frames, enforces the payload cap,
/// and unmasks the payload before handing it upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecoder {
    role: Role,
    max_payload: usize,
}

impl FrameDecoder {
    /// Creates a decoder for the server side of a connection (expects
    /// masked inbound frames).
    pub fn server() -> Self {
        Self { role: Role::Server, max_payload: DEFAULT_MAX_PAYLOAD }
    }

    /// Creates a decoder for the client side of a connection (expects
    /// unmasked inbound frames).
    pub fn client() -> Self {
        Self { role: Role::Client, max_payload: DEFAULT_MAX_PAYLOAD }
    }

    /// Caps the payload length a single frame may declare.
    ///
    /// Frames above the cap fail with [`WsError::FrameTooLarge`].
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Parses a frame header through the cursor without consuming anything.
    ///
    /// Returns `Ok(None)` while the header is still incomplete. On success
    /// the cursor position is the header length in bytes.
    fn parse_header(cursor: &mut ByteCursor<'_>) -> Result<Option<FrameHeader>, WsError> {
        let Ok(base) = cursor.take(2) else {
            return Ok(None);
        };
        let (b0, b1) = (base[0], base[1]);

        // no extensions are negotiated, so any RSV bit is a violation
        ensure!(b0 & 0x70 == 0, WsError::protocol_violation("reserved bits set"));

        let fin = b0 & 0x80 != 0;
        let opcode = OpCode::try_from(b0 & 0x0F)?;
        let masked = b1 & 0x80 != 0;

        let payload_len = match b1 & 0x7F {
            126 => {
                let Ok(ext) = cursor.take(2) else {
                    return Ok(None);
                };
                u64::from(u16::from_be_bytes([ext[0], ext[1]]))
            }
            127 => {
                let Ok(ext) = cursor.take(8) else {
                    return Ok(None);
                };
                u64::from_be_bytes([ext[0], ext[1], ext[2], ext[3], ext[4], ext[5], ext[6], ext[7]])
            }
            len => u64::from(len),
        };

        let mask = if masked {
            let Ok(key) = cursor.take(4) else {
                return Ok(None);
            };
            Some([key[0], key[1], key[2], key[3]])
        } else {
            None
        };

        Ok(Some(FrameHeader { fin, opcode, payload_len, mask }))
    }

    fn validate(&self, header: &FrameHeader) -> Result<(), WsError> {
        if header.opcode.is_control() {
            ensure!(header.fin, WsError::invalid_control_frame("fragmented control frame"));
            ensure!(
                header.payload_len <= MAX_CONTROL_PAYLOAD,
                WsError::invalid_control_frame("control payload exceeds 125 bytes")
            );
        }

        ensure!(
            header.payload_len <= self.max_payload as u64,
            WsError::FrameTooLarge { size: header.payload_len, max: self.max_payload }
        );

        match self.role {
            Role::Server => {
                ensure!(header.mask.is_some(), WsError::protocol_violation("client frame without mask"));
            }
            Role::Client => {
                ensure!(header.mask.is_none(), WsError::protocol_violation("masked server frame"));
            }
        }

        Ok(())
    }
}

impl Decoder for FrameDecoder {
    type Item = WsMessage;
    type Error = WsError;

    /// Attempts to decode one frame from the buffer.
    ///
    /// # Returns
    /// - `Ok(Some(message))` when a whole frame was present; its payload is
    ///   already unmasked, and the masking key (if any) stays visible in the
    ///   header
    /// - `Ok(None)` when more data is needed; nothing was consumed
    /// - `Err(WsError)` on malformed headers or protocol violations
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut cursor = ByteCursor::new(src);
        let Some(header) = Self::parse_header(&mut cursor)? else {
            return Ok(None);
        };
        let header_len = cursor.position();

        self.validate(&header)?;

        // payload_len <= max_payload <= usize::MAX at this point
        let payload_len = header.payload_len as usize;
        let frame_len = header_len + payload_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(header_len);
        let mut payload = src.split_to(payload_len);
        if let Some(key) = header.mask {
            apply_mask(&mut payload, key);
        }

        trace!(opcode = ?header.opcode, fin = header.fin, len = header.payload_len, "decoded frame");
        Ok(Some(WsMessage { header, payload: payload.freeze() }))
    }
}

/// An encoder for single WebSocket frames.
///
/// In server role the mask bit is never set; in client role every frame is
/// masked with a fresh random key, as the protocol requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEncoder {
    role: Role,
}

impl FrameEncoder {
    pub fn server() -> Self {
        Self { role: Role::Server }
    }

    pub fn client() -> Self {
        Self { role: Role::Client }
    }
}

impl Encoder<WsMessage> for FrameEncoder {
    type Error = WsError;

    fn encode(&mut self, item: WsMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let WsMessage { header, payload } = item;

        if header.opcode.is_control() {
            ensure!(header.fin, WsError::invalid_control_frame("fragmented control frame"));
            ensure!(
                payload.len() as u64 <= MAX_CONTROL_PAYLOAD,
                WsError::invalid_control_frame("control payload exceeds 125 bytes")
            );
        }

        let mask = match self.role {
            Role::Server => None,
            Role::Client => Some(header.mask.unwrap_or_else(rand::random)),
        };

        dst.reserve(MAX_HEADER_SIZE + payload.len());
        dst.put_u8((u8::from(header.fin) << 7) | u8::from(header.opcode));

        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
        let len = payload.len();
        if len < 126 {
            dst.put_u8(mask_bit | len as u8);
        } else if len < 65536 {
            dst.put_u8(mask_bit | 126);
            dst.put_u16(len as u16);
        } else {
            dst.put_u8(mask_bit | 127);
            dst.put_u64(len as u64);
        }

        match mask {
            Some(key) => {
                dst.put_slice(&key);
                let payload_start = dst.len();
                dst.put_slice(&payload);
                apply_mask(&mut dst[payload_start..], key);
            }
            None => dst.put_slice(&payload),
        }

        trace!(opcode = ?header.opcode, len, masked = mask.is_some(), "encoded frame");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn round_trip(message: WsMessage, encoder: &mut FrameEncoder, decoder: &mut FrameDecoder) -> WsMessage {
        let mut wire = BytesMut::new();
        encoder.encode(message, &mut wire).unwrap();
        let decoded = decoder.decode(&mut wire).unwrap().unwrap();
        assert!(wire.is_empty(), "decoder must consume the whole frame");
        decoded
    }

    #[test]
    fn server_to_client_round_trip() {
        let mut encoder = FrameEncoder::server();
        let mut decoder = FrameDecoder::client();

        let decoded = round_trip(WsMessage::text("Hello, WebSocket!"), &mut encoder, &mut decoder);
        assert_eq!(decoded.opcode(), OpCode::Text);
        assert!(decoded.is_final());
        assert_eq!(decoded.header.mask, None);
        assert_eq!(decoded.as_text(), Some("Hello, WebSocket!"));
    }

    #[test]
    fn client_to_server_round_trip_unmasks() {
        let mut encoder = FrameEncoder::client();
        let mut decoder = FrameDecoder::server();

        let decoded = round_trip(WsMessage::binary(vec![1u8, 2, 3, 4, 5]), &mut encoder, &mut decoder);
        assert_eq!(decoded.opcode(), OpCode::Binary);
        // key is retained in the header, payload arrives unmasked
        assert!(decoded.header.mask.is_some());
        assert_eq!(&decoded.payload[..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn sixteen_bit_extended_length() {
        let mut encoder = FrameEncoder::server();
        let mut decoder = FrameDecoder::client();

        let payload = vec![0x42u8; 300];
        let mut wire = BytesMut::new();
        encoder.encode(WsMessage::binary(payload.clone()), &mut wire).unwrap();
        assert_eq!(wire[1], 126);
        assert_eq!(u16::from_be_bytes([wire[2], wire[3]]), 300);

        let decoded = decoder.decode(&mut wire).unwrap().unwrap();
        assert_eq!(decoded.header.payload_len, 300);
        assert_eq!(&decoded.payload[..], &payload[..]);
    }

    #[test]
    fn sixty_four_bit_extended_length() {
        let mut encoder = FrameEncoder::server();
        let mut decoder = FrameDecoder::client().with_max_payload(1 << 20);

        let payload = vec![0x42u8; 70_000];
        let mut wire = BytesMut::new();
        encoder.encode(WsMessage::binary(payload.clone()), &mut wire).unwrap();
        assert_eq!(wire[1], 127);

        let decoded = decoder.decode(&mut wire).unwrap().unwrap();
        assert_eq!(decoded.header.payload_len, 70_000);
        assert_eq!(decoded.payload.len(), 70_000);
    }

    #[test]
    fn partial_frame_leaves_buffer_untouched() {
        let mut encoder = FrameEncoder::client();
        let mut decoder = FrameDecoder::server();

        let mut wire = BytesMut::new();
        encoder.encode(WsMessage::text("incremental"), &mut wire).unwrap();
        let full = wire.split().freeze();

        let mut buffer = BytesMut::new();
        for (i, byte) in full.iter().enumerate() {
            buffer.put_u8(*byte);
            let result = decoder.decode(&mut buffer).unwrap();
            if i + 1 < full.len() {
                assert!(result.is_none());
                assert_eq!(buffer.len(), i + 1, "partial frame must not be consumed");
            } else {
                assert_eq!(result.unwrap().as_text(), Some("incremental"));
            }
        }
    }

    #[test]
    fn reserved_opcode_is_rejected() {
        // FIN | opcode 0x3, masked, empty payload
        let mut buffer = BytesMut::from(&[0x83u8, 0x80, 0, 0, 0, 0][..]);
        let result = FrameDecoder::server().decode(&mut buffer);
        assert!(matches!(result, Err(WsError::UnknownOpcode(0x3))));
    }

    #[test]
    fn fragmented_control_frame_is_rejected() {
        // ping without FIN
        let mut buffer = BytesMut::from(&[0x09u8, 0x80, 0, 0, 0, 0][..]);
        let result = FrameDecoder::server().decode(&mut buffer);
        assert!(matches!(result, Err(WsError::InvalidControlFrame { .. })));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut encoder = FrameEncoder::client();
        let mut decoder = FrameDecoder::server().with_max_payload(16);

        let mut wire = BytesMut::new();
        encoder.encode(WsMessage::binary(vec![0u8; 17]), &mut wire).unwrap();
        let result = decoder.decode(&mut wire);
        assert!(matches!(result, Err(WsError::FrameTooLarge { size: 17, max: 16 })));
    }

    #[test]
    fn unmasked_client_frame_is_rejected() {
        let mut encoder = FrameEncoder::server();
        let mut wire = BytesMut::new();
        encoder.encode(WsMessage::text("nope"), &mut wire).unwrap();

        let result = FrameDecoder::server().decode(&mut wire);
        assert!(matches!(result, Err(WsError::ProtocolViolation { .. })));
    }

    #[test]
    fn rsv_bits_are_rejected() {
        let mut buffer = BytesMut::from(&[0xC1u8, 0x80, 0, 0, 0, 0][..]);
        let result = FrameDecoder::server().decode(&mut buffer);
        assert!(matches!(result, Err(WsError::ProtocolViolation { .. })));
    }

    #[test]
    fn explicit_mask_key_is_honored() {
        let mut encoder = FrameEncoder::client();
        let key = [0x37, 0xfa, 0x21, 0x3d];
        let message = WsMessage {
            header: FrameHeader { fin: true, opcode: OpCode::Text, payload_len: 5, mask: Some(key) },
            payload: Bytes::from_static(b"Hello"),
        };

        let mut wire = BytesMut::new();
        encoder.encode(message, &mut wire).unwrap();
        assert_eq!(&wire[2..6], &key);
        // masked form of "Hello" from RFC 6455 section 5.7
        assert_eq!(&wire[6..], &[0x7f, 0x9f, 0x4d, 0x51, 0x58]);

        let decoded = FrameDecoder::server().decode(&mut wire).unwrap().unwrap();
        assert_eq!(decoded.as_text(), Some("Hello"));
        assert_eq!(decoded.header.mask, Some(key));
    }
}
