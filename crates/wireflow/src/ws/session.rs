//! WebSocket session handling.
//!
//! A [`WsSession`] owns one upgraded connection for its whole lifetime:
//! it validates the opening handshake, decodes inbound frames through the
//! frame codec, reassembles fragmented messages, answers control frames,
//! and sequences the close handshake. Application code talks to the session
//! through a [`WsHandle`] and receives messages through callbacks registered
//! when the session is driven.
//!
//! The session moves through four states:
//!
//! ```text
//! Handshaking -> Open -> Closing -> Closed
//! ```
//!
//! The state lives in an atomic shared with every handle, and every handle
//! operation checks it first: sending on a session that is closing or gone
//! is a silent no-op, never an error. Message callbacks receive a
//! [`WsWeakHandle`] so they can safely call back into the session even if it
//! was torn down concurrently.

use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::HeaderMap;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace, warn};

use crate::ensure;
use crate::protocol::WsError;
use crate::ws::frame::{CloseCode, FrameHeader, OpCode, WsMessage};
use crate::ws::frame_codec::{DEFAULT_MAX_PAYLOAD, FrameDecoder, FrameEncoder};
use crate::ws::handshake;

/// Tunables for a WebSocket session.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Cap on a single inbound frame's payload length.
    pub max_frame_payload: usize,
    /// How long a locally initiated close waits for the peer's
    /// acknowledgment before the session is forced closed.
    pub close_timeout: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self { max_frame_payload: DEFAULT_MAX_PAYLOAD, close_timeout: Duration::from_secs(5) }
    }
}

/// Lifecycle of a session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Handshaking = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Handshaking,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug)]
enum Command {
    Message(WsMessage),
    Close(String),
}

/// State shared between the session driver and its handles.
#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    commands: mpsc::UnboundedSender<Command>,
}

impl Shared {
    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.state.compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    fn force(&self, to: SessionState) {
        self.state.store(to as u8, Ordering::Release);
    }
}

/// A cloneable handle to a running session.
///
/// All operations consult the session state first and degrade to no-ops once
/// the session is closing or gone, so a handle can never act on a dead
/// session by mistake.
#[derive(Debug, Clone)]
pub struct WsHandle {
    shared: Arc<Shared>,
}

impl WsHandle {
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.shared.state() == SessionState::Open
    }

    /// Queues a message for sending.
    ///
    /// A no-op unless the session is `Open`.
    pub fn send_message(&self, message: WsMessage) {
        if self.shared.state() != SessionState::Open {
            trace!("send_message on a session that is not open, dropping");
            return;
        }
        if self.shared.commands.send(Command::Message(message)).is_err() {
            trace!("session driver is gone, message dropped");
        }
    }

    /// Starts the close handshake with the given reason.
    ///
    /// Moves the session to `Closing`, which immediately stops new outbound
    /// application messages; the driver sends the close frame and awaits the
    /// peer's acknowledgment. A no-op unless the session is `Open`.
    pub fn close(&self, reason: impl Into<String>) {
        if !self.shared.transition(SessionState::Open, SessionState::Closing) {
            trace!("close on a session that is not open, ignoring");
            return;
        }
        if self.shared.commands.send(Command::Close(reason.into())).is_err() {
            trace!("session driver is gone, close dropped");
        }
    }

    pub fn downgrade(&self) -> WsWeakHandle {
        WsWeakHandle { shared: Arc::downgrade(&self.shared) }
    }
}

/// A non-owning handle, as passed to message callbacks.
///
/// Upgrading fails once the session and all strong handles are gone.
#[derive(Debug, Clone)]
pub struct WsWeakHandle {
    shared: Weak<Shared>,
}

impl WsWeakHandle {
    pub fn upgrade(&self) -> Option<WsHandle> {
        self.shared.upgrade().map(|shared| WsHandle { shared })
    }
}

#[derive(Debug)]
struct Fragments {
    opcode: OpCode,
    payload: BytesMut,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Done,
}

/// One upgraded WebSocket connection.
///
/// The session is processed by exactly one logical flow of control: frame
/// decode and callback invocation are strictly sequential, so callbacks
/// never race with session state changes.
#[derive(Debug)]
pub struct WsSession<R, W> {
    framed_read: FramedRead<R, FrameDecoder>,
    framed_write: FramedWrite<W, FrameEncoder>,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
    config: WsConfig,
    fragments: Option<Fragments>,
    close_notified: bool,
}

impl<R, W> WsSession<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a session over the reader/writer pair of an upgradable
    /// connection, in `Handshaking` state.
    pub fn new(reader: R, writer: W, config: WsConfig) -> (Self, WsHandle) {
        let (command_sender, commands) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared { state: AtomicU8::new(SessionState::Handshaking as u8), commands: command_sender });

        let decoder = FrameDecoder::server().with_max_payload(config.max_frame_payload);
        let session = Self {
            framed_read: FramedRead::with_capacity(reader, decoder, 8 * 1024),
            framed_write: FramedWrite::new(writer, FrameEncoder::server()),
            shared: Arc::clone(&shared),
            commands,
            config,
            fragments: None,
            close_notified: false,
        };

        (session, WsHandle { shared })
    }

    /// Validates the upgrade request and answers with
    /// `101 Switching Protocols`, moving the session to `Open`.
    ///
    /// On a handshake error nothing is written; the caller still owns the
    /// transport through the session and can tear it down.
    pub async fn handshake(&mut self, headers: &HeaderMap) -> Result<(), WsError> {
        ensure!(
            self.shared.state() == SessionState::Handshaking,
            WsError::handshake("handshake on a session that is already running")
        );

        let accept = handshake::validate_upgrade(headers)?;
        let response = handshake::switching_protocols(&accept);

        let writer = self.framed_write.get_mut();
        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;

        self.shared.force(SessionState::Open);
        debug!("websocket handshake complete");
        Ok(())
    }

    /// Drives the session until it closes.
    ///
    /// `on_message` receives every complete logical data message together
    /// with a weak handle to this session; control frames are handled
    /// internally and never reach it. `on_close` fires exactly once, when a
    /// close handshake completes (from either side) or is forced by the
    /// close timeout; it does not fire for transport errors or protocol
    /// violations, which are returned as the error instead.
    pub async fn process<M, C>(mut self, mut on_message: M, mut on_close: C) -> Result<(), WsError>
    where
        M: FnMut(WsWeakHandle, WsMessage),
        C: FnMut(String),
    {
        ensure!(
            self.shared.state() != SessionState::Handshaking,
            WsError::handshake("session processed before handshake")
        );

        let result = self.run(&mut on_message, &mut on_close).await;
        // from here on every handle observes Closed and degrades to no-ops;
        // buffers and pending commands are released with the session
        self.shared.force(SessionState::Closed);
        result
    }

    async fn run<M, C>(&mut self, on_message: &mut M, on_close: &mut C) -> Result<(), WsError>
    where
        M: FnMut(WsWeakHandle, WsMessage),
        C: FnMut(String),
    {
        loop {
            select! {
                biased;

                command = self.commands.recv() => {
                    match command {
                        Some(Command::Message(message)) => self.framed_write.send(message).await?,
                        Some(Command::Close(reason)) => return self.close_handshake(reason, on_close).await,
                        // the sender lives in Shared, which this session
                        // holds, so the channel cannot close while we run
                        None => {}
                    }
                }

                frame = self.framed_read.next() => {
                    match frame {
                        Some(Ok(frame)) => {
                            if self.handle_frame(frame, on_message, on_close).await? == Flow::Done {
                                return Ok(());
                            }
                        }
                        Some(Err(e)) => return Err(self.fail(e).await),
                        None => {
                            debug!("transport closed without a close handshake");
                            return Err(WsError::Io { source: io::ErrorKind::UnexpectedEof.into() });
                        }
                    }
                }
            }
        }
    }

    async fn handle_frame<M, C>(&mut self, frame: WsMessage, on_message: &mut M, on_close: &mut C) -> Result<Flow, WsError>
    where
        M: FnMut(WsWeakHandle, WsMessage),
        C: FnMut(String),
    {
        match frame.opcode() {
            OpCode::Ping => {
                trace!(len = frame.payload.len(), "ping received, echoing pong");
                self.framed_write.send(WsMessage::pong(frame.payload)).await?;
                Ok(Flow::Continue)
            }

            OpCode::Pong => {
                trace!("pong received");
                Ok(Flow::Continue)
            }

            OpCode::Close => {
                let (code, reason) = match parse_close(&frame) {
                    Ok(parts) => parts,
                    Err(e) => return Err(self.fail(e).await),
                };

                // peer-initiated close: echo the close frame to complete the
                // handshake, then tear down
                if self.shared.transition(SessionState::Open, SessionState::Closing) {
                    let echo = match code {
                        Some(code) => WsMessage::close(code, &reason),
                        None => WsMessage::close_empty(),
                    };
                    self.framed_write.send(echo).await?;
                }

                self.notify_close(on_close, reason);
                Ok(Flow::Done)
            }

            OpCode::Text | OpCode::Binary => {
                if self.fragments.is_some() {
                    let error = WsError::protocol_violation("data frame while a fragmented message is in progress");
                    return Err(self.fail(error).await);
                }

                if frame.is_final() {
                    if let Err(e) = Self::deliver(&self.shared, frame.header, frame.payload, on_message) {
                        return Err(self.fail(e).await);
                    }
                } else {
                    self.fragments = Some(Fragments {
                        opcode: frame.opcode(),
                        payload: BytesMut::from(&frame.payload[..]),
                    });
                }
                Ok(Flow::Continue)
            }

            OpCode::Continuation => {
                let Some(mut fragments) = self.fragments.take() else {
                    let error = WsError::protocol_violation("continuation frame without a message in progress");
                    return Err(self.fail(error).await);
                };

                fragments.payload.extend_from_slice(&frame.payload);

                if frame.is_final() {
                    let payload = fragments.payload.freeze();
                    let header = FrameHeader::data(fragments.opcode, payload.len() as u64);
                    if let Err(e) = Self::deliver(&self.shared, header, payload, on_message) {
                        return Err(self.fail(e).await);
                    }
                } else {
                    self.fragments = Some(fragments);
                }
                Ok(Flow::Continue)
            }
        }
    }

    /// Hands a complete logical message to the application callback.
    ///
    /// Text payloads are UTF-8 validated here, after unmasking and
    /// reassembly.
    fn deliver<M>(shared: &Arc<Shared>, header: FrameHeader, payload: Bytes, on_message: &mut M) -> Result<(), WsError>
    where
        M: FnMut(WsWeakHandle, WsMessage),
    {
        if header.opcode == OpCode::Text && std::str::from_utf8(&payload).is_err() {
            return Err(WsError::InvalidUtf8);
        }

        trace!(opcode = ?header.opcode, len = payload.len(), "delivering message");
        let weak = WsWeakHandle { shared: Arc::downgrade(shared) };
        on_message(weak, WsMessage { header, payload });
        Ok(())
    }

    /// Completes a locally initiated close: sends the close frame and waits
    /// for the peer's acknowledgment, bounded by the configured timeout.
    async fn close_handshake<C>(&mut self, reason: String, on_close: &mut C) -> Result<(), WsError>
    where
        C: FnMut(String),
    {
        self.framed_write.send(WsMessage::close(CloseCode::Normal, &reason)).await?;
        debug!("close frame sent, awaiting peer acknowledgment");

        match time::timeout(self.config.close_timeout, self.await_close_ack()).await {
            Ok(Ok(Some(peer_reason))) => {
                self.notify_close(on_close, peer_reason);
                Ok(())
            }
            Ok(Ok(None)) => {
                debug!("transport ended before close acknowledgment");
                self.notify_close(on_close, reason);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(timeout = ?self.config.close_timeout, "close handshake timed out, forcing shutdown");
                self.notify_close(on_close, reason);
                Ok(())
            }
        }
    }

    /// Reads frames until the peer's close arrives.
    ///
    /// Data frames in flight are discarded; pings are still answered since
    /// the peer may not have seen our close yet. Returns the peer's reason,
    /// or `None` if the transport ended first.
    async fn await_close_ack(&mut self) -> Result<Option<String>, WsError> {
        while let Some(frame) = self.framed_read.next().await {
            let frame = frame?;
            match frame.opcode() {
                OpCode::Close => {
                    let (_, reason) = parse_close(&frame).unwrap_or((None, String::new()));
                    return Ok(Some(reason));
                }
                OpCode::Ping => self.framed_write.send(WsMessage::pong(frame.payload)).await?,
                opcode => trace!(?opcode, "discarding frame while closing"),
            }
        }
        Ok(None)
    }

    fn notify_close<C>(&mut self, on_close: &mut C, reason: String)
    where
        C: FnMut(String),
    {
        self.shared.force(SessionState::Closed);
        if self.close_notified {
            return;
        }
        self.close_notified = true;
        debug!(reason = %reason, "websocket session closed");
        on_close(reason);
    }

    /// Tears the session down on a protocol failure.
    ///
    /// Protocol violations get a close frame with the matching status code
    /// first; transport errors do not, as the peer is already gone.
    async fn fail(&mut self, error: WsError) -> WsError {
        if !error.is_transport() {
            let close = WsMessage::close(error.close_code(), "");
            if let Err(send_error) = self.framed_write.send(close).await {
                debug!(cause = %send_error, "failed to send close frame during teardown");
            }
        }
        error
    }
}

/// Splits a close frame payload into its status code and reason.
///
/// An empty payload is legal (no code, empty reason); a one-byte payload and
/// a non-UTF-8 reason are protocol violations.
fn parse_close(frame: &WsMessage) -> Result<(Option<CloseCode>, String), WsError> {
    if frame.payload.is_empty() {
        return Ok((None, String::new()));
    }
    ensure!(frame.payload.len() >= 2, WsError::protocol_violation("close payload of one byte"));

    let reason = frame.close_reason().ok_or(WsError::InvalidUtf8)?.to_owned();
    Ok((frame.close_code(), reason))
}
