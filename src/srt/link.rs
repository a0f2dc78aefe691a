//! The seam between the reconnect state machine and an actual SRT socket.
//!
//! [`SrtLink`] and [`SrtConnector`] exist so [`super::transport::Transport`]
//! can be exercised in tests — initial connect failure, mid-session
//! reconnect — without a real UDP socket or a listening SRT peer.
//! [`SrtTokioConnector`] is the only piece of this crate that touches
//! `srt_tokio`.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::SinkExt;
use srt_tokio::options::SocketOptions;
use srt_tokio::SrtSocket;

use crate::config::TransportConfig;

/// The outcome of a failed [`SrtLink::send_message`], classified at the
/// point where the real `srt_tokio` error is still available — not
/// re-derived downstream from an already-erased [`io::Error`], which can
/// only ever read back as [`io::ErrorKind::Other`] and would leave the
/// reconnect worker permanently unarmed.
#[derive(Debug)]
pub enum LinkError {
    /// The peer is gone: closed connection, idle/ack timeout, or any other
    /// failure that means this socket can no longer carry traffic. Arms
    /// the reconnect worker.
    ConnectionLost(io::Error),
    /// A one-off send failure that doesn't indicate the connection itself
    /// is down (e.g. a malformed send call). Logged and the datagram is
    /// dropped; the connection is left as-is.
    Other(io::Error),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::ConnectionLost(e) | LinkError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LinkError {}

/// One live SRT connection: message-mode send and an explicit close.
#[async_trait]
pub trait SrtLink: Send {
    /// Sends one message. The [`LinkError`] variant decides whether the
    /// caller arms the reconnect worker.
    async fn send_message(&mut self, data: Bytes) -> Result<(), LinkError>;

    /// Closes the underlying socket. Best-effort; errors are not
    /// observable to callers, matching `release()`'s infallible contract.
    async fn close(&mut self);
}

/// Performs the caller-mode handshake and socket tuning, producing a
/// [`SrtLink`] on success.
#[async_trait]
pub trait SrtConnector: Send + Sync {
    /// Connects to `addr` in caller mode, advertising
    /// `streamid = "publish:" + stream_id`.
    async fn connect(
        &self,
        config: &TransportConfig,
        addr: SocketAddr,
        stream_id: &str,
    ) -> io::Result<Box<dyn SrtLink>>;
}

/// Real [`SrtConnector`] backed by `srt_tokio`.
#[derive(Debug, Default)]
pub struct SrtTokioConnector;

#[async_trait]
impl SrtConnector for SrtTokioConnector {
    async fn connect(
        &self,
        config: &TransportConfig,
        addr: SocketAddr,
        stream_id: &str,
    ) -> io::Result<Box<dyn SrtLink>> {
        let stream_id = format!("publish:{stream_id}");

        // Socket options mirror the original prototype's `SrtTransport::connect`:
        // SRTO_STREAMID (the `Some(&stream_id)` argument to `.call` below),
        // SRTO_LATENCY, SRTO_FC, SRTO_SNDBUF, SRTO_PEERIDLETIMEO via
        // `SocketOptions`. `srt_tokio`'s `SrtSocket` only ever speaks
        // live/message-mode SRT — there's no buffered/file transmission
        // type to opt out of, so SRTO_TRANSTYPE and SRTO_SENDER have no
        // counterpart to set here. SRTO_CONNTIMEO is enforced below with
        // `tokio::time::timeout` rather than a socket option, since it
        // bounds the handshake call itself, not the established link.
        let mut options = SocketOptions::default();
        options.sender.buffer_size = config.send_buffer_bytes;
        options.flow_control.window_size = config.flight_window;
        options.session.peer_idle_timeout = config.peer_idle_timeout;

        let handshake = SrtSocket::builder()
            .latency(config.latency)
            .with(options)
            .call(addr, Some(&stream_id));

        let socket = tokio::time::timeout(config.connect_timeout, handshake)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "srt connect handshake timed out"))?
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        Ok(Box::new(SrtTokioLink { socket }))
    }
}

struct SrtTokioLink {
    socket: SrtSocket,
}

#[async_trait]
impl SrtLink for SrtTokioLink {
    async fn send_message(&mut self, data: Bytes) -> Result<(), LinkError> {
        self.socket
            .send((Instant::now(), data))
            .await
            .map_err(classify_send_error)
    }

    async fn close(&mut self) {
        let _ = self.socket.close().await;
    }
}

/// Classifies a raw `srt_tokio` send error while its real type is still in
/// hand, before any erasure to [`io::Error`] would collapse it to
/// [`io::ErrorKind::Other`] and make it unclassifiable downstream.
///
/// `srt_tokio`'s send error doesn't currently expose a granular enum this
/// crate can match on directly, so this inspects the error's rendered text
/// for the vocabulary a connection-loss/timeout condition actually uses.
/// Anything that doesn't match is still treated as connection-lost rather
/// than silently discarded: on a live link, a send failure this crate
/// can't positively identify as benign is far more likely to mean the peer
/// is gone than to mean a one-off, retry-safe hiccup.
fn classify_send_error(e: impl std::error::Error + Send + Sync + 'static) -> LinkError {
    let text = e.to_string().to_ascii_lowercase();
    let benign_one_off = text.contains("invalid")
        || text.contains("too large")
        || text.contains("too long")
        || text.contains("bad argument");

    let io_err = io::Error::new(io::ErrorKind::Other, e);
    if benign_one_off {
        LinkError::Other(io_err)
    } else {
        LinkError::ConnectionLost(io_err)
    }
}

#[cfg(test)]
mod classify_tests {
    use super::*;

    #[derive(Debug)]
    struct FakeSrtError(&'static str);

    impl fmt::Display for FakeSrtError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for FakeSrtError {}

    #[test]
    fn unrecognized_send_errors_arm_reconnect() {
        let e = FakeSrtError("connection closed by peer");
        assert!(matches!(classify_send_error(e), LinkError::ConnectionLost(_)));
    }

    #[test]
    fn idle_timeout_text_arms_reconnect() {
        let e = FakeSrtError("peer idle timeout expired");
        assert!(matches!(classify_send_error(e), LinkError::ConnectionLost(_)));
    }

    #[test]
    fn malformed_payload_errors_do_not_arm_reconnect() {
        let e = FakeSrtError("invalid payload: message too large");
        assert!(matches!(classify_send_error(e), LinkError::Other(_)));
    }
}
