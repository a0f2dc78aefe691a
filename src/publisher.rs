//! Crate-level lifecycle surface: one [`Publisher`] owns one [`Transport`]
//! and one [`TsMuxer`], wiring the muxer's sink into the transport's send
//! path so a caller only ever sees `init`/`send_frame`/`release`.

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::config::TransportConfig;
use crate::error::PublishError;
use crate::srt::{SrtTokioConnector, Transport};
use crate::ts::TsMuxer;
use crate::Result;

/// The crate's single public entry point. Mirrors the three-call lifecycle
/// of the original Android prototype's JNI surface (`nativeInit` /
/// `nativeSendFrame` / `nativeRelease`): construct via [`Publisher::init`],
/// feed access units with [`Publisher::send_frame`], tear down with
/// [`Publisher::release`].
///
/// A `Publisher` that failed to connect (`init` returned `None`) is not
/// constructed at all — there is no "disconnected publisher" value to hold
/// and mistakenly call `send_frame` on.
pub struct Publisher {
    transport: Transport,
    muxer: TsMuxer<Box<dyn FnMut(&[u8]) + Send>>,
}

impl Publisher {
    /// Connects to `(ip, port)` as an SRT caller advertising
    /// `streamid = "publish:" + stream_id`, using the default
    /// [`TransportConfig`] (overridable via `SRTCAST_*` environment
    /// variables; see [`TransportConfig::from_env`]).
    ///
    /// Returns `None` on any connect failure — a bad endpoint, a closed
    /// port, a handshake timeout — reshaped from a boolean `init` contract
    /// into an `Option` since a failed connect here means there is no
    /// `Publisher` to hand back: this is an expected outcome the caller
    /// branches on, not an error type.
    pub async fn init(ip: Ipv4Addr, port: u16, stream_id: impl Into<String>) -> Option<Self> {
        let (ok, transport) = Transport::init(ip, port, stream_id).await;
        if !ok {
            return None;
        }
        let transport = transport.expect("Transport::init returned true without a transport");
        Some(Self::from_transport(transport))
    }

    /// Same as [`Publisher::init`], but takes the destination IP as a
    /// string (as a host integration layer marshalling across a language
    /// boundary typically has it) instead of an already-parsed
    /// [`Ipv4Addr`]. Unlike a bad *port* or a closed socket — both of which
    /// are live-session outcomes `init` reports as `None` — an unparsable
    /// IP string is a configuration mistake caught before any connect is
    /// attempted, so it is the one case this crate surfaces as a
    /// [`PublishError`] rather than folding into `init`'s `None` outcome.
    pub async fn init_str(
        ip: &str,
        port: u16,
        stream_id: impl Into<String>,
    ) -> Result<Option<Self>> {
        let ip: Ipv4Addr = ip
            .parse()
            .map_err(|e| PublishError::InvalidEndpoint(format!("{ip}: {e}")))?;
        Ok(Self::init(ip, port, stream_id).await)
    }

    /// Same as [`Publisher::init`] but with an explicit [`TransportConfig`],
    /// for callers that want to override the socket tunables in code
    /// rather than via environment variables.
    pub async fn init_with_config(
        config: TransportConfig,
        ip: Ipv4Addr,
        port: u16,
        stream_id: impl Into<String>,
    ) -> Option<Self> {
        let (ok, transport) =
            Transport::init_with(Arc::new(SrtTokioConnector), config, ip, port, stream_id).await;
        if !ok {
            return None;
        }
        let transport = transport.expect("Transport::init_with returned true without a transport");
        Some(Self::from_transport(transport))
    }

    fn from_transport(transport: Transport) -> Self {
        // The sink closure only needs to move bytes into the transport's
        // queue; it does not touch `transport` again after this point, so
        // the muxer and the transport can live side by side in `Self`
        // without either borrowing the other.
        let send_handle = transport.sender_handle();
        let sink: Box<dyn FnMut(&[u8]) + Send> = Box::new(move |bytes: &[u8]| {
            send_handle.send(bytes);
        });
        Self {
            transport,
            muxer: TsMuxer::new(sink),
        }
    }

    /// Encodes one H.264 annex-B access unit and hands the resulting TS
    /// datagrams to the transport. Never blocks on the network and never
    /// fails: a disconnected transport silently drops the datagrams (see
    /// [`crate::srt::Transport::send`]).
    pub fn send_frame(&mut self, data: &[u8], pts_ns: u64) {
        self.muxer.encode(data, pts_ns);
    }

    /// Current transport state, for observability.
    pub async fn connection_state(&self) -> crate::srt::ConnectionState {
        self.transport.state().await
    }

    /// Closes the SRT socket and joins the reconnect worker. Consumes
    /// `self` so a released `Publisher` cannot be reused.
    pub async fn release(self) {
        self.transport.release().await;
    }
}
