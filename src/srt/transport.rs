//! The SRT caller-mode transport: initial connect, non-blocking send, and a
//! structured reconnect worker.
//!
//! Unlike the original `libsrt`-backed prototype, `srt_tokio` carries no
//! process-global state to initialize or tear down (no `srt_startup`/
//! `srt_cleanup` equivalent), so this crate has no `Transport::new()` step
//! distinct from `init()` — constructing a `Transport` and performing the
//! first connect are the same operation.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::task::JoinHandle;

use super::link::{LinkError, SrtConnector, SrtLink, SrtTokioConnector};
use crate::config::TransportConfig;

/// Capped exponential backoff attempts before a session is declared
/// terminally dead.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;
const MAX_BACKOFF_MS: u64 = 16_000;
const SEND_QUEUE_CAPACITY: usize = 64;

/// The transport's Disconnected/Connected/Reconnecting state machine.
/// A valid socket exists only while `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket; only a new `init` (or, internally, a fresh reconnect
    /// attempt) can leave this state.
    Disconnected,
    /// A socket is held by the worker task; `send` enqueues onto it.
    Connected,
    /// The worker is between reconnect attempts.
    Reconnecting,
}

/// Backoff delay before reconnect attempt `attempt` (1-based):
/// `min(1000 * 2^(attempt-1), 16000)` ms.
pub fn backoff_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    let millis = 1_000u64.saturating_mul(1u64 << shift);
    Duration::from_millis(millis.min(MAX_BACKOFF_MS))
}

/// A cloneable, non-blocking send path into a [`Transport`]'s worker queue.
/// See [`Transport::sender_handle`].
#[derive(Clone)]
pub struct TransportHandle {
    cmd_tx: mpsc::Sender<Bytes>,
}

impl TransportHandle {
    /// Same drop-on-backpressure semantics as [`Transport::send`].
    pub fn send(&self, data: &[u8]) {
        send_via(&self.cmd_tx, data);
    }
}

fn send_via(cmd_tx: &mpsc::Sender<Bytes>, data: &[u8]) {
    match cmd_tx.try_send(Bytes::copy_from_slice(data)) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            log::debug!("srt send queue full, dropping {} bytes", data.len());
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            log::debug!("srt worker gone, dropping {} bytes", data.len());
        }
    }
}

struct Shared {
    state: RwLock<ConnectionState>,
    reconnect_attempts: AtomicU32,
    connector: Arc<dyn SrtConnector>,
    config: TransportConfig,
    addr: SocketAddr,
    stream_id: String,
}

/// One SRT caller-mode publishing session.
pub struct Transport {
    shared: Arc<Shared>,
    cmd_tx: mpsc::Sender<Bytes>,
    shutdown: Arc<Notify>,
    worker: Option<JoinHandle<()>>,
}

impl Transport {
    /// Performs the blocking initial connect and, on success, spawns the
    /// reconnect worker. Returns `(false, None)` on any connect failure —
    /// configuration error or handshake timeout alike — matching `init`'s
    /// boolean contract; the caller is never handed a `Result` here
    /// because a failed connect is an expected outcome, not exceptional.
    pub async fn init(
        ip: Ipv4Addr,
        port: u16,
        stream_id: impl Into<String>,
    ) -> (bool, Option<Self>) {
        Self::init_with(
            Arc::new(SrtTokioConnector),
            TransportConfig::from_env(),
            ip,
            port,
            stream_id,
        )
        .await
    }

    /// Same as [`Transport::init`] but with an injected connector and
    /// config, for testing the state machine without a real socket.
    pub(crate) async fn init_with(
        connector: Arc<dyn SrtConnector>,
        config: TransportConfig,
        ip: Ipv4Addr,
        port: u16,
        stream_id: impl Into<String>,
    ) -> (bool, Option<Self>) {
        let addr = SocketAddr::new(ip.into(), port);
        let stream_id = stream_id.into();

        let link = match connector.connect(&config, addr, &stream_id).await {
            Ok(link) => link,
            Err(e) => {
                log::warn!("srt connect to {addr} failed: {e}");
                return (false, None);
            }
        };

        let shared = Arc::new(Shared {
            state: RwLock::new(ConnectionState::Connected),
            reconnect_attempts: AtomicU32::new(0),
            connector,
            config,
            addr,
            stream_id,
        });

        let (cmd_tx, cmd_rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
        let shutdown = Arc::new(Notify::new());
        let worker = tokio::spawn(run_worker(
            Arc::clone(&shared),
            link,
            cmd_rx,
            Arc::clone(&shutdown),
        ));

        (
            true,
            Some(Self {
                shared,
                cmd_tx,
                shutdown,
                worker: Some(worker),
            }),
        )
    }

    /// Non-blocking enqueue. Drops (and logs at debug level) when the
    /// worker's queue is full or gone — during `Reconnecting` or terminal
    /// `Disconnected`, the queue fills and every subsequent `send` becomes
    /// a silent no-op — runtime errors never propagate to the caller.
    pub fn send(&self, data: &[u8]) {
        send_via(&self.cmd_tx, data);
    }

    /// A cheaply cloneable handle carrying just the send path, decoupled
    /// from the `Transport` it came from. [`crate::Publisher`] hands one of
    /// these to the muxer as its sink closure, so the muxer's sink can
    /// outlive any particular borrow of `Transport` without the two
    /// fighting over `&self`/`&mut self`.
    pub fn sender_handle(&self) -> TransportHandle {
        TransportHandle {
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    /// Current connection state, for observability and tests.
    pub async fn state(&self) -> ConnectionState {
        *self.shared.state.read().await
    }

    /// Reconnect attempts made since the last successful connect (0 while
    /// `Connected`).
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Signals the worker to stop and awaits it — a structured join
    /// instead of the original's detached thread, so repeated
    /// init/release cycles cannot leak a task.
    pub async fn release(mut self) {
        self.shutdown.notify_one();
        drop(self.cmd_tx);
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

async fn run_worker(
    shared: Arc<Shared>,
    mut link: Box<dyn SrtLink>,
    mut cmd_rx: mpsc::Receiver<Bytes>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                link.close().await;
                return;
            }
            received = cmd_rx.recv() => {
                match received {
                    None => {
                        link.close().await;
                        return;
                    }
                    Some(bytes) => handle_send(&shared, &mut link, bytes).await,
                }
            }
        }

        if *shared.state.read().await == ConnectionState::Disconnected {
            // Reconnect attempts are exhausted. `Transport::send` has no
            // way to know that short of this worker continuing to drain
            // (and drop) the channel, so just wait here for `release`.
            shutdown.notified().await;
            link.close().await;
            return;
        }
    }
}

async fn handle_send(shared: &Arc<Shared>, link: &mut Box<dyn SrtLink>, bytes: Bytes) {
    let len = bytes.len();
    let err = match link.send_message(bytes).await {
        Ok(()) => return,
        Err(LinkError::Other(e)) => {
            log::error!("srt send error, dropping {len} bytes: {e}");
            return;
        }
        Err(LinkError::ConnectionLost(e)) => e,
    };

    log::warn!("srt connection lost to {}: {err}", shared.addr);
    *shared.state.write().await = ConnectionState::Reconnecting;

    match reconnect(shared).await {
        Some(new_link) => {
            *link = new_link;
            *shared.state.write().await = ConnectionState::Connected;
        }
        None => {
            *shared.state.write().await = ConnectionState::Disconnected;
            log::error!(
                "srt reconnect exhausted after {MAX_RECONNECT_ATTEMPTS} attempts to {}",
                shared.addr
            );
        }
    }
}

async fn reconnect(shared: &Shared) -> Option<Box<dyn SrtLink>> {
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        shared.reconnect_attempts.store(attempt, Ordering::SeqCst);
        tokio::time::sleep(backoff_delay(attempt)).await;

        match shared
            .connector
            .connect(&shared.config, shared.addr, &shared.stream_id)
            .await
        {
            Ok(link) => {
                shared.reconnect_attempts.store(0, Ordering::SeqCst);
                return Some(link);
            }
            Err(e) => {
                log::warn!(
                    "reconnect attempt {attempt}/{MAX_RECONNECT_ATTEMPTS} to {} failed: {e}",
                    shared.addr
                );
            }
        }
    }
    None
}
