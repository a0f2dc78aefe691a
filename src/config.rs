//! Transport tuning configuration.
//!
//! [`TransportConfig`] carries the SRT socket tunables for
//! [`crate::srt`]: sensible defaults tuned for a
//! high-jitter, high-loss link, each overridable at runtime via an
//! `SRTCAST_*` environment variable so a deployment can widen latency or
//! buffering for a worse link without a rebuild.

use std::env;
use std::time::Duration;

/// Socket tuning applied before every SRT connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// `SRTO_LATENCY`: peer + self latency, in milliseconds on the wire.
    pub latency: Duration,
    /// `SRTO_CONNTIMEO`: time allowed for the initial handshake.
    pub connect_timeout: Duration,
    /// `SRTO_FC`: flight window size, in packets.
    pub flight_window: u32,
    /// `SRTO_SNDBUF`: sender buffer size, in bytes.
    pub send_buffer_bytes: u32,
    /// `SRTO_PEERIDLETIMEO`: time without any packet from the peer before
    /// the connection is considered lost.
    pub peer_idle_timeout: Duration,
}

impl TransportConfig {
    /// The literal tunables from the original publishing pipeline: tuned
    /// for a vessel-over-cellular link, not for a datacenter-to-datacenter
    /// path.
    pub fn defaults() -> Self {
        Self {
            latency: Duration::from_millis(15_000),
            connect_timeout: Duration::from_millis(10_000),
            flight_window: 32_000,
            send_buffer_bytes: 50_000_000,
            peer_idle_timeout: Duration::from_millis(30_000),
        }
    }

    /// Starts from [`TransportConfig::defaults`] and overrides any field
    /// whose `SRTCAST_*` environment variable is present and parses.
    /// Unparseable or absent variables are silently ignored, leaving the
    /// default in place.
    pub fn from_env() -> Self {
        let mut config = Self::defaults();

        if let Some(v) = env_millis("SRTCAST_LATENCY_MS") {
            config.latency = v;
        }
        if let Some(v) = env_millis("SRTCAST_CONNECT_TIMEOUT_MS") {
            config.connect_timeout = v;
        }
        if let Some(v) = env_u32("SRTCAST_FLIGHT_WINDOW") {
            config.flight_window = v;
        }
        if let Some(v) = env_u32("SRTCAST_SEND_BUFFER_BYTES") {
            config.send_buffer_bytes = v;
        }
        if let Some(v) = env_millis("SRTCAST_PEER_IDLE_TIMEOUT_MS") {
            config.peer_idle_timeout = v;
        }

        config
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn env_u32(name: &str) -> Option<u32> {
    env::var(name).ok().and_then(|v| v.trim().parse::<u32>().ok())
}
