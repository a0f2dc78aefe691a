//! SRT (Secure Reliable Transport) caller-mode transport.
//!
//! This module owns the one network-facing dependency in the crate: a
//! single outbound SRT connection to a streaming ingest endpoint, tuned
//! for a high-jitter, high-loss link and resilient to transient outages
//! via a structured, capped-backoff reconnect worker (see
//! [`transport::Transport`]).

mod link;
mod transport;

pub use link::{LinkError, SrtConnector, SrtLink, SrtTokioConnector};
pub use transport::{
    backoff_delay, ConnectionState, Transport, TransportHandle, MAX_RECONNECT_ATTEMPTS,
};
