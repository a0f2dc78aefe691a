#![doc(html_root_url = "https://docs.rs/srtcast/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # srtcast - live H.264-over-SRT publishing
//!
//! `srtcast` takes a sequence of H.264 annex-B access units with
//! presentation timestamps and publishes them to a streaming ingest
//! endpoint over [SRT](https://github.com/Haivision/srt), packaged as an
//! MPEG-TS (ISO/IEC 13818-1) elementary stream.
//!
//! The crate is a strict two-stage pipeline:
//!
//! - [`ts`]: a bit-exact MPEG-TS multiplexer ([`ts::TsMuxer`]) that turns
//!   one access unit into PAT/PMT/PES-bearing 188-byte TS packets, buffered
//!   into SRT-sized datagrams.
//! - [`srt`]: a resilient SRT caller-mode transport ([`srt::Transport`])
//!   that owns the socket, performs the initial connect, and runs a
//!   structured reconnect worker with capped exponential backoff across
//!   transient network failures.
//!
//! [`Publisher`] wires the two together behind the three-call lifecycle a
//! live source needs: `init`, `send_frame`, `release`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use srtcast::Publisher;
//! use std::net::Ipv4Addr;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let publisher = Publisher::init(Ipv4Addr::new(127, 0, 0, 1), 9000, "cam1").await;
//! let Some(mut publisher) = publisher else {
//!     eprintln!("failed to connect");
//!     return;
//! };
//!
//! // SPS, PPS, IDR in one access unit; pts_ns in nanoseconds.
//! let access_unit = [
//!     0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1E,
//!     0x00, 0x00, 0x00, 0x01, 0x68, 0xCE, 0x38, 0x80,
//!     0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x80,
//! ];
//! publisher.send_frame(&access_unit, 0);
//!
//! publisher.release().await;
//! # }
//! ```
//!
//! ## Non-goals
//!
//! Audio multiplexing, B-frame/DTS handling, TS discontinuity
//! announcements, recording-to-file, SRT listener/rendezvous roles,
//! encryption, bandwidth shaping, adaptive bitrate/latency, and IPv6 are
//! all out of scope for this crate. The caller is expected to supply
//! already-encoded H.264 access units; `srtcast` does not own an encoder.

/// NAL unit typing and keyframe detection for H.264 annex-B access units.
pub mod codec;

/// Crate-wide configuration: SRT transport tuning, overridable via
/// environment variables.
pub mod config;

/// Error types for this crate's fallible constructors.
pub mod error;

/// The crate's lifecycle surface: [`Publisher`].
mod publisher;

/// The SRT caller-mode transport: connect, send, reconnect.
pub mod srt;

/// The bit-exact MPEG-TS multiplexer.
pub mod ts;

pub use error::{PublishError, Result};
pub use publisher::Publisher;
