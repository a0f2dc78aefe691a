//! # H.264 Access-Unit Typing
//!
//! This crate only ever looks at H.264 access units the way the TS muxer
//! needs to: to decide whether one carries an IDR (random-access) picture.
//! It does not parse SPS/PPS, does not decode, and does not transcode —
//! those belong to a full codec toolkit, not a publishing pipeline.

/// H.264/AVC keyframe detection
pub mod h264;

#[doc(inline)]
pub use h264::contains_keyframe;
