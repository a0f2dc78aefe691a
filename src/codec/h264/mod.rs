//! # H.264/AVC keyframe detection
//!
//! The only question this crate's muxer asks of an access unit is whether
//! it contains an IDR picture ([`contains_keyframe`]); it never needs a
//! NAL-unit typing model beyond that one byte-level scan.

/// Keyframe detection used by the TS muxer's per-access-unit scan
pub mod nal_scan;

#[doc(inline)]
pub use nal_scan::contains_keyframe;
