//! # Error Types
//!
//! The muxer never fails: malformed access units degrade to non-keyframe
//! output, not an error. Connect failures and socket errors don't raise
//! either — they surface as `init`'s `None`/`false` return, not an error
//! type (see [`crate::Publisher::init`], [`crate::srt::Transport::init`]).
//! `PublishError` exists for the one configuration mistake that's caught
//! *before* any of that: an unparsable endpoint string, in
//! [`crate::Publisher::init_str`].

use thiserror::Error;

/// Errors this crate's fallible constructors can return.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The destination address/port/stream id did not form a valid
    /// configuration (e.g. an unparsable IP string).
    #[error("invalid endpoint configuration: {0}")]
    InvalidEndpoint(String),
}

/// A specialized `Result` for this crate's fallible constructors.
pub type Result<T> = std::result::Result<T, PublishError>;
