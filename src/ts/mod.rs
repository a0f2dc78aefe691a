//! Bit-exact MPEG-TS (ISO/IEC 13818-1) multiplexing for a single H.264
//! elementary stream: PAT/PMT emission, PES packetization, and TS packet
//! segmentation into SRT-sized datagrams.

pub mod crc;
pub mod muxer;
pub mod pes;
pub mod types;

pub use muxer::TsMuxer;
