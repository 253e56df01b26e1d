//! Wire codec for peer frames
//!
//! Frame layout before compression: `[payload, timestamp_ms, tag]` as compact
//! JSON. The tag is a CRC32 of the payload text seeded with the CRC32 of the
//! timestamp digits. Combination order (timestamp first) is part of the wire
//! contract.

use std::io::{Read, Write};

use lz4_flex::frame::{BlockSize, FrameDecoder, FrameEncoder, FrameInfo};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

/// Largest decompressed frame accepted
pub const MAX_FRAME_BYTES: usize = 16 * 1024;

/// Errors that can occur while encoding or decoding a frame
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Compression error: {0}")]
    Compress(#[from] lz4_flex::frame::Error),
    #[error("Frame too large: more than {0} bytes")]
    TooLarge(usize),
    #[error("Frame is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Checksum mismatch: expected {expected:#010x}, found {found:#010x}")]
    Checksum { expected: u32, found: u32 },
}

/// A decoded, integrity-checked frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T> {
    pub payload: T,
    pub timestamp: u64,
}

/// CRC32 of the payload text, seeded with the CRC32 of the timestamp
pub fn integrity_tag(payload_json: &str, timestamp: u64) -> u32 {
    let seed = crc32fast::hash(timestamp.to_string().as_bytes());
    let mut hasher = crc32fast::Hasher::new_with_initial(seed);
    hasher.update(payload_json.as_bytes());
    hasher.finalize()
}

/// Serialize, tag and compress a payload
pub fn encode<T: Serialize>(payload: &T, timestamp: u64) -> Result<Vec<u8>, CodecError> {
    let payload_json = serde_json::to_string(payload)?;
    let tag = integrity_tag(&payload_json, timestamp);
    let raw = RawValue::from_string(payload_json)?;
    let text = serde_json::to_string(&(&raw, timestamp, tag))?;
    compress(text.as_bytes())
}

/// Decompress, verify and deserialize a frame
///
/// Staleness is not checked here; that needs session state.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<Frame<T>, CodecError> {
    let text = decompress(bytes)?;
    let text = std::str::from_utf8(&text)?;
    let (raw, timestamp, found): (Box<RawValue>, u64, u32) = serde_json::from_str(text)?;

    let expected = integrity_tag(raw.get(), timestamp);
    if expected != found {
        return Err(CodecError::Checksum { expected, found });
    }

    let payload = serde_json::from_str(raw.get())?;
    Ok(Frame { payload, timestamp })
}

fn frame_info() -> FrameInfo {
    FrameInfo::new()
        .block_size(BlockSize::Max64KB)
        .block_checksums(true)
        .content_checksum(true)
}

fn compress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = FrameEncoder::with_frame_info(frame_info(), Vec::with_capacity(bytes.len()));
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(bytes.len() * 2);
    FrameDecoder::new(bytes)
        .take(MAX_FRAME_BYTES as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() > MAX_FRAME_BYTES {
        return Err(CodecError::TooLarge(MAX_FRAME_BYTES));
    }
    Ok(out)
}
