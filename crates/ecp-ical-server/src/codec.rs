//! Blob codec for cached content: JSON, zlib-compressed at best compression.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding a blob.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to deserialize record: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("failed to compress record: {0}")]
    Compress(#[source] io::Error),

    #[error("failed to decompress record: {0}")]
    Decompress(#[source] io::Error),
}

/// Serializes `value` to JSON and compresses it.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let json = serde_json::to_vec(value).map_err(CodecError::Serialize)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&json).map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Compress)
}

/// Decompresses `bytes` and deserializes the JSON inside.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    let mut json = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(CodecError::Decompress)?;
    serde_json::from_slice(&json).map_err(CodecError::Deserialize)
}
