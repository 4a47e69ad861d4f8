//! Field-safe byte packing for availability publication.
//!
//! The full oracle snapshot is published as a size-bounded blob of 32-byte
//! chunks. The most-significant byte of every chunk is forced to zero so the
//! chunk's numeric value stays strictly below the BN254 modulus, leaving 31
//! usable bytes per chunk.
//!
//! Framing is an explicit 4-byte big-endian length prefix: payloads may
//! legitimately contain zero bytes, so zero-byte termination would corrupt
//! them.

use alloy_primitives::B256;
use thiserror::Error;

/// Chunk width in bytes — the target field's byte width.
pub const CHUNK_WIDTH: usize = 32;
/// Payload bytes carried per chunk (the most-significant byte is reserved).
pub const USABLE_PER_CHUNK: usize = CHUNK_WIDTH - 1;
/// Length-prefix width.
const LEN_PREFIX: usize = 4;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("payload of {len} bytes exceeds blob capacity of {capacity} bytes")]
    PayloadTooLarge { len: usize, capacity: usize },

    #[error("malformed blob: {0}")]
    Malformed(String),
}

/// Maximum payload length packable into `chunk_count` chunks.
pub fn capacity(chunk_count: usize) -> usize {
    (chunk_count * USABLE_PER_CHUNK).saturating_sub(LEN_PREFIX)
}

/// Pack `payload` into exactly `chunk_count` field-safe chunks.
///
/// The frame (length prefix + payload) is split across the low 31 bytes of
/// each chunk; unused chunks are zero. Fails with `PayloadTooLarge` when the
/// payload exceeds [`capacity`] — retrying cannot fix a size problem.
pub fn pack(payload: &[u8], chunk_count: usize) -> Result<Vec<B256>, BlobError> {
    if payload.len() > capacity(chunk_count) {
        return Err(BlobError::PayloadTooLarge {
            len: payload.len(),
            capacity: capacity(chunk_count),
        });
    }

    let mut frame = Vec::with_capacity(LEN_PREFIX + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);

    let mut chunks = Vec::with_capacity(chunk_count);
    for piece in frame.chunks(USABLE_PER_CHUNK) {
        let mut bytes = [0u8; CHUNK_WIDTH];
        bytes[1..1 + piece.len()].copy_from_slice(piece);
        chunks.push(B256::from(bytes));
    }
    chunks.resize(chunk_count, B256::ZERO);
    Ok(chunks)
}

/// Reassemble the payload from field-safe chunks.
pub fn unpack(chunks: &[B256]) -> Result<Vec<u8>, BlobError> {
    let mut bytes = Vec::with_capacity(chunks.len() * USABLE_PER_CHUNK);
    for chunk in chunks {
        let raw = chunk.as_slice();
        if raw[0] != 0 {
            return Err(BlobError::Malformed(
                "nonzero most-significant chunk byte".to_string(),
            ));
        }
        bytes.extend_from_slice(&raw[1..]);
    }

    if bytes.len() < LEN_PREFIX {
        return Err(BlobError::Malformed("missing length prefix".to_string()));
    }
    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if len > bytes.len() - LEN_PREFIX {
        return Err(BlobError::Malformed(format!(
            "length prefix {len} exceeds {} available bytes",
            bytes.len() - LEN_PREFIX
        )));
    }

    Ok(bytes[LEN_PREFIX..LEN_PREFIX + len].to_vec())
}
