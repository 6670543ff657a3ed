//! # Codec Adapter
//!
//! Thin wrapper around the zstd primitive. The rest of the crate treats
//! compression as an opaque capability: bytes in, bytes out, plus a level
//! range. Encoding stays single-threaded so that a given (input, level) pair
//! always produces identical bytes regardless of worker count.

use std::io;

use crate::error::ArcxError;

/// Lowest level the codec accepts.
pub const MIN_LEVEL: i32 = 1;
/// Highest level the codec accepts.
pub const MAX_LEVEL: i32 = 22;

/// Validate a user-supplied compression level against the codec range.
pub fn validate_level(level: i32) -> Result<i32, ArcxError> {
    if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        Ok(level)
    } else {
        Err(ArcxError::LevelOutOfRange(level))
    }
}

/// Compress a whole buffer at the given level.
pub fn compress(data: &[u8], level: i32) -> io::Result<Vec<u8>> {
    zstd::encode_all(data, level)
}

/// Decompress a payload block back to its original bytes.
///
/// `original_size` is the size recorded in the manifest; a decoded length
/// that disagrees with it is reported as corruption even when the zstd frame
/// itself parses.
pub fn decompress(data: &[u8], original_size: u64) -> io::Result<Vec<u8>> {
    let out = zstd::decode_all(data)?;
    if out.len() as u64 != original_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "decoded {} bytes, manifest says {}",
                out.len(),
                original_size
            ),
        ));
    }
    Ok(out)
}
