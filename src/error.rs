//! Error type shared by every layer of the block codec.

use std::io;
use thiserror::Error;

use crate::block::MAGIC;

#[derive(Debug, Error)]
pub enum Error {
    /// The first four bytes of the block are not the magic number.
    #[error("invalid magic number: got {got:#010x}, expected {MAGIC:#010x}")]
    BadMagic { got: u32 },

    /// The header version byte is zero or not recognised by this build.
    #[error("unsupported block version {0}")]
    UnsupportedVersion(u8),

    /// A read would run past the end of the buffer or file.
    #[error("unexpected end of buffer")]
    Truncated,

    /// A stored CRC-32C does not match the bytes it covers.
    #[error("checksum mismatch: computed {computed:#010x}, stored {stored:#010x}")]
    ChecksumMismatch { computed: u32, stored: u32 },

    /// The bloom filter's own encoder or decoder failed.
    #[error("bloom filter codec: {0}")]
    BloomCodec(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// The lazy reader latches its first error and keeps returning it from every
// subsequent accessor call. io::Error is the one variant that does not derive
// Clone; it clones by kind and message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::BadMagic { got } => Error::BadMagic { got: *got },
            Error::UnsupportedVersion(v) => Error::UnsupportedVersion(*v),
            Error::Truncated => Error::Truncated,
            Error::ChecksumMismatch { computed, stored } => Error::ChecksumMismatch {
                computed: *computed,
                stored: *stored,
            },
            Error::BloomCodec(msg) => Error::BloomCodec(msg.clone()),
            Error::Io(e) => Error::Io(io::Error::new(e.kind(), e.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
