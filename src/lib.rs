//! # bloomblock — bloom-filter index blocks for log storage
//!
//! A block packages one bloom filter per page over a set of tokens, plus a
//! small index naming the series fingerprint, the contributing chunk time
//! ranges, each page's byte offsets, and the indexed field names. Blocks are
//! the unit moved and cached between object storage and query-time filter
//! evaluators.
//!
//! Format guarantees (frozen in v1):
//! - Fixed-width integers are big-endian; varints are LEB128, signed values
//!   zigzag-mapped. Never negotiated.
//! - Offset 0 carries the magic `0x626F6F6D`; the version byte follows and
//!   must be 1. Version 0 is reserved "unsupported"; anything else is
//!   rejected by the layers that dispatch on it.
//! - The index carries a mandatory CRC-32/Castagnoli trailer covering
//!   exactly its own bytes; a corrupt index aborts the read.
//! - The footer (last 20 bytes) locates the index and carries an outer
//!   CRC-32C over everything preceding the footer. Readers store it
//!   verbatim; [`BlockDecoder::verify`] recomputes it on demand.
//! - Pages are self-delimiting length-prefixed byte strings; the filter's
//!   internal layout belongs to the bloom filter library.
//! - Written blocks are immutable; there is no in-place mutation and no
//!   schema evolution beyond the version byte.

pub mod block;
pub mod bloom;
pub mod config;
pub mod encoding;
pub mod error;
pub mod reader;
pub mod writer;

// Flat re-exports for the most common types.
pub use block::{
    Block, BlockCodec, BlockCodecDelta, Blooms, ChunkRef, Encoding, Footer, Header, Index, Offset,
    Version, FOOTER_SIZE, MAGIC,
};
pub use bloom::Bloom;
pub use config::{Config, ConfigError, DownloadingQueueConfig};
pub use encoding::{DecBuf, EncBuf};
pub use error::{Error, Result};
pub use reader::BlockDecoder;
pub use writer::{block_to_bytes, BlockEncoder};
