//! Block writer.
//!
//! The encoder composes the whole block in memory and then hands the bytes
//! to the sink in one write, so peak memory is roughly the sum of all page
//! sizes plus the index. There is no page-at-a-time streaming path.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::block::{Block, Version};
use crate::encoding::EncBuf;
use crate::error::Result;

pub struct BlockEncoder<W: Write + Seek> {
    writer: W,
}

impl BlockEncoder<File> {
    /// Encoder writing a fresh block file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write + Seek> BlockEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialise `block` and write it out from offset 0.
    ///
    /// Returns the number of bytes written. The block is mutated the same
    /// way [`Block::encode`] mutates it: footer offsets are filled from the
    /// measured stream and a `None` checksum is computed.
    pub fn encode(&mut self, block: &mut Block) -> Result<u64> {
        let mut enc = EncBuf::with_capacity(4 << 10);
        block.encode(&mut enc, Version::V1)?;

        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(enc.as_slice())?;
        self.writer.flush()?;
        Ok(enc.len() as u64)
    }

    /// Release the encoder and hand back the sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialise `block` into a fresh byte vector.
pub fn block_to_bytes(block: &mut Block) -> Result<Vec<u8>> {
    let mut enc = EncBuf::with_capacity(4 << 10);
    block.encode(&mut enc, Version::V1)?;
    Ok(enc.into_bytes())
}
