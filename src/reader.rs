//! Lazy random-access block reader.
//!
//! [`BlockDecoder`] owns a seekable byte source for its lifetime. The small
//! sections — magic, header, footer, index — are materialised once, on the
//! first accessor call:
//!
//! 1. Read 4 bytes at offset 0 and check the magic.
//! 2. Read the 2-byte header; reject unsupported versions.
//! 3. Seek 20 bytes back from the end and decode the footer.
//! 4. Seek to `footer.index_offset`, read `footer.index_len` bytes, decode
//!    the index (its inner CRC is verified here).
//!
//! Bloom pages are never touched during init. Iteration seeks to
//! `offsets[i]` and decodes one framed page on demand, caching only the most
//! recently accessed page. The first error poisons the decoder for good;
//! every later call observes it.
//!
//! The decoder is not safe for shared use. Parallel readers open independent
//! decoders over independent sources (e.g. two handles on the same path).
//! There is no async contract; the file-backed decoder blocks on seek and
//! read. Dropping the decoder releases the source.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};

use crate::block::{BlockCodec, Footer, Header, Index, Version, FOOTER_SIZE, MAGIC};
use crate::bloom::Bloom;
use crate::encoding::{Crc32cHasher, DecBuf};
use crate::error::{Error, Result};

fn eof_to_truncated(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Truncated
    } else {
        Error::Io(e)
    }
}

pub struct BlockDecoder<R: Read + Seek> {
    reader: R,
    // sections loaded by init()
    header: Header,
    index: Index,
    footer: Footer,
    initialized: bool,
    // lazy page iteration
    idx: i64,
    curr: Option<Bloom>,
    err: Option<Error>,
}

impl BlockDecoder<Cursor<Vec<u8>>> {
    /// Decoder over an in-memory copy of the block.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::new(Cursor::new(data))
    }
}

impl BlockDecoder<File> {
    /// Decoder over an open file handle.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read + Seek> BlockDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            header: Header::default(),
            index: Index::default(),
            footer: Footer::default(),
            initialized: false,
            idx: -1,
            curr: None,
            err: None,
        }
    }

    /// Release the decoder and hand back the byte source.
    pub fn into_inner(self) -> R {
        self.reader
    }

    pub fn header(&mut self) -> Result<Header> {
        self.ensure_init()?;
        Ok(self.header)
    }

    pub fn footer(&mut self) -> Result<Footer> {
        self.ensure_init()?;
        Ok(self.footer)
    }

    pub fn index(&mut self) -> Result<&Index> {
        self.ensure_init()?;
        Ok(&self.index)
    }

    /// Latest sticky error.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Advance the page cursor. Returns false past the last page or once the
    /// decoder is poisoned.
    pub fn next(&mut self) -> bool {
        if self.ensure_init().is_err() {
            return false;
        }
        if self.idx + 1 < self.index.offsets.len() as i64 {
            self.idx += 1;
            self.curr = None;
            true
        } else {
            false
        }
    }

    /// The page at the cursor, decoded on demand and cached until the next
    /// [`next`](Self::next). Returns `None` before the first `next`, past
    /// the end, or after an error (see [`err`](Self::err)).
    pub fn current(&mut self) -> Option<&Bloom> {
        if self.ensure_init().is_err() {
            return None;
        }
        if self.idx < 0 || self.idx >= self.index.offsets.len() as i64 {
            return None;
        }
        if self.curr.is_none() {
            match self.read_page(self.idx as usize) {
                Ok(page) => self.curr = Some(page),
                Err(e) => {
                    self.err = Some(e);
                    return None;
                }
            }
        }
        self.curr.as_ref()
    }

    /// Recompute the outer checksum and compare it to the footer.
    ///
    /// The stored value covers every byte preceding the footer — the encoder
    /// hashes the stream before the footer is written, so the covered range
    /// is `[0, end-20)`, i.e. `[0, index_offset + index_len)`.
    ///
    /// The open path stores the footer checksum without validating it; call
    /// this before trusting a block that arrived over the network.
    pub fn verify(&mut self) -> Result<()> {
        self.ensure_init()?;
        let stored = self.footer.checksum.unwrap_or(0);

        let end = self.reader.seek(SeekFrom::End(0))?;
        if end < FOOTER_SIZE as u64 {
            return Err(Error::Truncated);
        }
        self.reader.seek(SeekFrom::Start(0))?;

        let mut hasher = Crc32cHasher::new();
        let mut buf = [0u8; 8 << 10];
        let mut remaining = end - FOOTER_SIZE as u64;
        while remaining > 0 {
            let n = remaining.min(buf.len() as u64) as usize;
            self.reader
                .read_exact(&mut buf[..n])
                .map_err(eof_to_truncated)?;
            hasher.update(&buf[..n]);
            remaining -= n as u64;
        }

        let computed = hasher.finalize();
        if computed != stored {
            return Err(Error::ChecksumMismatch { computed, stored });
        }
        Ok(())
    }

    fn ensure_init(&mut self) -> Result<()> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        if self.initialized {
            return Ok(());
        }
        match self.init() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.err = Some(e.clone());
                Err(e)
            }
        }
    }

    fn init(&mut self) -> Result<()> {
        // 1. Magic.
        self.reader.seek(SeekFrom::Start(0))?;
        let sig = self
            .reader
            .read_u32::<BigEndian>()
            .map_err(eof_to_truncated)?;
        if sig != MAGIC {
            return Err(Error::BadMagic { got: sig });
        }

        // 2. Header; the decoder only knows how to walk V1 blocks.
        let mut buf = [0u8; 2];
        self.reader.read_exact(&mut buf).map_err(eof_to_truncated)?;
        let mut dec = DecBuf::new(&buf);
        self.header = Header::decode(&mut dec, Version::UNSUPPORTED)?;
        if !self.header.version.is_supported() {
            return Err(Error::UnsupportedVersion(self.header.version.as_byte()));
        }

        // 3. Footer, anchored 20 bytes from the end.
        self.reader.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut buf = [0u8; FOOTER_SIZE];
        self.reader.read_exact(&mut buf).map_err(eof_to_truncated)?;
        let mut dec = DecBuf::new(&buf);
        self.footer = Footer::decode(&mut dec, self.header.version)?;

        // 4. Index; its inner CRC is verified during decode.
        self.reader.seek(SeekFrom::Start(self.footer.index_offset))?;
        let mut buf = vec![0u8; self.footer.index_len as usize];
        self.reader.read_exact(&mut buf).map_err(eof_to_truncated)?;
        let mut dec = DecBuf::new(&buf);
        self.index = Index::decode(&mut dec, self.header.version)?;

        self.idx = -1;
        self.initialized = true;
        Ok(())
    }

    fn read_page(&mut self, i: usize) -> Result<Bloom> {
        let locator = self.index.offsets[i];
        self.reader.seek(SeekFrom::Start(locator.offset))?;
        let mut buf = vec![0u8; locator.len as usize];
        self.reader.read_exact(&mut buf).map_err(eof_to_truncated)?;
        // The slice is a complete framed page; the decoded filter must own
        // its storage since the buffer dies here.
        let mut dec = DecBuf::new(&buf);
        Bloom::decode_copy(&mut dec)
    }
}
