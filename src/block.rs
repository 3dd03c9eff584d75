//! Block format v1 — self-describing, checksummed, end-anchored index.
//!
//! # On-disk layout (fixed-width integers big-endian; varints LEB128)
//!
//! ```text
//! Offset  Field                     Size
//!    0    magic = 0x626F6F6D        4   BE u32 ("boom")
//!    4    header.version            1   u8, must be 1
//!    5    header.encoding           1   u8, page codec id
//!    6    blooms.count              8   BE u64
//!   14    page[0] .. page[k-1]      uvarint length + filter bytes each
//!   IO    index.fingerprint         uvarint u64
//!         index.chunks              uvarint count + delta ChunkRefs
//!         index.offsets             uvarint count + delta Offsets
//!         index.fields              uvarint count + uvarint-length UTF-8
//!         index.inner_crc           4   BE u32 (Castagnoli, covers IO..here)
//! END-20  footer.index_offset       8   BE u64 == IO
//! END-12  footer.index_len          8   BE u64
//! END-4   footer.checksum           4   BE u32 (Castagnoli over [0, END-20))
//! ```
//!
//! # Checksums
//! The index carries its own CRC-32C trailer, computed over exactly the
//! index bytes — `Block::encode` writes the index to a scratch buffer so the
//! trailer cannot cover anything else. The footer checksum covers every byte
//! before it; decoders store it verbatim and validate it only through
//! [`BlockDecoder::verify`](crate::reader::BlockDecoder::verify).
//!
//! # Ordering
//! `chunks` and `offsets` are delta-encoded against their predecessor and
//! MUST decode in write order; page `i` of the block is located by
//! `offsets[i]`, which spans the complete framed page including its length
//! prefix.

use std::collections::BTreeSet;
use std::fmt;

use crate::bloom::Bloom;
use crate::encoding::{castagnoli, DecBuf, EncBuf};
use crate::error::{Error, Result};

/// On-disk magic at offset 0. Spells "boom".
pub const MAGIC: u32 = 0x626F_6F6D;

/// Byte size of the footer (index_offset + index_len + checksum).
pub const FOOTER_SIZE: usize = 20;

// ── Version ──────────────────────────────────────────────────────────────────

/// Block layout version byte.
///
/// Zero is reserved as "unsupported". The header records whatever byte is on
/// disk; layers that dispatch on the version reject anything but
/// [`Version::V1`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(u8);

impl Version {
    pub const UNSUPPORTED: Version = Version(0);
    pub const V1: Version = Version(1);

    pub fn from_byte(b: u8) -> Self {
        Version(b)
    }

    pub fn as_byte(self) -> u8 {
        self.0
    }

    pub fn is_supported(self) -> bool {
        self == Version::V1
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::UNSUPPORTED
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ── Serialization contract ───────────────────────────────────────────────────

/// Types that (de)serialise themselves against a byte buffer.
///
/// `encode` is fallible for every implementor so that page containers can
/// surface per-page filter errors instead of dropping them. The version is
/// passed through so future layout revisions can branch.
pub trait BlockCodec: Sized {
    fn encode(&self, enc: &mut EncBuf, version: Version) -> Result<()>;
    fn decode(dec: &mut DecBuf<'_>, version: Version) -> Result<Self>;
}

/// Types that can additionally (de)serialise against a previous value.
///
/// `prev` is `None` for the first element of a sequence; both sides track it
/// in lockstep.
pub trait BlockCodecDelta: BlockCodec {
    fn encode_delta(&self, enc: &mut EncBuf, version: Version, prev: Option<&Self>) -> Result<()>;
    fn decode_delta(dec: &mut DecBuf<'_>, version: Version, prev: Option<&Self>) -> Result<Self>;
}

// ── Encoding registry ────────────────────────────────────────────────────────

/// Compression codec identifier for bloom pages.
///
/// The id is stored in the header and applied by the page layer elsewhere;
/// this crate never compresses. Unknown ids round-trip verbatim rather than
/// failing the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    None,
    Gzip,
    Lz4,
    Snappy,
    Zstd,
    Unknown(u8),
}

impl Encoding {
    pub fn as_byte(self) -> u8 {
        match self {
            Encoding::None => 0,
            Encoding::Gzip => 1,
            Encoding::Lz4 => 2,
            Encoding::Snappy => 3,
            Encoding::Zstd => 4,
            Encoding::Unknown(b) => b,
        }
    }

    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => Encoding::None,
            1 => Encoding::Gzip,
            2 => Encoding::Lz4,
            3 => Encoding::Snappy,
            4 => Encoding::Zstd,
            other => Encoding::Unknown(other),
        }
    }

    /// Human-readable name for diagnostics only, never parsed back.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::None => "none",
            Encoding::Gzip => "gzip",
            Encoding::Lz4 => "lz4",
            Encoding::Snappy => "snappy",
            Encoding::Zstd => "zstd",
            Encoding::Unknown(_) => "unknown",
        }
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::None
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Two-byte block header: layout version and page codec id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub version: Version,
    pub encoding: Encoding,
}

impl BlockCodec for Header {
    fn encode(&self, enc: &mut EncBuf, _version: Version) -> Result<()> {
        enc.put_byte(self.version.as_byte());
        enc.put_byte(self.encoding.as_byte());
        Ok(())
    }

    fn decode(dec: &mut DecBuf<'_>, _version: Version) -> Result<Self> {
        let version = dec.byte();
        let encoding = dec.byte();
        dec.err()?;
        if version == Version::UNSUPPORTED.as_byte() {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(Header {
            version: Version::from_byte(version),
            encoding: Encoding::from_byte(encoding),
        })
    }
}

// ── Offset ───────────────────────────────────────────────────────────────────

/// Locator for one bloom page: absolute byte offset into the block and the
/// byte length of the complete framed page (length prefix included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub offset: u64,
    pub len: u64,
}

impl BlockCodec for Offset {
    fn encode(&self, enc: &mut EncBuf, _version: Version) -> Result<()> {
        enc.put_uvarint64(self.offset);
        enc.put_uvarint64(self.len);
        Ok(())
    }

    fn decode(dec: &mut DecBuf<'_>, _version: Version) -> Result<Self> {
        let offset = dec.uvarint64();
        let len = dec.uvarint64();
        dec.err()?;
        Ok(Offset { offset, len })
    }
}

impl BlockCodecDelta for Offset {
    fn encode_delta(&self, enc: &mut EncBuf, _version: Version, prev: Option<&Self>) -> Result<()> {
        // offsets are monotonically non-decreasing, so the delta stays unsigned
        match prev {
            Some(p) => enc.put_uvarint64(self.offset.wrapping_sub(p.offset)),
            None => enc.put_uvarint64(self.offset),
        }
        enc.put_uvarint64(self.len);
        Ok(())
    }

    fn decode_delta(dec: &mut DecBuf<'_>, _version: Version, prev: Option<&Self>) -> Result<Self> {
        let offset = match prev {
            Some(p) => p.offset.wrapping_add(dec.uvarint64()),
            None => dec.uvarint64(),
        };
        let len = dec.uvarint64();
        dec.err()?;
        Ok(Offset { offset, len })
    }
}

// ── ChunkRef ─────────────────────────────────────────────────────────────────

/// Time-range reference to one chunk of the underlying stream.
///
/// `from`/`through` are milliseconds since epoch with `through >= from`; the
/// epoch may in principle be negative, so `from` is always a signed varint.
/// The checksum is the chunk's own and passes through unverified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkRef {
    pub from: i64,
    pub through: i64,
    pub checksum: u32,
}

impl BlockCodec for ChunkRef {
    fn encode(&self, enc: &mut EncBuf, _version: Version) -> Result<()> {
        enc.put_varint64(self.from);
        enc.put_varint64(self.through.wrapping_sub(self.from));
        enc.put_be32(self.checksum);
        Ok(())
    }

    fn decode(dec: &mut DecBuf<'_>, _version: Version) -> Result<Self> {
        let from = dec.varint64();
        let through = from.wrapping_add(dec.varint64());
        let checksum = dec.be32();
        dec.err()?;
        Ok(ChunkRef {
            from,
            through,
            checksum,
        })
    }
}

impl BlockCodecDelta for ChunkRef {
    fn encode_delta(&self, enc: &mut EncBuf, _version: Version, prev: Option<&Self>) -> Result<()> {
        match prev {
            Some(p) => enc.put_varint64(self.from.wrapping_sub(p.from)),
            None => enc.put_varint64(self.from),
        }
        enc.put_varint64(self.through.wrapping_sub(self.from));
        enc.put_be32(self.checksum);
        Ok(())
    }

    fn decode_delta(dec: &mut DecBuf<'_>, _version: Version, prev: Option<&Self>) -> Result<Self> {
        let from = match prev {
            Some(p) => p.from.wrapping_add(dec.varint64()),
            None => dec.varint64(),
        };
        let through = from.wrapping_add(dec.varint64());
        let checksum = dec.be32();
        dec.err()?;
        Ok(ChunkRef {
            from,
            through,
            checksum,
        })
    }
}

// ── Index ────────────────────────────────────────────────────────────────────

/// The small per-block index: series fingerprint, contributing chunk time
/// ranges, page locators, and the set of indexed field names.
///
/// The trailing CRC-32C is not part of the in-memory value. `encode` hashes
/// the whole buffer it writes into, so the index must be encoded into its
/// own scratch buffer (as `Block::encode` does).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Index {
    pub fingerprint: u64,
    /// Sorted by `from` ascending; order is preserved through decode.
    pub chunks: Vec<ChunkRef>,
    /// `offsets[i]` locates page `i`; offsets are non-decreasing.
    pub offsets: Vec<Offset>,
    /// Membership is semantic, order is not.
    pub fields: BTreeSet<String>,
}

impl BlockCodec for Index {
    fn encode(&self, enc: &mut EncBuf, version: Version) -> Result<()> {
        enc.put_uvarint64(self.fingerprint);

        enc.put_uvarint(self.chunks.len());
        let mut prev_chunk: Option<&ChunkRef> = None;
        for chunk in &self.chunks {
            chunk.encode_delta(enc, version, prev_chunk)?;
            prev_chunk = Some(chunk);
        }

        enc.put_uvarint(self.offsets.len());
        let mut prev_offset: Option<&Offset> = None;
        for offset in &self.offsets {
            offset.encode_delta(enc, version, prev_offset)?;
            prev_offset = Some(offset);
        }

        enc.put_uvarint(self.fields.len());
        for field in &self.fields {
            enc.put_uvarint_str(field);
        }

        enc.put_crc32c();
        Ok(())
    }

    fn decode(dec: &mut DecBuf<'_>, version: Version) -> Result<Self> {
        // The trailer covers the whole index section; verify it before
        // touching any field, then decode from the shrunk buffer.
        dec.check_crc32c()?;

        let fingerprint = dec.uvarint64();

        let n_chunks = dec.uvarint();
        dec.err()?;
        if n_chunks > dec.remaining() {
            return Err(Error::Truncated);
        }
        let mut chunks = Vec::with_capacity(n_chunks);
        for _ in 0..n_chunks {
            let chunk = ChunkRef::decode_delta(dec, version, chunks.last())?;
            chunks.push(chunk);
        }

        let n_offsets = dec.uvarint();
        dec.err()?;
        if n_offsets > dec.remaining() {
            return Err(Error::Truncated);
        }
        let mut offsets = Vec::with_capacity(n_offsets);
        for _ in 0..n_offsets {
            let offset = Offset::decode_delta(dec, version, offsets.last())?;
            offsets.push(offset);
        }

        let n_fields = dec.uvarint();
        dec.err()?;
        if n_fields > dec.remaining() {
            return Err(Error::Truncated);
        }
        let mut fields = BTreeSet::new();
        for _ in 0..n_fields {
            fields.insert(dec.uvarint_str());
        }

        dec.err()?;
        Ok(Index {
            fingerprint,
            chunks,
            offsets,
            fields,
        })
    }
}

// ── Footer ───────────────────────────────────────────────────────────────────

/// Fixed 20-byte footer anchoring the index from the end of the block.
///
/// `checksum` is `None` while the outer CRC has not been computed yet;
/// `Block::encode` fills it in before the footer is emitted, and any
/// caller-supplied value — including `Some(0)` — is written untouched.
/// Decoders always produce `Some` holding the wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Footer {
    pub index_offset: u64,
    pub index_len: u64,
    pub checksum: Option<u32>,
}

impl BlockCodec for Footer {
    fn encode(&self, enc: &mut EncBuf, _version: Version) -> Result<()> {
        enc.put_be64(self.index_offset);
        enc.put_be64(self.index_len);
        enc.put_be32(self.checksum.unwrap_or(0));
        Ok(())
    }

    fn decode(dec: &mut DecBuf<'_>, _version: Version) -> Result<Self> {
        let index_offset = dec.be64();
        let index_len = dec.be64();
        let checksum = dec.be32();
        dec.err()?;
        Ok(Footer {
            index_offset,
            index_len,
            checksum: Some(checksum),
        })
    }
}

// ── Blooms ───────────────────────────────────────────────────────────────────

/// The bloom pages of a block, in page-number order.
///
/// The count is a fixed BE u64 rather than a varint so a reader can learn
/// the page count without entering variable-length territory.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct Blooms {
    pub pages: Vec<Bloom>,
}

impl BlockCodec for Blooms {
    fn encode(&self, enc: &mut EncBuf, _version: Version) -> Result<()> {
        enc.put_be64(self.pages.len() as u64);
        // A failing page must not lose its siblings' work: attempt every
        // page, then surface the aggregate.
        let mut failures: Vec<String> = Vec::new();
        for page in &self.pages {
            if let Err(e) = page.encode(enc) {
                failures.push(e.to_string());
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::BloomCodec(failures.join("; ")))
        }
    }

    fn decode(dec: &mut DecBuf<'_>, _version: Version) -> Result<Self> {
        let n = dec.be64();
        dec.err()?;
        if n as usize > dec.remaining() {
            return Err(Error::Truncated);
        }
        let mut pages = Vec::with_capacity(n as usize);
        for _ in 0..n {
            // the first failing page aborts the decode
            pages.push(Bloom::decode_borrowed(dec)?);
        }
        dec.err()?;
        Ok(Blooms { pages })
    }
}

// ── Block ────────────────────────────────────────────────────────────────────

/// A complete block: `magic | header | blooms | index | footer`.
///
/// Total length is `footer.index_offset + footer.index_len + 20`. Blocks
/// are write-once; there is no in-place mutation of an emitted block.
#[derive(Debug, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub blooms: Blooms,
    pub index: Index,
    pub footer: Footer,
}

impl Block {
    /// Serialise the block onto `enc`.
    ///
    /// The footer's `index_offset` and `index_len` are filled from the
    /// measured stream, and its checksum is computed over everything
    /// preceding it when still `None` — hence `&mut self`.
    pub fn encode(&mut self, enc: &mut EncBuf, version: Version) -> Result<()> {
        enc.put_be32(MAGIC);
        self.header.encode(enc, version)?;
        self.blooms.encode(enc, version)?;

        // Separate scratch buffer so the index's inner CRC covers exactly
        // its own bytes.
        let mut index_enc = EncBuf::with_capacity(4 << 10);
        self.index.encode(&mut index_enc, version)?;
        self.footer.index_offset = enc.len() as u64;
        self.footer.index_len = index_enc.len() as u64;
        enc.put_bytes(index_enc.as_slice());

        if self.footer.checksum.is_none() {
            self.footer.checksum = Some(castagnoli(enc.as_slice()));
        }
        self.footer.encode(enc, version)
    }

    /// Decode a block from a buffer holding all of its bytes.
    ///
    /// The footer checksum is stored verbatim, not validated here.
    pub fn decode(dec: &mut DecBuf<'_>, version: Version) -> Result<Self> {
        let sig = dec.be32();
        dec.err()?;
        if sig != MAGIC {
            return Err(Error::BadMagic { got: sig });
        }

        let header = Header::decode(dec, version)?;
        if !header.version.is_supported() {
            return Err(Error::UnsupportedVersion(header.version.as_byte()));
        }

        let blooms = Blooms::decode(dec, header.version)?;

        // The remainder is `index | footer` with the footer fixed at 20
        // bytes; split so the index decodes (and CRC-checks) in isolation.
        let remaining = dec.remaining();
        if remaining < FOOTER_SIZE {
            return Err(Error::Truncated);
        }
        let index_len = remaining - FOOTER_SIZE;
        let mut index_dec = DecBuf::new(&dec.rest()[..index_len]);
        let index = Index::decode(&mut index_dec, header.version)?;

        dec.bytes(index_len);
        let footer = Footer::decode(dec, header.version)?;

        dec.err()?;
        Ok(Block {
            header,
            blooms,
            index,
            footer,
        })
    }

    /// Decode a block from a contiguous byte slice.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut dec = DecBuf::new(buf);
        Self::decode(&mut dec, Version::UNSUPPORTED)
    }
}
