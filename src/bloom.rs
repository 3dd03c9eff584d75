//! Adapter around the external bloom filter.
//!
//! The filter's mathematics and byte layout belong to the `bloomfilter`
//! crate; this layer only sees a self-contained byte string and frames it
//! with an unsigned-varint length prefix. Swapping the filter implementation
//! touches nothing outside this file.

use std::fmt;

use crate::encoding::{DecBuf, EncBuf};
use crate::error::{Error, Result};

/// Expected number of tokens per fresh page.
pub const DEFAULT_CAPACITY: usize = 1024;
/// Target false-positive rate per fresh page.
pub const DEFAULT_FP_RATE: f64 = 0.01;

/// One bloom page: the membership filter for a set of tokens.
pub struct Bloom {
    filter: bloomfilter::Bloom<Vec<u8>>,
}

impl Bloom {
    /// Fresh filter with the default parameterisation.
    pub fn new() -> Result<Self> {
        Self::with_params(DEFAULT_CAPACITY, DEFAULT_FP_RATE)
    }

    pub fn with_params(capacity: usize, fp_rate: f64) -> Result<Self> {
        let filter = bloomfilter::Bloom::new_for_fp_rate(capacity, fp_rate)
            .map_err(|e| Error::BloomCodec(e.to_string()))?;
        Ok(Self { filter })
    }

    pub fn insert(&mut self, token: &[u8]) {
        self.filter.set(&token.to_vec());
    }

    pub fn contains(&self, token: &[u8]) -> bool {
        self.filter.check(&token.to_vec())
    }

    /// Append the filter as a length-prefixed byte string.
    pub fn encode(&self, enc: &mut EncBuf) -> Result<()> {
        let data = self.filter.to_bytes();
        enc.put_uvarint_bytes(&data);
        Ok(())
    }

    /// Read one framed page and parse it into a fresh owned filter.
    pub fn decode_copy(dec: &mut DecBuf<'_>) -> Result<Self> {
        let data = dec.uvarint_bytes();
        dec.err()?;
        let filter = bloomfilter::Bloom::from_bytes(data.to_vec())
            .map_err(|e| Error::BloomCodec(e.to_string()))?;
        Ok(Self { filter })
    }

    /// Read one framed page, parsing straight from the borrowed buffer.
    ///
    /// The filter still owns its bitmap afterwards; unlike
    /// [`decode_copy`](Self::decode_copy) no intermediate buffer is
    /// allocated while parsing.
    pub fn decode_borrowed(dec: &mut DecBuf<'_>) -> Result<Self> {
        let data = dec.uvarint_bytes();
        dec.err()?;
        let filter = bloomfilter::Bloom::from_slice(data)
            .map_err(|e| Error::BloomCodec(e.to_string()))?;
        Ok(Self { filter })
    }

    /// The filter's serialised size in bytes, before framing.
    pub fn byte_len(&self) -> usize {
        self.filter.to_bytes().len()
    }
}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bloom")
            .field("bytes", &self.byte_len())
            .finish()
    }
}

// Structural equality means identical serialised bytes. Two filters built
// from the same insertions may still differ (seeds are random); equality is
// meaningful for decoded copies of the same page.
impl PartialEq for Bloom {
    fn eq(&self, other: &Self) -> bool {
        self.filter.to_bytes() == other.filter.to_bytes()
    }
}

impl Eq for Bloom {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framed_round_trip() {
        let mut bloom = Bloom::new().unwrap();
        bloom.insert(b"alpha");
        bloom.insert(b"beta");

        let mut enc = EncBuf::new();
        bloom.encode(&mut enc).unwrap();

        let mut dec = DecBuf::new(enc.as_slice());
        let copy = Bloom::decode_copy(&mut dec).unwrap();
        assert_eq!(dec.remaining(), 0);
        assert_eq!(bloom, copy);
        assert!(copy.contains(b"alpha"));
        assert!(copy.contains(b"beta"));
        assert!(!copy.contains(b"gamma"));
    }

    #[test]
    fn borrowed_decode_matches_copy() {
        let mut bloom = Bloom::new().unwrap();
        bloom.insert(b"needle");

        let mut enc = EncBuf::new();
        bloom.encode(&mut enc).unwrap();

        let mut dec = DecBuf::new(enc.as_slice());
        let borrowed = Bloom::decode_borrowed(&mut dec).unwrap();
        assert_eq!(bloom, borrowed);
        assert!(borrowed.contains(b"needle"));
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let mut bloom = Bloom::new().unwrap();
        let mut enc = EncBuf::new();
        bloom.encode(&mut enc).unwrap();

        let bytes = enc.as_slice();
        let mut dec = DecBuf::new(&bytes[..bytes.len() / 2]);
        assert!(Bloom::decode_copy(&mut dec).is_err());
    }
}
