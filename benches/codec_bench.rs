use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeSet;

use bloomblock::block::{
    Block, BlockCodec, Blooms, ChunkRef, Encoding, Footer, Header, Index, Offset, Version,
};
use bloomblock::bloom::Bloom;
use bloomblock::encoding::{DecBuf, EncBuf};
use bloomblock::reader::BlockDecoder;

fn sample_block(pages: usize) -> Block {
    let mut blooms = Vec::with_capacity(pages);
    let mut offsets = Vec::with_capacity(pages);
    let mut at = 4 + 1 + 1 + 8u64;
    for i in 0..pages {
        let mut page = Bloom::new().unwrap();
        for t in 0..64u32 {
            page.insert(format!("token-{i}-{t}").as_bytes());
        }
        let mut enc = EncBuf::new();
        page.encode(&mut enc).unwrap();
        let len = enc.len() as u64;
        offsets.push(Offset { offset: at, len });
        at += len;
        blooms.push(page);
    }

    Block {
        header: Header {
            version: Version::V1,
            encoding: Encoding::None,
        },
        blooms: Blooms { pages: blooms },
        index: Index {
            fingerprint: 0xafbfcfdf,
            chunks: (0..pages as i64)
                .map(|i| ChunkRef {
                    from: i * 1000,
                    through: i * 1000 + 900,
                    checksum: i as u32,
                })
                .collect(),
            offsets,
            fields: ["field_a", "field_b", "field_c"]
                .into_iter()
                .map(String::from)
                .collect::<BTreeSet<_>>(),
        },
        footer: Footer::default(),
    }
}

fn bench_codec(c: &mut Criterion) {
    let mut block = sample_block(16);
    let mut enc = EncBuf::new();
    block.encode(&mut enc, Version::V1).unwrap();
    let bytes = enc.into_bytes();

    c.bench_function("block_encode_16_pages", |b| {
        b.iter(|| {
            let mut enc = EncBuf::with_capacity(bytes.len());
            block.encode(black_box(&mut enc), Version::V1).unwrap();
            enc.len()
        })
    });

    c.bench_function("block_decode_16_pages", |b| {
        b.iter(|| Block::from_bytes(black_box(&bytes)).unwrap())
    });

    c.bench_function("index_decode", |b| {
        let mut index_enc = EncBuf::new();
        block.index.encode(&mut index_enc, Version::V1).unwrap();
        let index_bytes = index_enc.into_bytes();
        b.iter(|| {
            let mut dec = DecBuf::new(black_box(&index_bytes));
            Index::decode(&mut dec, Version::V1).unwrap()
        })
    });

    c.bench_function("lazy_open_and_first_page", |b| {
        b.iter(|| {
            let mut dec = BlockDecoder::from_bytes(black_box(bytes.clone()));
            dec.next();
            dec.current().is_some()
        })
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
