// Streaming through ContainerWriter and ContainerReader.

use std::io::{Read, Write};

use sluice::container::{ContainerMeta, ContainerReader, ContainerWriter, WriteOptions};
use sluice::error::CorruptKind;
use sluice::stream::Flush;
use sluice::Error;

fn sample(len: usize) -> Vec<u8> {
    (0..len as u32)
        .map(|i| match i % 11 {
            0 => b'\n',
            n => b'a' + ((i / 7 + n) % 26) as u8,
        })
        .collect()
}

fn pack(data: &[u8]) -> Vec<u8> {
    let mut w = ContainerWriter::open(Vec::new(), ContainerMeta::default(), WriteOptions::default())
        .unwrap();
    w.write_all(data).unwrap();
    w.finish().unwrap()
}

#[test]
fn many_small_writes_round_trip() {
    let data = sample(200_000);
    let mut w = ContainerWriter::open(Vec::new(), ContainerMeta::default(), WriteOptions::default())
        .unwrap();
    for piece in data.chunks(333) {
        assert_eq!(w.write(piece).unwrap(), piece.len());
    }
    assert_eq!(w.total_in(), data.len() as u64);
    let bytes = w.finish().unwrap();

    let mut r = ContainerReader::open(&bytes[..]).unwrap();
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
    assert_eq!(r.total_out(), data.len() as u64);
    r.close().unwrap();
}

#[test]
fn flushed_prefix_is_readable_before_close() {
    let mut sink = Vec::new();
    let mut w = ContainerWriter::open(&mut sink, ContainerMeta::default(), WriteOptions::default())
        .unwrap();
    w.write_all(b"visible after flush").unwrap();
    w.flush_with(Flush::FullFlush).unwrap();
    let snapshot = w.get_ref().map(|s| s.to_vec()).unwrap();
    w.close().unwrap();
    drop(w);

    // The unfinished snapshot decodes up to the flush, then runs out.
    let mut r = ContainerReader::open(&snapshot[..]).unwrap();
    let mut buf = [0u8; 64];
    let n = r.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"visible after flush");
    assert_eq!(r.read(&mut buf), Err(Error::Corrupt(CorruptKind::Truncated)));

    let mut out = Vec::new();
    ContainerReader::open(&sink[..]).unwrap().read_to_end(&mut out).unwrap();
    assert_eq!(out, b"visible after flush");
}

#[test]
fn flush_modes_are_checked() {
    let mut w = ContainerWriter::open(Vec::new(), ContainerMeta::default(), WriteOptions::default())
        .unwrap();
    assert_eq!(w.flush_with(Flush::NoFlush), Err(Error::ParameterInvalid));
    assert_eq!(w.flush_with(Flush::Finish), Err(Error::ParameterInvalid));
    w.flush_with(Flush::SyncFlush).unwrap();
    w.close().unwrap();
    assert_eq!(w.write(b"late"), Err(Error::Closed));
    assert_eq!(w.flush_with(Flush::SyncFlush), Err(Error::Closed));
}

#[test]
fn dropping_an_open_writer_closes_it() {
    let data = sample(5000);
    let mut sink = Vec::new();
    {
        let mut w =
            ContainerWriter::open(&mut sink, ContainerMeta::default(), WriteOptions::default())
                .unwrap();
        w.write_all(&data).unwrap();
    }
    let mut r = ContainerReader::open(&sink[..]).unwrap();
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
    assert_eq!(r.close(), Ok(()));
}

#[test]
fn push_back_returns_one_byte() {
    let bytes = pack(b"abcdef");
    let mut r = ContainerReader::open(&bytes[..]).unwrap();
    let mut two = [0u8; 2];
    assert_eq!(r.read(&mut two).unwrap(), 2);
    assert_eq!(&two, b"ab");
    r.push_back(b'b').unwrap();
    assert_eq!(r.push_back(b'a'), Err(Error::BufferFull));

    let mut rest = Vec::new();
    r.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, b"bcdef");
    r.close().unwrap();
    assert_eq!(r.push_back(b'x'), Err(Error::Closed));
    assert_eq!(r.read(&mut two), Err(Error::Closed));
}

fn noise(len: usize) -> Vec<u8> {
    let mut x = 0x9E37_79B9u32;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        })
        .collect()
}

#[test]
fn flipped_stored_byte_fails_at_close() {
    let data = noise(50_000);
    let mut bytes = pack(&data);
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;

    let mut r = ContainerReader::open(&bytes[..]).unwrap();
    let mut out = Vec::new();
    r.read_to_end(&mut out).unwrap();
    assert_eq!(out.len(), data.len());
    assert_ne!(out, data);
    assert_eq!(r.close(), Err(Error::TrailerMismatch));
}

#[test]
fn structural_damage_is_sticky() {
    let mut bytes = pack(&sample(10_000));
    // The payload starts right after the 10-byte header; a zero-length data
    // block is never valid.
    bytes[10..14].copy_from_slice(&[0, 0, 0, 0]);

    let mut r = ContainerReader::open(&bytes[..]).unwrap();
    let mut buf = [0u8; 256];
    let err = Error::Corrupt(CorruptKind::BlockHeader);
    assert_eq!(r.read(&mut buf), Err(err));
    assert_eq!(r.read(&mut buf), Err(err));
    assert_eq!(r.close(), Err(err));
}

#[test]
fn members_keep_the_first_header() {
    let first = {
        let mut w = ContainerWriter::open(
            Vec::new(),
            ContainerMeta::default().with_name("one"),
            WriteOptions::default(),
        )
        .unwrap();
        w.write_all(b"1").unwrap();
        w.finish().unwrap()
    };
    let second = {
        let mut w = ContainerWriter::open(
            Vec::new(),
            ContainerMeta::default().with_name("two"),
            WriteOptions::default(),
        )
        .unwrap();
        w.write_all(b"2").unwrap();
        w.finish().unwrap()
    };
    let joined = [first, second].concat();
    let mut r = ContainerReader::open(&joined[..]).unwrap();
    let mut out = String::new();
    r.read_to_string(&mut out).unwrap();
    assert_eq!(out, "12");
    assert_eq!(r.meta().name.as_deref(), Some("one"));
    assert_eq!(r.members(), 2);
    assert_eq!(r.total_out(), 2);
}
